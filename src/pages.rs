//! Live pages held by a signed-in session.
//!
//! A page mounts on its first visit: it subscribes to its table's change
//! feed, then fetches the snapshot. Subscribing first means rows written
//! while the fetch is in flight are still delivered and patched in. Every
//! later visit drains the events buffered since the previous one. A lagged
//! subscription refetches the whole snapshot. Unmounting drops the
//! subscription.
//!
//! The feed carries every user's rows. Inserted and updated rows are read
//! back by key with the session's own token before they are applied, so a
//! page only ever holds rows its own fetch could have returned.

use std::future::Future;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregates::{AccountTotals, DashboardTotals, DebtTotals};
use crate::backend::Store;
use crate::change_feed::{ChangeEvent, ChangeHub, Delivery, Record, Subscription};
use crate::error::StoreError;
use crate::format::format_currency;
use crate::forms::FormView;
use crate::forms::debt::DebtForm;
use crate::forms::transaction::TransactionForm;
use crate::live::{InsertPosition, LiveCollection};
use crate::models::account::Account;
use crate::models::debt::DebtEntry;
use crate::models::person::Person;
use crate::models::transaction::{CATEGORIES, Transaction};
use crate::models::user::User;
use crate::services::{account_service, debt_service, people_service, transaction_service};
use crate::views::{
    AccountRow, DebtRow, NO_ACCOUNTS, NO_DEBTS, NO_TRANSACTIONS, TableView, TransactionRow,
    account_names,
};

/// Number of transactions shown on the dashboard.
pub const RECENT_TRANSACTIONS: usize = 5;

/// One collection kept in sync with its table while mounted.
#[derive(Debug)]
pub struct LivePage<T: Record> {
    collection: LiveCollection<T>,
    subscription: Option<Subscription<T>>,

    /// The backend answered 401 to a read made for this page
    token_refused: bool,
}

impl<T: Record> LivePage<T> {
    pub fn new(insert_at: InsertPosition) -> Self {
        Self {
            collection: LiveCollection::new(insert_at),
            subscription: None,
            token_refused: false,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn collection(&self) -> &LiveCollection<T> {
        &self.collection
    }

    pub fn items(&self) -> &[T] {
        self.collection.items()
    }

    /// True once the backend refused the session's token for this page.
    pub fn token_refused(&self) -> bool {
        self.token_refused
    }

    fn note_failure(&mut self, error: &StoreError) {
        if error.status() == Some(401) {
            self.token_refused = true;
        }
    }

    /// Mount on first use, then apply pending change events.
    ///
    /// `fetch` loads the snapshot; `reread` loads one row by key and
    /// answers `NotFound` when the session cannot see it.
    ///
    /// Returns how many events changed the collection.
    pub async fn refresh<F, Fut, R, RFut>(&mut self, hub: &ChangeHub, fetch: F, reread: R) -> usize
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<T>, StoreError>>,
        R: Fn(String) -> RFut,
        RFut: Future<Output = Result<T, StoreError>>,
    {
        if self.subscription.is_none() {
            self.subscription = Some(hub.subscribe::<T>());
            self.load(&fetch).await;
        }
        self.drain(&fetch, &reread).await
    }

    /// Release the subscription. The last snapshot stays readable.
    pub fn unmount(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    async fn load<F, Fut>(&mut self, fetch: &F)
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<T>, StoreError>>,
    {
        self.collection.begin_load();
        let result = fetch().await;
        if let Err(e) = &result {
            self.note_failure(e);
        }
        self.collection.finish_load(result);
    }

    async fn drain<F, Fut, R, RFut>(&mut self, fetch: &F, reread: &R) -> usize
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Vec<T>, StoreError>>,
        R: Fn(String) -> RFut,
        RFut: Future<Output = Result<T, StoreError>>,
    {
        let mut applied = 0;
        loop {
            let Some(delivery) = self.subscription.as_mut().and_then(|s| s.try_next()) else {
                break;
            };
            match delivery {
                Delivery::Event(event) => match visible_to_session(event, reread).await {
                    Ok(Some(event)) => {
                        if self.collection.apply(event) {
                            applied += 1;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        self.note_failure(&e);
                        tracing::warn!(
                            table = T::TABLE.name(),
                            error = %e,
                            "dropping change event that could not be read back"
                        );
                    }
                },
                Delivery::Lagged(missed) => {
                    tracing::warn!(table = T::TABLE.name(), missed, "change feed lagged, refetching");
                    self.load(fetch).await;
                }
            }
        }
        if applied > 0 {
            tracing::debug!(table = T::TABLE.name(), applied, "change events applied");
        }
        applied
    }
}

/// Replace the pushed row with the session's own read of it.
///
/// An insert the session cannot read is dropped. An update to a row it can
/// no longer read becomes a delete. Deletes pass through; removing a key
/// the page does not hold is a no-op.
async fn visible_to_session<T, R, RFut>(
    event: ChangeEvent<T>,
    reread: &R,
) -> Result<Option<ChangeEvent<T>>, StoreError>
where
    T: Record,
    R: Fn(String) -> RFut,
    RFut: Future<Output = Result<T, StoreError>>,
{
    let (key, inserted) = match event {
        ChangeEvent::Insert(row) => (row.key().to_string(), true),
        ChangeEvent::Update(row) => (row.key().to_string(), false),
        delete @ ChangeEvent::Delete { .. } => return Ok(Some(delete)),
    };

    match reread(key.clone()).await {
        Ok(row) if inserted => Ok(Some(ChangeEvent::Insert(row))),
        Ok(row) => Ok(Some(ChangeEvent::Update(row))),
        Err(StoreError::NotFound(_)) if inserted => Ok(None),
        Err(StoreError::NotFound(_)) => Ok(Some(ChangeEvent::Delete { key })),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryOption {
    pub code: &'static str,
    pub label: &'static str,
}

fn category_options() -> Vec<CategoryOption> {
    CATEGORIES
        .iter()
        .map(|&(code, label)| CategoryOption { code, label })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountsView {
    pub totals: AccountTotals,
    pub total_balance_display: String,
    pub table: TableView<AccountRow>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionsView {
    pub table: TableView<TransactionRow>,
    pub form: FormView,
    pub categories: Vec<CategoryOption>,

    /// Active accounts offered as source and destination
    pub accounts: Vec<AccountRow>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DebtsView {
    pub totals: DebtTotals,
    pub total_debt_display: String,
    pub total_repaid_display: String,
    pub table: TableView<DebtRow>,
    pub people: Vec<Person>,
    pub form: FormView,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub welcome: String,
    pub totals: DashboardTotals,
    pub total_balance_display: String,
    pub month_spending_display: String,
    pub cashback_earned_display: String,
    pub outstanding_debt_display: String,
    pub recent_transactions: Vec<TransactionRow>,
}

/// The live pages of one session.
#[derive(Debug)]
pub struct Pages {
    pub accounts: LivePage<Account>,
    pub transactions: LivePage<Transaction>,
    pub debts: LivePage<DebtEntry>,
    pub people: LivePage<Person>,
    transaction_limit: usize,
}

impl Pages {
    pub fn new(transaction_limit: usize) -> Self {
        Self {
            accounts: LivePage::new(InsertPosition::Append),
            transactions: LivePage::new(InsertPosition::Prepend),
            debts: LivePage::new(InsertPosition::Append),
            people: LivePage::new(InsertPosition::Append),
            transaction_limit,
        }
    }

    pub async fn sync_accounts(&mut self, hub: &ChangeHub, store: &Store) {
        self.accounts
            .refresh(
                hub,
                move || account_service::get_accounts(store),
                move |id: String| async move {
                    // the page lists active accounts only
                    account_service::get_account_by_id(store, &id)
                        .await
                        .and_then(|account| {
                            if account.is_active {
                                Ok(account)
                            } else {
                                Err(StoreError::NotFound(format!("Account {}", id)))
                            }
                        })
                },
            )
            .await;
    }

    pub async fn sync_transactions(&mut self, hub: &ChangeHub, store: &Store) {
        let limit = self.transaction_limit;
        self.transactions
            .refresh(
                hub,
                move || transaction_service::get_transactions(store, limit),
                move |id: String| async move {
                    transaction_service::get_transaction_by_id(store, &id).await
                },
            )
            .await;
    }

    pub async fn sync_debts(&mut self, hub: &ChangeHub, store: &Store) {
        self.sync_debt_ledger(hub, store).await;
        self.people
            .refresh(
                hub,
                move || people_service::get_people(store),
                move |id: String| async move { people_service::get_person_by_id(store, &id).await },
            )
            .await;
    }

    async fn sync_debt_ledger(&mut self, hub: &ChangeHub, store: &Store) {
        self.debts
            .refresh(
                hub,
                move || debt_service::get_debts(store, None),
                move |id: String| async move { debt_service::get_debt_by_id(store, &id).await },
            )
            .await;
    }

    /// True when any page saw the backend refuse the session's token.
    pub fn token_refused(&self) -> bool {
        self.accounts.token_refused()
            || self.transactions.token_refused()
            || self.debts.token_refused()
            || self.people.token_refused()
    }

    pub fn unmount_all(&mut self) {
        self.accounts.unmount();
        self.transactions.unmount();
        self.debts.unmount();
        self.people.unmount();
    }

    pub async fn accounts_view(&mut self, hub: &ChangeHub, store: &Store) -> AccountsView {
        self.sync_accounts(hub, store).await;

        let collection = self.accounts.collection();
        let totals = AccountTotals::compute(collection.items());
        let rows = collection.items().iter().map(AccountRow::from).collect();
        AccountsView {
            totals,
            total_balance_display: format_currency(totals.total_balance),
            table: TableView::new(collection.state(), rows, NO_ACCOUNTS),
            error: collection.last_error().map(str::to_string),
        }
    }

    pub async fn transactions_view(
        &mut self,
        hub: &ChangeHub,
        store: &Store,
        today: NaiveDate,
    ) -> TransactionsView {
        self.sync_accounts(hub, store).await;
        self.sync_transactions(hub, store).await;

        let names = account_names(self.accounts.items());
        let collection = self.transactions.collection();
        let rows = collection
            .items()
            .iter()
            .map(|txn| TransactionRow::new(txn, &names))
            .collect();
        TransactionsView {
            table: TableView::new(collection.state(), rows, NO_TRANSACTIONS),
            form: FormView::of(&TransactionForm::new(today)),
            categories: category_options(),
            accounts: self.accounts.items().iter().map(AccountRow::from).collect(),
            error: collection.last_error().map(str::to_string),
        }
    }

    pub async fn debts_view(&mut self, hub: &ChangeHub, store: &Store, today: NaiveDate) -> DebtsView {
        self.sync_debts(hub, store).await;

        let people = self.people.items();
        let collection = self.debts.collection();
        let totals = DebtTotals::compute(collection.items());
        let rows = collection
            .items()
            .iter()
            .map(|entry| {
                let mut row = DebtRow::from(entry);
                // rows patched from the change feed arrive without the joined name
                if row.person_name.is_none() {
                    row.person_name = people
                        .iter()
                        .find(|p| p.person_id == entry.person_id)
                        .map(|p| p.name.clone());
                }
                row
            })
            .collect();
        DebtsView {
            totals,
            total_debt_display: format_currency(totals.total_debt),
            total_repaid_display: format_currency(totals.total_repaid),
            table: TableView::new(collection.state(), rows, NO_DEBTS),
            people: people.to_vec(),
            form: FormView::of(&DebtForm::new(today)),
            error: collection.last_error().map(str::to_string),
        }
    }

    pub async fn dashboard_view(
        &mut self,
        hub: &ChangeHub,
        store: &Store,
        user: &User,
        today: NaiveDate,
    ) -> DashboardView {
        self.sync_accounts(hub, store).await;
        self.sync_transactions(hub, store).await;
        self.sync_debt_ledger(hub, store).await;

        let totals = DashboardTotals::compute(
            self.accounts.items(),
            self.transactions.items(),
            self.debts.items(),
            today,
        );
        let names = account_names(self.accounts.items());
        DashboardView {
            welcome: format!("Welcome, {}!", user.email.as_deref().unwrap_or_default()),
            totals,
            total_balance_display: format_currency(totals.total_balance),
            month_spending_display: format_currency(totals.month_spending),
            cashback_earned_display: format_currency(totals.cashback_earned),
            outstanding_debt_display: format_currency(totals.outstanding_debt),
            recent_transactions: self
                .transactions
                .items()
                .iter()
                .take(RECENT_TRANSACTIONS)
                .map(|txn| TransactionRow::new(txn, &names))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change_feed::RawChange;
    use crate::live::LoadState;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn person(id: &str, name: &str) -> Person {
        Person {
            person_id: id.to_string(),
            name: name.to_string(),
        }
    }

    /// Row lookup answering from `rows`, as the backend would for one session.
    fn reread_from(
        rows: Vec<Person>,
    ) -> impl Fn(String) -> std::future::Ready<Result<Person, StoreError>> {
        move |key| {
            std::future::ready(
                rows.iter()
                    .find(|p| p.person_id == key)
                    .cloned()
                    .ok_or_else(|| StoreError::NotFound(format!("Person {}", key))),
            )
        }
    }

    fn people_change(kind: &str, id: &str, name: &str) -> RawChange {
        serde_json::from_value(json!({
            "type": kind,
            "table": "people",
            "record": { "person_id": id, "name": name },
            "old_record": { "person_id": id }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn first_refresh_mounts_and_fetches() {
        let hub = ChangeHub::new(8);
        let mut page = LivePage::<Person>::new(InsertPosition::Append);
        assert_eq!(page.collection().state(), LoadState::Uninitialized);

        page.refresh(
            &hub,
            || async { Ok(vec![person("P-1", "An")]) },
            reread_from(vec![]),
        )
        .await;
        assert!(page.is_mounted());
        assert_eq!(page.collection().state(), LoadState::Ready);
        assert_eq!(page.items().len(), 1);
        assert_eq!(hub.subscriber_count(crate::change_feed::Table::People), 1);
    }

    #[tokio::test]
    async fn later_refreshes_apply_buffered_events_without_refetching() {
        let hub = ChangeHub::new(8);
        let fetches = AtomicUsize::new(0);
        let fetch = || {
            fetches.fetch_add(1, Ordering::SeqCst);
            async { Ok(vec![person("P-1", "An")]) }
        };
        let reread = reread_from(vec![person("P-1", "An Nguyen"), person("P-2", "Binh")]);
        let mut page = LivePage::<Person>::new(InsertPosition::Append);
        page.refresh(&hub, fetch, &reread).await;

        hub.publish(people_change("INSERT", "P-2", "Binh"));
        hub.publish(people_change("UPDATE", "P-1", "An Nguyen"));
        let applied = page.refresh(&hub, fetch, &reread).await;

        assert_eq!(applied, 2);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(page.items()[0].name, "An Nguyen");
        assert_eq!(page.items()[1].person_id, "P-2");
    }

    #[tokio::test]
    async fn lag_triggers_a_refetch() {
        let hub = ChangeHub::new(1);
        let fetches = AtomicUsize::new(0);
        let fetch = || {
            fetches.fetch_add(1, Ordering::SeqCst);
            async { Ok(Vec::<Person>::new()) }
        };
        let reread = reread_from(vec![person("P-2", "X")]);
        let mut page = LivePage::<Person>::new(InsertPosition::Append);
        page.refresh(&hub, fetch, &reread).await;

        for i in 0..3 {
            hub.publish(people_change("INSERT", &format!("P-{}", i), "X"));
        }
        page.refresh(&hub, fetch, &reread).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        // the newest event survives the lag and is applied on top of the refetch
        assert_eq!(page.items().len(), 1);
        assert_eq!(page.items()[0].person_id, "P-2");
    }

    #[tokio::test]
    async fn unmount_releases_the_subscription() {
        let hub = ChangeHub::new(8);
        let mut page = LivePage::<Person>::new(InsertPosition::Append);
        page.refresh(&hub, || async { Ok(vec![]) }, reread_from(vec![]))
            .await;
        page.unmount();
        assert!(!page.is_mounted());
        assert_eq!(hub.subscriber_count(crate::change_feed::Table::People), 0);
    }

    #[tokio::test]
    async fn rows_the_session_cannot_read_are_not_applied() {
        let hub = ChangeHub::new(8);
        let fetch = || async { Ok(vec![person("P-1", "An")]) };
        // after the first fetch neither row is readable by this session
        let reread = reread_from(vec![]);
        let mut page = LivePage::<Person>::new(InsertPosition::Append);
        page.refresh(&hub, fetch, reread_from(vec![person("P-1", "An")]))
            .await;

        hub.publish(people_change("INSERT", "P-9", "Someone else"));
        hub.publish(people_change("UPDATE", "P-1", "Moved away"));
        page.refresh(&hub, fetch, &reread).await;

        assert!(page.items().is_empty());
    }

    #[tokio::test]
    async fn applied_rows_come_from_the_read_back() {
        let hub = ChangeHub::new(8);
        let mut page = LivePage::<Person>::new(InsertPosition::Append);
        let reread = reread_from(vec![person("P-2", "Binh (stored)")]);
        page.refresh(&hub, || async { Ok(vec![]) }, &reread).await;

        hub.publish(people_change("INSERT", "P-2", "Binh (pushed)"));
        page.refresh(&hub, || async { Ok(vec![]) }, &reread).await;

        assert_eq!(page.items().len(), 1);
        assert_eq!(page.items()[0].name, "Binh (stored)");
    }

    #[tokio::test]
    async fn refused_token_is_remembered() {
        let hub = ChangeHub::new(8);
        let mut page = LivePage::<Person>::new(InsertPosition::Append);
        page.refresh(
            &hub,
            || async {
                Err(StoreError::Api {
                    status: 401,
                    message: "JWT expired".to_string(),
                })
            },
            reread_from(vec![]),
        )
        .await;
        assert!(page.token_refused());
        assert_eq!(page.collection().last_error(), Some("JWT expired"));
    }
}
