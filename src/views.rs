//! Row view-models for the list pages.
//!
//! Each row carries its display strings and the styling tokens derived from
//! the record (badge colour by status or type, amount sign and colour).

use std::collections::HashMap;

use serde::Serialize;

use crate::aggregates::{progress_percent, remaining_for_display};
use crate::format::{format_currency, format_date};
use crate::live::LoadState;
use crate::models::account::{Account, AccountType};
use crate::models::debt::{DebtEntry, DebtStatus};
use crate::models::transaction::{Transaction, TransactionType};

pub const NO_ACCOUNTS: &str = "No accounts found.";
pub const NO_TRANSACTIONS: &str = "No transactions yet. Add one to get started!";
pub const NO_DEBTS: &str = "No active debts.";

pub fn account_type_color(account_type: AccountType) -> &'static str {
    match account_type {
        AccountType::CreditCard => "blue",
        AccountType::Bank => "green",
        AccountType::Wallet => "purple",
        AccountType::Other => "gray",
    }
}

pub fn transaction_type_color(txn_type: TransactionType) -> &'static str {
    match txn_type {
        TransactionType::Expense => "red",
        TransactionType::Income => "green",
        TransactionType::Transfer => "blue",
        TransactionType::Refund => "yellow",
        TransactionType::CashbackEarned => "purple",
        TransactionType::CashbackGiven => "indigo",
        TransactionType::Other => "gray",
    }
}

pub fn debt_status_color(status: DebtStatus) -> &'static str {
    match status {
        DebtStatus::Open => "yellow",
        DebtStatus::Partial => "orange",
        DebtStatus::FullyRepaid => "green",
        DebtStatus::Overdue => "red",
        DebtStatus::Other => "gray",
    }
}

pub fn amount_sign(txn_type: TransactionType) -> char {
    if txn_type.is_inflow() { '+' } else { '-' }
}

pub fn amount_color(txn_type: TransactionType) -> &'static str {
    if txn_type.is_inflow() { "green" } else { "red" }
}

/// Rows plus the table's loading and empty state.
#[derive(Debug, Clone, Serialize)]
pub struct TableView<R> {
    pub state: LoadState,
    pub rows: Vec<R>,

    /// Present only when the table is ready and has no rows
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<&'static str>,
}

impl<R> TableView<R> {
    pub fn new(state: LoadState, rows: Vec<R>, empty_message: &'static str) -> Self {
        let empty = state == LoadState::Ready && rows.is_empty();
        Self {
            state,
            rows,
            empty_message: empty.then_some(empty_message),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountRow {
    pub account_id: String,
    pub account_name: String,
    pub account_type: &'static str,
    pub type_color: &'static str,
    pub balance: f64,
    pub balance_display: String,
    pub balance_color: &'static str,
    pub credit_limit_display: String,
    pub cashback_rate_display: String,
    pub active_marker: &'static str,
}

impl From<&Account> for AccountRow {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.account_id.clone(),
            account_name: account.account_name.clone(),
            account_type: account.account_type.label(),
            type_color: account_type_color(account.account_type),
            balance: account.balance,
            balance_display: format_currency(account.balance),
            balance_color: if account.balance >= 0.0 { "green" } else { "red" },
            credit_limit_display: match account.credit_limit {
                Some(limit) if limit != 0.0 => format_currency(limit),
                _ => "-".to_string(),
            },
            cashback_rate_display: format!("{}%", account.cashback_rate),
            active_marker: if account.is_active { "●" } else { "○" },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionRow {
    pub transaction_id: String,
    pub date: String,
    pub txn_type: &'static str,
    pub type_color: &'static str,
    pub from_account: Option<String>,
    pub to_account: Option<String>,
    pub amount: f64,
    pub amount_display: String,
    pub amount_color: &'static str,
    pub category_id: Option<String>,
    pub notes: Option<String>,
}

impl TransactionRow {
    /// Build a row, showing account names where `names` knows them.
    pub fn new(txn: &Transaction, names: &HashMap<&str, &str>) -> Self {
        let resolve = |id: &Option<String>| {
            id.as_deref()
                .map(|id| names.get(id).copied().unwrap_or(id).to_string())
        };
        Self {
            transaction_id: txn.transaction_id.clone(),
            date: format_date(txn.date),
            txn_type: txn.txn_type.as_str(),
            type_color: transaction_type_color(txn.txn_type),
            from_account: resolve(&txn.from_account_id),
            to_account: resolve(&txn.to_account_id),
            amount: txn.amount,
            amount_display: format!("{}{}", amount_sign(txn.txn_type), format_currency(txn.amount)),
            amount_color: amount_color(txn.txn_type),
            category_id: txn.category_id.clone(),
            notes: txn.notes.clone(),
        }
    }
}

/// Account id → name lookup for transaction rows.
pub fn account_names(accounts: &[Account]) -> HashMap<&str, &str> {
    accounts
        .iter()
        .map(|a| (a.account_id.as_str(), a.account_name.as_str()))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct DebtRow {
    pub ledger_id: String,
    pub person_id: String,
    pub person_name: Option<String>,
    pub status: &'static str,
    pub status_color: &'static str,
    pub progress_percent: f64,
    pub progress_label: String,
    pub sum_debt_display: String,
    pub sum_repaid_display: String,
    pub remaining: f64,
    pub remaining_display: String,
    pub remaining_color: &'static str,
    pub period_tag: Option<String>,
    pub notes: Option<String>,

    /// Whether a repayment can still be recorded
    pub can_repay: bool,
}

impl From<&DebtEntry> for DebtRow {
    fn from(entry: &DebtEntry) -> Self {
        let progress = progress_percent(entry.sum_repaid, entry.sum_debt);
        let remaining = remaining_for_display(entry);
        Self {
            ledger_id: entry.ledger_id.clone(),
            person_id: entry.person_id.clone(),
            person_name: entry.person_name.clone(),
            status: entry.status.label(),
            status_color: debt_status_color(entry.status),
            progress_percent: progress,
            progress_label: format!("{}%", progress.round()),
            sum_debt_display: format_currency(entry.sum_debt),
            sum_repaid_display: format_currency(entry.sum_repaid),
            remaining,
            remaining_display: format_currency(remaining),
            remaining_color: if entry.remaining() > 0.0 { "red" } else { "green" },
            period_tag: entry.period_tag.clone(),
            notes: entry.notes.clone(),
            can_repay: remaining > 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn inflows_are_green_and_positive() {
        assert_eq!(amount_sign(TransactionType::Refund), '+');
        assert_eq!(amount_color(TransactionType::CashbackEarned), "green");
        assert_eq!(amount_sign(TransactionType::Transfer), '-');
        assert_eq!(amount_color(TransactionType::CashbackGiven), "red");
    }

    #[test]
    fn empty_message_only_when_ready() {
        let loading: TableView<AccountRow> = TableView::new(LoadState::Loading, vec![], NO_ACCOUNTS);
        assert_eq!(loading.empty_message, None);
        let ready: TableView<AccountRow> = TableView::new(LoadState::Ready, vec![], NO_ACCOUNTS);
        assert_eq!(ready.empty_message, Some(NO_ACCOUNTS));
    }

    #[test]
    fn account_row_styling() {
        let account = Account {
            account_id: "ACC-1".to_string(),
            account_name: "Visa".to_string(),
            account_type: AccountType::CreditCard,
            balance: -1_200_000.0,
            credit_limit: None,
            cashback_rate: 1.5,
            is_active: false,
        };
        let row = AccountRow::from(&account);
        assert_eq!(row.account_type, "CREDIT CARD");
        assert_eq!(row.type_color, "blue");
        assert_eq!(row.balance_color, "red");
        assert_eq!(row.balance_display, "-1.200.000 ₫");
        assert_eq!(row.credit_limit_display, "-");
        assert_eq!(row.cashback_rate_display, "1.5%");
        assert_eq!(row.active_marker, "○");
    }

    #[test]
    fn transaction_row_resolves_account_names() {
        let txn = Transaction {
            transaction_id: "TXN-1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            amount: 45000.0,
            txn_type: TransactionType::Expense,
            from_account_id: Some("ACC-1".to_string()),
            to_account_id: Some("ACC-X".to_string()),
            category_id: Some("FOOD".to_string()),
            status: None,
            period_tag: None,
            notes: None,
            person_id: None,
        };
        let mut names = HashMap::new();
        names.insert("ACC-1", "Wallet");
        let row = TransactionRow::new(&txn, &names);
        assert_eq!(row.from_account.as_deref(), Some("Wallet"));
        assert_eq!(row.to_account.as_deref(), Some("ACC-X"));
        assert_eq!(row.amount_display, "-45.000 ₫");
        assert_eq!(row.date, "10/06/2024");
        assert_eq!(row.type_color, "red");
    }

    #[test]
    fn overpaid_debt_shows_zero_remaining() {
        let entry = DebtEntry {
            ledger_id: "DEB-1".to_string(),
            person_id: "P-1".to_string(),
            sum_debt_initial: 100.0,
            sum_debt: 100.0,
            sum_repaid: 150.0,
            sum_back_on_debt: 0.0,
            status: DebtStatus::FullyRepaid,
            period_tag: None,
            notes: None,
            last_updated: None,
            person_name: Some("Linh".to_string()),
            people: None,
        };
        let row = DebtRow::from(&entry);
        assert_eq!(row.progress_percent, 100.0);
        assert_eq!(row.progress_label, "100%");
        assert_eq!(row.remaining, 0.0);
        assert_eq!(row.remaining_color, "green");
        assert_eq!(row.status, "FULLY REPAID");
        assert_eq!(row.status_color, "green");
        assert!(!row.can_repay);
    }
}
