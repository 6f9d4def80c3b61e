//! Account reads.

use crate::backend::{Direction, Query, Store};
use crate::change_feed::Table;
use crate::error::StoreError;
use crate::models::account::Account;

/// Active accounts ordered by name.
pub async fn get_accounts(store: &Store) -> Result<Vec<Account>, StoreError> {
    let query = Query::from(Table::Accounts)
        .eq("is_active", true)
        .order("account_name", Direction::Ascending);
    store.select(&query).await
}

pub async fn get_account_by_id(store: &Store, account_id: &str) -> Result<Account, StoreError> {
    let query = Query::from(Table::Accounts).eq("account_id", account_id);
    store
        .select_one(query, &format!("Account {}", account_id))
        .await
}

/// Sum of balances over active accounts.
pub async fn get_total_balance(store: &Store) -> Result<f64, StoreError> {
    let accounts = get_accounts(store).await?;
    Ok(crate::aggregates::total_balance(&accounts))
}
