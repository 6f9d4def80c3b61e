//! Transaction reads and writes.

use crate::backend::{Direction, Query, Store};
use crate::change_feed::Table;
use crate::error::StoreError;
use crate::models::transaction::{NewTransaction, Transaction, TransactionUpdate};

/// Most recent transactions first, at most `limit` rows.
pub async fn get_transactions(store: &Store, limit: usize) -> Result<Vec<Transaction>, StoreError> {
    let query = Query::from(Table::Transactions)
        .order("date", Direction::Descending)
        .limit(limit);
    store.select(&query).await
}

pub async fn get_transaction_by_id(
    store: &Store,
    transaction_id: &str,
) -> Result<Transaction, StoreError> {
    let query = Query::from(Table::Transactions).eq("transaction_id", transaction_id);
    store
        .select_one(query, &format!("Transaction {}", transaction_id))
        .await
}

/// Insert one transaction and return it as stored.
pub async fn create_transaction(
    store: &Store,
    transaction: &NewTransaction,
) -> Result<Transaction, StoreError> {
    let rows: Vec<Transaction> = store
        .insert(Table::Transactions, std::slice::from_ref(transaction))
        .await?;
    rows.into_iter()
        .next()
        .ok_or_else(|| StoreError::NotFound(format!("Transaction {}", transaction.transaction_id)))
}

pub async fn update_transaction(
    store: &Store,
    transaction_id: &str,
    updates: &TransactionUpdate,
) -> Result<Transaction, StoreError> {
    let rows: Vec<Transaction> = store
        .update(Table::Transactions, "transaction_id", transaction_id, updates)
        .await?;
    rows.into_iter()
        .next()
        .ok_or_else(|| StoreError::NotFound(format!("Transaction {}", transaction_id)))
}

pub async fn delete_transaction(store: &Store, transaction_id: &str) -> Result<(), StoreError> {
    store
        .delete(Table::Transactions, "transaction_id", transaction_id)
        .await
}
