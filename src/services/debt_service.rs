//! Debt ledger reads and writes.
//!
//! # Repayment
//!
//! A repayment is two requests:
//! 1. insert an `EXPENSE` transaction tagged to the ledger entry
//! 2. call `process_debt_repayment(p_ledger_id, p_amount)`, which adjusts
//!    `sum_debt` and `sum_repaid` on the backend
//!
//! Atomicity of the pair is the backend's concern; when step 2 fails the
//! error is returned and the inserted transaction stays.

use chrono::Utc;

use crate::backend::{Direction, Query, Store};
use crate::change_feed::Table;
use crate::error::StoreError;
use crate::forms::generate_id;
use crate::format::period_tag;
use crate::models::debt::{
    DebtEntry, DebtStatus, DebtStatusUpdate, NewDebt, ProcessRepaymentArgs, RepaymentRequest,
};
use crate::models::transaction::{NewTransaction, STATUS_ACTIVE, Transaction, TransactionType};
use crate::services::transaction_service;

/// Select list joining the debtor's name.
const DEBT_COLUMNS: &str = "*,people:person_id(name)";

/// Ledger entries, newest period first, optionally limited to one period.
pub async fn get_debts(store: &Store, period: Option<&str>) -> Result<Vec<DebtEntry>, StoreError> {
    let mut query = Query::from(Table::DebtLedger)
        .select(DEBT_COLUMNS)
        .order("period_tag", Direction::Descending);
    if let Some(period) = period {
        query = query.eq("period_tag", period);
    }
    let rows: Vec<DebtEntry> = store.select(&query).await?;
    Ok(rows.into_iter().map(DebtEntry::with_person_name).collect())
}

pub async fn get_debt_by_id(store: &Store, ledger_id: &str) -> Result<DebtEntry, StoreError> {
    let query = Query::from(Table::DebtLedger)
        .select(DEBT_COLUMNS)
        .eq("ledger_id", ledger_id);
    let entry: DebtEntry = store
        .select_one(query, &format!("Debt {}", ledger_id))
        .await?;
    Ok(entry.with_person_name())
}

pub async fn get_debt_by_person_and_period(
    store: &Store,
    person_id: &str,
    period: &str,
) -> Result<DebtEntry, StoreError> {
    let query = Query::from(Table::DebtLedger)
        .eq("person_id", person_id)
        .eq("period_tag", period);
    store
        .select_one(query, &format!("Debt for {} in {}", person_id, period))
        .await
}

/// Change the status and stamp `last_updated`.
pub async fn update_debt_status(
    store: &Store,
    ledger_id: &str,
    status: DebtStatus,
) -> Result<DebtEntry, StoreError> {
    let body = DebtStatusUpdate {
        status,
        last_updated: Utc::now(),
    };
    let rows: Vec<DebtEntry> = store
        .update(Table::DebtLedger, "ledger_id", ledger_id, &body)
        .await?;
    rows.into_iter()
        .next()
        .ok_or_else(|| StoreError::NotFound(format!("Debt {}", ledger_id)))
}

pub async fn add_debt(store: &Store, debt: &NewDebt) -> Result<DebtEntry, StoreError> {
    let rows: Vec<DebtEntry> = store
        .insert(Table::DebtLedger, std::slice::from_ref(debt))
        .await?;
    rows.into_iter()
        .next()
        .ok_or_else(|| StoreError::NotFound(format!("Debt {}", debt.ledger_id)))
}

/// The expense transaction recorded for a repayment.
pub fn repayment_transaction(request: &RepaymentRequest) -> NewTransaction {
    let mut notes = format!("Debt repayment for {}", request.ledger_id);
    if let Some(extra) = &request.notes {
        notes.push_str(": ");
        notes.push_str(extra);
    }

    NewTransaction {
        transaction_id: generate_id("TXN"),
        date: request.date,
        amount: request.amount,
        txn_type: TransactionType::Expense,
        from_account_id: None,
        to_account_id: None,
        category_id: None,
        status: STATUS_ACTIVE.to_string(),
        period_tag: period_tag(request.date),
        notes: Some(notes),
        person_id: request.person_id.clone(),
    }
}

/// Record a repayment; returns the inserted transaction.
pub async fn add_repayment(
    store: &Store,
    request: &RepaymentRequest,
) -> Result<Transaction, StoreError> {
    let transaction =
        transaction_service::create_transaction(store, &repayment_transaction(request)).await?;

    store
        .rpc(
            "process_debt_repayment",
            &ProcessRepaymentArgs {
                p_ledger_id: &request.ledger_id,
                p_amount: request.amount,
            },
        )
        .await
        .inspect_err(|e| {
            tracing::error!(
                ledger = %request.ledger_id,
                transaction = %transaction.transaction_id,
                error = %e,
                "repayment transaction stored but ledger adjustment failed"
            )
        })?;

    Ok(transaction)
}
