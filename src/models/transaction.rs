//! Transaction data models and request types.
//!
//! This module defines:
//! - `TransactionType`: the six kinds of money movement
//! - `Transaction`: a row of the `transactions` table
//! - `NewTransaction`: the normalized payload inserted by the add-transaction form
//! - `TransactionUpdate`: partial update body
//! - `CATEGORIES`: the category catalogue offered by the form

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::change_feed::{Record, Table};
use crate::models::null_as_zero;

/// Type of transaction.
///
/// # Account rules
///
/// - `Expense`: only the source account is set
/// - `Income`: only the destination account is set
/// - `Transfer`: both are set and differ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Expense,
    Income,
    Transfer,
    Refund,
    CashbackEarned,
    CashbackGiven,
    #[serde(other)]
    Other,
}

impl TransactionType {
    /// Parse the wire name (`EXPENSE`, `CASHBACK_EARNED`, ...).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EXPENSE" => Some(Self::Expense),
            "INCOME" => Some(Self::Income),
            "TRANSFER" => Some(Self::Transfer),
            "REFUND" => Some(Self::Refund),
            "CASHBACK_EARNED" => Some(Self::CashbackEarned),
            "CASHBACK_GIVEN" => Some(Self::CashbackGiven),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "EXPENSE",
            Self::Income => "INCOME",
            Self::Transfer => "TRANSFER",
            Self::Refund => "REFUND",
            Self::CashbackEarned => "CASHBACK_EARNED",
            Self::CashbackGiven => "CASHBACK_GIVEN",
            Self::Other => "OTHER",
        }
    }

    /// Whether money flows toward the user (shown with a `+`).
    pub fn is_inflow(self) -> bool {
        matches!(self, Self::Income | Self::Refund | Self::CashbackEarned)
    }
}

/// Status written on every transaction the application creates.
pub const STATUS_ACTIVE: &str = "ACTIVE";

/// Category catalogue: (stored value, label).
pub const CATEGORIES: &[(&str, &str)] = &[
    ("FOOD", "Food & Dining"),
    ("SHOPPING", "Shopping"),
    ("TRANSPORT", "Transportation"),
    ("ENTERTAINMENT", "Entertainment"),
    ("UTILITIES", "Utilities"),
    ("HEALTHCARE", "Healthcare"),
    ("EDUCATION", "Education"),
    ("TRAVEL", "Travel"),
    ("CASHBACK", "Cashback"),
    ("REFUND", "Refund"),
    ("SALARY", "Salary"),
    ("GIFT", "Gift"),
    ("OTHER", "Other"),
];

pub fn is_known_category(value: &str) -> bool {
    CATEGORIES.iter().any(|(code, _)| *code == value)
}

/// Represents a transaction record from the backend.
///
/// Amounts are positive magnitudes; direction comes from `txn_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Identifier of the form `TXN-<millis>`
    pub transaction_id: String,

    pub date: NaiveDate,

    #[serde(default, deserialize_with = "null_as_zero")]
    pub amount: f64,

    pub txn_type: TransactionType,

    #[serde(default)]
    pub from_account_id: Option<String>,

    #[serde(default)]
    pub to_account_id: Option<String>,

    #[serde(default)]
    pub category_id: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    /// Compact `YYYYMMDD` token derived from `date`
    #[serde(default)]
    pub period_tag: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,

    /// Person this transaction settles a debt with, if any
    #[serde(default)]
    pub person_id: Option<String>,
}

impl Record for Transaction {
    const TABLE: Table = Table::Transactions;
    const KEY: &'static str = "transaction_id";

    fn key(&self) -> &str {
        &self.transaction_id
    }
}

/// Insert body for the `transactions` table.
///
/// # JSON Example
///
/// ```json
/// {
///   "transaction_id": "TXN-1718000000000",
///   "date": "2024-06-10",
///   "amount": 45000.0,
///   "txn_type": "EXPENSE",
///   "from_account_id": "ACC-1",
///   "to_account_id": null,
///   "category_id": "FOOD",
///   "status": "ACTIVE",
///   "period_tag": "20240610",
///   "notes": null,
///   "person_id": null
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTransaction {
    pub transaction_id: String,
    pub date: NaiveDate,
    pub amount: f64,
    pub txn_type: TransactionType,
    pub from_account_id: Option<String>,
    pub to_account_id: Option<String>,
    pub category_id: Option<String>,
    pub status: String,
    pub period_tag: String,
    pub notes: Option<String>,
    pub person_id: Option<String>,
}

/// Partial update body; absent fields are left untouched by the backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names_case_insensitively() {
        assert_eq!(TransactionType::parse("transfer"), Some(TransactionType::Transfer));
        assert_eq!(
            TransactionType::parse("CASHBACK_EARNED"),
            Some(TransactionType::CashbackEarned)
        );
        assert_eq!(TransactionType::parse("loan"), None);
    }

    #[test]
    fn inflow_types() {
        assert!(TransactionType::Income.is_inflow());
        assert!(TransactionType::Refund.is_inflow());
        assert!(TransactionType::CashbackEarned.is_inflow());
        assert!(!TransactionType::CashbackGiven.is_inflow());
        assert!(!TransactionType::Transfer.is_inflow());
    }

    #[test]
    fn update_body_skips_absent_fields() {
        let update = TransactionUpdate {
            notes: Some("lunch".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(update).unwrap(),
            serde_json::json!({ "notes": "lunch" })
        );
    }
}
