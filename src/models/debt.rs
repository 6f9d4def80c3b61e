//! Debt ledger models.
//!
//! A ledger entry tracks what one person owes over a period. Repayments are
//! not stored as their own rows: applying one inserts an expense transaction
//! and asks the backend procedure `process_debt_repayment` to move money from
//! `sum_debt` to `sum_repaid`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::change_feed::{Record, Table};
use crate::models::null_as_zero;

/// Lifecycle of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DebtStatus {
    Open,
    Partial,
    FullyRepaid,
    Overdue,
    #[serde(other)]
    Other,
}

impl DebtStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Some(Self::Open),
            "PARTIAL" => Some(Self::Partial),
            "FULLY_REPAID" => Some(Self::FullyRepaid),
            "OVERDUE" => Some(Self::Overdue),
            _ => None,
        }
    }

    /// Label shown on the status badge (`FULLY_REPAID` reads as "FULLY REPAID").
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Partial => "PARTIAL",
            Self::FullyRepaid => "FULLY REPAID",
            Self::Overdue => "OVERDUE",
            Self::Other => "UNKNOWN",
        }
    }
}

/// Embedded `people:person_id (name)` join.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PersonName {
    pub name: Option<String>,
}

/// Row of the `debt_ledger` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtEntry {
    /// Identifier of the form `DEB-<millis>`
    pub ledger_id: String,

    pub person_id: String,

    #[serde(default, deserialize_with = "null_as_zero")]
    pub sum_debt_initial: f64,

    /// Outstanding debt amount
    #[serde(default, deserialize_with = "null_as_zero")]
    pub sum_debt: f64,

    /// Cumulative repaid amount
    #[serde(default, deserialize_with = "null_as_zero")]
    pub sum_repaid: f64,

    /// Debt accrued again after a partial repayment
    #[serde(default, deserialize_with = "null_as_zero")]
    pub sum_back_on_debt: f64,

    pub status: DebtStatus,

    #[serde(default)]
    pub period_tag: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,

    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,

    /// Joined person name (filled from the embedded `people` object)
    #[serde(default)]
    pub person_name: Option<String>,

    #[serde(default, skip_serializing)]
    pub people: Option<PersonName>,
}

impl DebtEntry {
    /// Remaining debt as used by repayment validation (not clamped).
    pub fn remaining(&self) -> f64 {
        self.sum_debt - self.sum_repaid
    }

    /// Move the embedded join onto `person_name`.
    pub fn with_person_name(mut self) -> Self {
        if let Some(people) = self.people.take() {
            if self.person_name.is_none() {
                self.person_name = people.name;
            }
        }
        self
    }
}

impl Record for DebtEntry {
    const TABLE: Table = Table::DebtLedger;
    const KEY: &'static str = "ledger_id";

    fn key(&self) -> &str {
        &self.ledger_id
    }
}

/// Insert body for a new ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDebt {
    pub ledger_id: String,
    pub person_id: String,
    pub sum_debt_initial: f64,
    pub sum_debt: f64,
    pub sum_repaid: f64,
    pub sum_back_on_debt: f64,
    pub status: DebtStatus,
    pub period_tag: String,
    pub notes: Option<String>,
}

/// Repayment against an existing ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepaymentRequest {
    pub ledger_id: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub notes: Option<String>,

    /// Debtor, copied onto the generated transaction
    pub person_id: Option<String>,
}

/// Body of a status change.
#[derive(Debug, Clone, Serialize)]
pub struct DebtStatusUpdate {
    pub status: DebtStatus,
    pub last_updated: DateTime<Utc>,
}

/// Arguments of the `process_debt_repayment` procedure.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessRepaymentArgs<'a> {
    pub p_ledger_id: &'a str,
    pub p_amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joined_person_name_is_flattened() {
        let entry: DebtEntry = serde_json::from_value(json!({
            "ledger_id": "DEB-1",
            "person_id": "P-1",
            "sum_debt": 100.0,
            "sum_repaid": null,
            "status": "PARTIAL",
            "people": { "name": "Linh" }
        }))
        .unwrap();
        let entry = entry.with_person_name();
        assert_eq!(entry.person_name.as_deref(), Some("Linh"));
        assert_eq!(entry.sum_repaid, 0.0);
        assert_eq!(entry.remaining(), 100.0);
    }

    #[test]
    fn status_labels() {
        assert_eq!(DebtStatus::parse("fully_repaid"), Some(DebtStatus::FullyRepaid));
        assert_eq!(DebtStatus::FullyRepaid.label(), "FULLY REPAID");
        assert_eq!(DebtStatus::parse("settled"), None);
    }
}
