//! Account data models.
//!
//! This module defines:
//! - `AccountType`: the closed set of account kinds
//! - `Account`: a row of the `accounts` table

use serde::{Deserialize, Serialize};

use crate::change_feed::{Record, Table};
use crate::models::null_as_zero;

/// Kind of financial account.
///
/// Stored as `BANK`, `CREDIT_CARD` or `WALLET`. Anything else the backend
/// returns is kept as `Other` so a new kind never breaks a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Bank,
    CreditCard,
    Wallet,
    #[serde(other)]
    Other,
}

impl AccountType {
    /// Label shown in tables (`CREDIT_CARD` reads as "CREDIT CARD").
    pub fn label(self) -> &'static str {
        match self {
            AccountType::Bank => "BANK",
            AccountType::CreditCard => "CREDIT CARD",
            AccountType::Wallet => "WALLET",
            AccountType::Other => "OTHER",
        }
    }
}

/// Represents an account record from the backend.
///
/// # Balance
///
/// The balance is signed; its sign only drives display colour. Nothing here
/// links the balance to transaction history, the backend is trusted as the
/// source of truth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for this account
    pub account_id: String,

    /// Human-readable name, also the list ordering key
    pub account_name: String,

    pub account_type: AccountType,

    /// Current balance; `null` reads as zero
    #[serde(default, deserialize_with = "null_as_zero")]
    pub balance: f64,

    /// Credit limit, only meaningful for cards
    #[serde(default)]
    pub credit_limit: Option<f64>,

    /// Cashback rate in percent
    #[serde(default, deserialize_with = "null_as_zero")]
    pub cashback_rate: f64,

    #[serde(default)]
    pub is_active: bool,
}

impl Record for Account {
    const TABLE: Table = Table::Accounts;
    const KEY: &'static str = "account_id";

    fn key(&self) -> &str {
        &self.account_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_amounts_read_as_zero() {
        let account: Account = serde_json::from_value(json!({
            "account_id": "ACC-1",
            "account_name": "Cash",
            "account_type": "WALLET",
            "balance": null,
            "credit_limit": null,
            "is_active": true
        }))
        .unwrap();
        assert_eq!(account.balance, 0.0);
        assert_eq!(account.cashback_rate, 0.0);
        assert_eq!(account.credit_limit, None);
    }

    #[test]
    fn unknown_account_type_is_kept_as_other() {
        let account: Account = serde_json::from_value(json!({
            "account_id": "ACC-2",
            "account_name": "Broker",
            "account_type": "INVESTMENT",
            "balance": 10.0
        }))
        .unwrap();
        assert_eq!(account.account_type, AccountType::Other);
        assert_eq!(AccountType::CreditCard.label(), "CREDIT CARD");
    }
}
