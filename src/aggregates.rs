//! Page-level totals.
//!
//! Always recomputed from the whole in-memory collection, never maintained
//! incrementally. Missing amounts count as zero and an empty collection
//! yields zeros.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::models::account::Account;
use crate::models::debt::DebtEntry;
use crate::models::transaction::{Transaction, TransactionType};

fn finite(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

pub fn total_balance(accounts: &[Account]) -> f64 {
    accounts.iter().map(|a| finite(a.balance)).sum()
}

pub fn total_credit_limit(accounts: &[Account]) -> f64 {
    accounts
        .iter()
        .filter_map(|a| a.credit_limit)
        .map(finite)
        .sum()
}

pub fn total_debt(debts: &[DebtEntry]) -> f64 {
    debts.iter().map(|d| finite(d.sum_debt)).sum()
}

pub fn total_repaid(debts: &[DebtEntry]) -> f64 {
    debts.iter().map(|d| finite(d.sum_repaid)).sum()
}

/// Share of the debt already repaid, in percent, capped at 100.
///
/// A zero debt counts as fully repaid.
pub fn progress_percent(repaid: f64, debt: f64) -> f64 {
    if debt == 0.0 {
        return 100.0;
    }
    (repaid / debt * 100.0).min(100.0)
}

/// Remaining debt for display, never below zero.
pub fn remaining_for_display(entry: &DebtEntry) -> f64 {
    entry.remaining().max(0.0)
}

/// Sum of `txn_type` amounts dated in the same month as `today`.
pub fn month_total(transactions: &[Transaction], txn_type: TransactionType, today: NaiveDate) -> f64 {
    transactions
        .iter()
        .filter(|t| t.txn_type == txn_type)
        .filter(|t| t.date.year() == today.year() && t.date.month() == today.month())
        .map(|t| finite(t.amount))
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccountTotals {
    pub total_balance: f64,
    pub total_credit_limit: f64,
}

impl AccountTotals {
    pub fn compute(accounts: &[Account]) -> Self {
        Self {
            total_balance: total_balance(accounts),
            total_credit_limit: total_credit_limit(accounts),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DebtTotals {
    pub total_debt: f64,
    pub total_repaid: f64,
}

impl DebtTotals {
    pub fn compute(debts: &[DebtEntry]) -> Self {
        Self {
            total_debt: total_debt(debts),
            total_repaid: total_repaid(debts),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DashboardTotals {
    pub total_balance: f64,
    pub month_spending: f64,
    pub cashback_earned: f64,
    pub outstanding_debt: f64,
}

impl DashboardTotals {
    pub fn compute(
        accounts: &[Account],
        transactions: &[Transaction],
        debts: &[DebtEntry],
        today: NaiveDate,
    ) -> Self {
        Self {
            total_balance: total_balance(accounts),
            month_spending: month_total(transactions, TransactionType::Expense, today),
            cashback_earned: month_total(transactions, TransactionType::CashbackEarned, today),
            outstanding_debt: debts.iter().map(remaining_for_display).sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::AccountType;
    use crate::models::debt::DebtStatus;

    fn account(balance: f64, credit_limit: Option<f64>) -> Account {
        Account {
            account_id: format!("ACC-{}", balance),
            account_name: "A".to_string(),
            account_type: AccountType::Bank,
            balance,
            credit_limit,
            cashback_rate: 0.0,
            is_active: true,
        }
    }

    fn debt(sum_debt: f64, sum_repaid: f64) -> DebtEntry {
        DebtEntry {
            ledger_id: "DEB-1".to_string(),
            person_id: "P-1".to_string(),
            sum_debt_initial: sum_debt,
            sum_debt,
            sum_repaid,
            sum_back_on_debt: 0.0,
            status: DebtStatus::Open,
            period_tag: None,
            notes: None,
            last_updated: None,
            person_name: None,
            people: None,
        }
    }

    fn txn(date: (i32, u32, u32), txn_type: TransactionType, amount: f64) -> Transaction {
        Transaction {
            transaction_id: "TXN-1".to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount,
            txn_type,
            from_account_id: None,
            to_account_id: None,
            category_id: None,
            status: None,
            period_tag: None,
            notes: None,
            person_id: None,
        }
    }

    #[test]
    fn account_totals_skip_missing_limits() {
        let accounts = vec![account(100.0, None), account(-20.0, Some(5000.0))];
        let totals = AccountTotals::compute(&accounts);
        assert_eq!(totals.total_balance, 80.0);
        assert_eq!(totals.total_credit_limit, 5000.0);
    }

    #[test]
    fn empty_collections_total_zero() {
        assert_eq!(
            AccountTotals::compute(&[]),
            AccountTotals {
                total_balance: 0.0,
                total_credit_limit: 0.0
            }
        );
        assert_eq!(DebtTotals::compute(&[]).total_debt, 0.0);
    }

    #[test]
    fn progress_is_clamped_and_total() {
        assert_eq!(progress_percent(0.0, 0.0), 100.0);
        assert_eq!(progress_percent(50.0, 100.0), 50.0);
        assert_eq!(progress_percent(150.0, 100.0), 100.0);
    }

    #[test]
    fn remaining_never_shows_negative() {
        assert_eq!(remaining_for_display(&debt(100.0, 150.0)), 0.0);
        assert_eq!(remaining_for_display(&debt(100.0, 30.0)), 70.0);
    }

    #[test]
    fn dashboard_counts_only_this_month() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
        let transactions = vec![
            txn((2024, 6, 1), TransactionType::Expense, 40.0),
            txn((2024, 5, 31), TransactionType::Expense, 99.0),
            txn((2024, 6, 2), TransactionType::CashbackEarned, 3.0),
            txn((2024, 6, 3), TransactionType::Income, 500.0),
        ];
        let totals = DashboardTotals::compute(
            &[account(10.0, None)],
            &transactions,
            &[debt(100.0, 25.0)],
            today,
        );
        assert_eq!(totals.month_spending, 40.0);
        assert_eq!(totals.cashback_earned, 3.0);
        assert_eq!(totals.total_balance, 10.0);
        assert_eq!(totals.outstanding_debt, 75.0);
    }
}
