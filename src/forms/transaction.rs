//! Add-transaction form.
//!
//! Which accounts are required depends on the transaction type:
//!
//! | type       | source   | destination |
//! |------------|----------|-------------|
//! | `EXPENSE`  | required | cleared     |
//! | `INCOME`   | cleared  | required    |
//! | `TRANSFER` | required | required, different from source |
//!
//! Other types keep whatever accounts were chosen.

use chrono::NaiveDate;

use super::{
    AMOUNT_MUST_BE_POSITIVE, FieldErrors, FormController, FormKind, FormState, generate_id,
    parse_amount,
};
use crate::format::{parse_iso_date, period_tag};
use crate::models::transaction::{
    NewTransaction, STATUS_ACTIVE, TransactionType, is_known_category,
};

#[derive(Debug, Clone)]
pub struct TransactionForm {
    state: FormState,
    today: NaiveDate,
}

impl TransactionForm {
    /// New form dated `today`, defaulting to an expense.
    pub fn new(today: NaiveDate) -> Self {
        let mut form = Self {
            state: FormState::default(),
            today,
        };
        form.reset();
        form
    }
}

impl FormController for TransactionForm {
    type Payload = NewTransaction;

    const KIND: FormKind = FormKind::Transaction;

    fn state(&self) -> &FormState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FormState {
        &mut self.state
    }

    fn defaults(&self) -> Vec<(&'static str, String)> {
        vec![
            ("date", self.today.format("%Y-%m-%d").to_string()),
            ("amount", String::new()),
            ("txn_type", TransactionType::Expense.as_str().to_string()),
            ("from_account_id", String::new()),
            ("to_account_id", String::new()),
            ("category_id", String::new()),
            ("notes", String::new()),
        ]
    }

    fn prepare(&self) -> Result<NewTransaction, FieldErrors> {
        let mut errors = FieldErrors::new();

        let date = parse_iso_date(self.state.value("date"));
        if date.is_none() {
            let message = if self.state.optional("date").is_none() {
                "Date is required"
            } else {
                "Invalid date"
            };
            errors.insert("date".into(), message.into());
        }

        let amount = parse_amount(self.state.value("amount")).filter(|a| *a > 0.0);
        if amount.is_none() {
            errors.insert("amount".into(), AMOUNT_MUST_BE_POSITIVE.into());
        }

        let txn_type = TransactionType::parse(self.state.value("txn_type"));
        if txn_type.is_none() {
            errors.insert("txn_type".into(), "Transaction type is required".into());
        }

        let category = self.state.optional("category_id");
        match category.as_deref() {
            None => {
                errors.insert("category_id".into(), "Category is required".into());
            }
            Some(code) if !is_known_category(code) => {
                errors.insert("category_id".into(), "Unknown category".into());
            }
            Some(_) => {}
        }

        let from = self.state.optional("from_account_id");
        let to = self.state.optional("to_account_id");
        match txn_type {
            Some(TransactionType::Transfer) => {
                if from.is_none() {
                    errors.insert("from_account_id".into(), "From account required".into());
                }
                if to.is_none() {
                    errors.insert("to_account_id".into(), "To account required".into());
                }
                if from.is_some() && from == to {
                    errors.insert(
                        "to_account_id".into(),
                        "From and To accounts cannot be same".into(),
                    );
                }
            }
            Some(TransactionType::Expense) if from.is_none() => {
                errors.insert("from_account_id".into(), "Account required".into());
            }
            Some(TransactionType::Income) if to.is_none() => {
                errors.insert("to_account_id".into(), "Account required".into());
            }
            _ => {}
        }

        let (Some(date), Some(amount), Some(txn_type), true) =
            (date, amount, txn_type, errors.is_empty())
        else {
            return Err(errors);
        };

        let (from_account_id, to_account_id) = match txn_type {
            TransactionType::Expense => (from, None),
            TransactionType::Income => (None, to),
            _ => (from, to),
        };

        Ok(NewTransaction {
            transaction_id: generate_id("TXN"),
            date,
            amount,
            txn_type,
            from_account_id,
            to_account_id,
            category_id: category,
            status: STATUS_ACTIVE.to_string(),
            period_tag: period_tag(date),
            notes: self.state.optional("notes"),
            person_id: None,
        })
    }
}
