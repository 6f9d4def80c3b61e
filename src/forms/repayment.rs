//! Add-repayment form.
//!
//! The bound is checked against the ledger snapshot held by the form at
//! submission time; callers refresh it with `set_debt` before submitting.

use chrono::NaiveDate;

use super::{AMOUNT_MUST_BE_POSITIVE, FieldErrors, FormController, FormKind, FormState, parse_amount};
use crate::format::{format_number, parse_iso_date, round_for_display};
use crate::models::debt::{DebtEntry, RepaymentRequest};

#[derive(Debug, Clone)]
pub struct RepaymentForm {
    state: FormState,
    debt: DebtEntry,
    today: NaiveDate,
}

impl RepaymentForm {
    pub fn new(debt: DebtEntry, today: NaiveDate) -> Self {
        let mut form = Self {
            state: FormState::default(),
            debt,
            today,
        };
        form.reset();
        form
    }

    pub fn debt(&self) -> &DebtEntry {
        &self.debt
    }

    /// Replace the ledger snapshot the bound is checked against.
    pub fn set_debt(&mut self, debt: DebtEntry) {
        self.debt = debt;
    }

    /// What is left to repay, at the precision shown to the user.
    pub fn remaining(&self) -> f64 {
        round_for_display(self.debt.remaining())
    }
}

impl FormController for RepaymentForm {
    type Payload = RepaymentRequest;

    const KIND: FormKind = FormKind::Repayment;

    fn state(&self) -> &FormState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FormState {
        &mut self.state
    }

    fn defaults(&self) -> Vec<(&'static str, String)> {
        vec![
            ("amount", String::new()),
            ("date", self.today.format("%Y-%m-%d").to_string()),
            ("notes", String::new()),
        ]
    }

    fn prepare(&self) -> Result<RepaymentRequest, FieldErrors> {
        let mut errors = FieldErrors::new();
        let remaining = self.remaining();

        let amount = match parse_amount(self.state.value("amount")) {
            Some(amount) if amount <= 0.0 => None,
            Some(amount) if round_for_display(amount) > remaining => {
                errors.insert(
                    "amount".into(),
                    format!(
                        "Cannot exceed remaining debt ({})",
                        format_number(remaining)
                    ),
                );
                None
            }
            other => other,
        };
        if amount.is_none() && !errors.contains_key("amount") {
            errors.insert("amount".into(), AMOUNT_MUST_BE_POSITIVE.into());
        }

        let date = parse_iso_date(self.state.value("date"));
        if date.is_none() {
            errors.insert("date".into(), "Invalid date".into());
        }

        let (Some(amount), Some(date)) = (amount, date) else {
            return Err(errors);
        };

        Ok(RepaymentRequest {
            ledger_id: self.debt.ledger_id.clone(),
            amount,
            date,
            notes: self.state.optional("notes"),
            person_id: Some(self.debt.person_id.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::debt::DebtStatus;

    fn debt(sum_debt: f64, sum_repaid: f64) -> DebtEntry {
        DebtEntry {
            ledger_id: "DEB-1".to_string(),
            person_id: "P-1".to_string(),
            sum_debt_initial: sum_debt,
            sum_debt,
            sum_repaid,
            sum_back_on_debt: 0.0,
            status: DebtStatus::Partial,
            period_tag: Some("20240601".to_string()),
            notes: None,
            last_updated: None,
            person_name: None,
            people: None,
        }
    }

    fn form_with(amount: &str, debt: DebtEntry) -> RepaymentForm {
        let mut form = RepaymentForm::new(debt, NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        form.set_field("amount", amount);
        form
    }

    #[test]
    fn amount_up_to_remaining_is_accepted() {
        let request = form_with("60", debt(100.0, 40.0)).prepare().unwrap();
        assert_eq!(request.amount, 60.0);
        assert_eq!(request.ledger_id, "DEB-1");
        assert_eq!(request.person_id.as_deref(), Some("P-1"));
    }

    #[test]
    fn amount_over_remaining_names_the_remaining_value() {
        let errors = form_with("60.5", debt(100.0, 40.0)).prepare().unwrap_err();
        assert_eq!(errors["amount"], "Cannot exceed remaining debt (60)");

        let errors = form_with("2000000", debt(1_500_000.5, 0.0))
            .prepare()
            .unwrap_err();
        assert_eq!(errors["amount"], "Cannot exceed remaining debt (1.500.000,5)");
    }

    #[test]
    fn exact_remaining_is_accepted_despite_float_noise() {
        // 0.3 - 0.1 is 0.19999999999999998 in f64
        let request = form_with("0.2", debt(0.3, 0.1)).prepare().unwrap();
        assert_eq!(request.amount, 0.2);

        let errors = form_with("0.201", debt(0.3, 0.1)).prepare().unwrap_err();
        assert_eq!(errors["amount"], "Cannot exceed remaining debt (0,2)");
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let errors = form_with("0", debt(100.0, 0.0)).prepare().unwrap_err();
        assert_eq!(errors["amount"], "Amount must be > 0");
        let errors = form_with("", debt(100.0, 0.0)).prepare().unwrap_err();
        assert_eq!(errors["amount"], "Amount must be > 0");
    }

    #[test]
    fn refreshed_snapshot_tightens_the_bound() {
        let mut form = form_with("50", debt(100.0, 0.0));
        form.set_debt(debt(100.0, 70.0));
        let errors = form.prepare().unwrap_err();
        assert_eq!(errors["amount"], "Cannot exceed remaining debt (30)");
    }
}
