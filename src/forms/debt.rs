//! Add-debt form.

use chrono::NaiveDate;

use super::{
    AMOUNT_MUST_BE_POSITIVE, FieldErrors, FormController, FormKind, FormState, generate_id,
    parse_amount,
};
use crate::format::default_debt_period;
use crate::models::debt::{DebtStatus, NewDebt};
use crate::validation::validate_period_tag;

pub const INVALID_PERIOD_TAG: &str = "Period must be a date in YYYYMMDD form";

#[derive(Debug, Clone)]
pub struct DebtForm {
    state: FormState,
    today: NaiveDate,
}

impl DebtForm {
    /// New form filed under the first day of `today`'s month.
    pub fn new(today: NaiveDate) -> Self {
        let mut form = Self {
            state: FormState::default(),
            today,
        };
        form.reset();
        form
    }
}

impl FormController for DebtForm {
    type Payload = NewDebt;

    const KIND: FormKind = FormKind::Debt;

    fn state(&self) -> &FormState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FormState {
        &mut self.state
    }

    fn defaults(&self) -> Vec<(&'static str, String)> {
        vec![
            ("person_id", String::new()),
            ("amount", String::new()),
            ("description", String::new()),
            ("period_tag", default_debt_period(self.today)),
        ]
    }

    fn prepare(&self) -> Result<NewDebt, FieldErrors> {
        let mut errors = FieldErrors::new();

        let person_id = self.state.optional("person_id");
        if person_id.is_none() {
            errors.insert("person_id".into(), "Person is required".into());
        }
        let amount = parse_amount(self.state.value("amount")).filter(|a| *a > 0.0);
        if amount.is_none() {
            errors.insert("amount".into(), AMOUNT_MUST_BE_POSITIVE.into());
        }

        let period_tag = self
            .state
            .optional("period_tag")
            .unwrap_or_else(|| default_debt_period(self.today));
        if !validate_period_tag(&period_tag) {
            errors.insert("period_tag".into(), INVALID_PERIOD_TAG.into());
        }

        let (Some(person_id), Some(amount), true) = (person_id, amount, errors.is_empty()) else {
            return Err(errors);
        };

        Ok(NewDebt {
            ledger_id: generate_id("DEB"),
            person_id,
            sum_debt_initial: amount,
            sum_debt: amount,
            sum_repaid: 0.0,
            sum_back_on_debt: 0.0,
            status: DebtStatus::Open,
            period_tag,
            notes: self.state.optional("description"),
        })
    }
}
