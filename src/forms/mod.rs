//! Form controllers.
//!
//! Every form holds its field values and a parallel map of field errors.
//! Changing a field clears that field's error. Submitting runs a synchronous
//! validation pass; any error abandons the submission and nothing is sent.
//! A clean pass builds a normalized payload and hands it to the injected
//! async operation, and only a successful operation resets the form.
//!
//! - `login`: email + password
//! - `signup`: name, email, password, confirmation
//! - `transaction`: add-transaction with type-conditional account rules
//! - `debt`: open a ledger entry for a person
//! - `repayment`: repay part of a ledger entry, bounded by what remains

pub mod debt;
pub mod login;
pub mod repayment;
pub mod signup;
pub mod transaction;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{AppError, StoreError};

/// Field name → message.
pub type FieldErrors = BTreeMap<String, String>;

/// Identifies a form across requests, used to guard against double submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    Login,
    Signup,
    Transaction,
    Debt,
    Repayment,
}

/// Editable values and current errors of one form instance.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    values: BTreeMap<String, String>,
    errors: FieldErrors,
    busy: bool,
}

impl FormState {
    /// Declare the form's fields with their initial values.
    pub fn with_defaults(defaults: &[(&str, String)]) -> Self {
        Self {
            values: defaults
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect(),
            errors: FieldErrors::new(),
            busy: false,
        }
    }

    /// Update a declared field and clear its error. Unknown names are ignored.
    pub fn set_field(&mut self, name: &str, value: impl Into<String>) -> bool {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value.into();
                self.errors.remove(name);
                true
            }
            None => false,
        }
    }

    /// Current value, empty when the field is unset.
    pub fn value(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    /// Trimmed value, `None` when blank.
    pub fn optional(&self, name: &str) -> Option<String> {
        let value = self.value(name).trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    /// True while the submit operation is awaited; callers disable submit on it.
    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

/// A concrete form: its fields, its validation and the payload it builds.
pub trait FormController {
    type Payload;

    const KIND: FormKind;

    fn state(&self) -> &FormState;

    fn state_mut(&mut self) -> &mut FormState;

    /// Field names with their initial values, used on construction and reset.
    fn defaults(&self) -> Vec<(&'static str, String)>;

    /// Validate every field and, when clean, build the payload.
    fn prepare(&self) -> Result<Self::Payload, FieldErrors>;

    fn set_field(&mut self, name: &str, value: impl Into<String>) -> bool {
        self.state_mut().set_field(name, value)
    }

    /// Apply a batch of posted fields in order.
    fn fill(&mut self, input: FormInput) {
        for (name, value) in input.0 {
            self.set_field(&name, value);
        }
    }

    fn reset(&mut self) {
        let defaults = self.defaults();
        *self.state_mut() = FormState::with_defaults(&defaults);
    }
}

/// Serializable snapshot of a form: what to render and what went wrong.
#[derive(Debug, Clone, Serialize)]
pub struct FormView {
    pub kind: FormKind,
    pub values: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: FieldErrors,

    pub busy: bool,
}

impl FormView {
    pub fn of<C: FormController>(form: &C) -> Self {
        let state = form.state();
        Self {
            kind: C::KIND,
            values: state.values.clone(),
            errors: state.errors.clone(),
            busy: state.busy,
        }
    }
}

/// Why a submission did not complete.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// Local validation failed; nothing was sent.
    #[error("Validation failed")]
    Invalid(FieldErrors),

    /// A previous submission of the same form is still running.
    #[error("Form is already being submitted")]
    Busy,

    /// The operation ran and the backend refused it. The form keeps its values.
    #[error("{0}")]
    Rejected(#[from] StoreError),
}

impl From<SubmitError> for AppError {
    fn from(error: SubmitError) -> Self {
        match error {
            SubmitError::Invalid(fields) => AppError::Validation(fields),
            SubmitError::Busy => AppError::SubmissionInFlight,
            SubmitError::Rejected(e) => AppError::Backend(e),
        }
    }
}

/// Validate, run `operation` with the payload, and reset on success.
///
/// On validation failure the errors are stored on the form and returned.
/// On operation failure the form is left untouched so the user can retry.
pub async fn submit<C, F, Fut, T>(form: &mut C, operation: F) -> Result<T, SubmitError>
where
    C: FormController,
    F: FnOnce(C::Payload) -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    if form.state().busy {
        return Err(SubmitError::Busy);
    }

    let payload = match form.prepare() {
        Ok(payload) => payload,
        Err(errors) => {
            form.state_mut().errors = errors.clone();
            return Err(SubmitError::Invalid(errors));
        }
    };

    form.state_mut().busy = true;
    let result = operation(payload).await;
    form.state_mut().busy = false;

    match result {
        Ok(value) => {
            form.reset();
            Ok(value)
        }
        Err(e) => {
            tracing::warn!(form = ?C::KIND, error = %e, "form submission rejected");
            Err(SubmitError::Rejected(e))
        }
    }
}

/// Posted form fields. Accepts any JSON scalar and keeps it as text, the way
/// an input element would hold it.
#[derive(Debug, Clone, Default)]
pub struct FormInput(pub Vec<(String, String)>);

impl<'de> Deserialize<'de> for FormInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let fields = raw
            .into_iter()
            .map(|(name, value)| {
                let text = match value {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (name, text)
            })
            .collect();
        Ok(FormInput(fields))
    }
}

impl<const N: usize> From<[(&str, &str); N]> for FormInput {
    fn from(fields: [(&str, &str); N]) -> Self {
        FormInput(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

static LAST_ID_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Record identifier `<PREFIX>-<millis>`, strictly increasing within the process.
pub fn generate_id(prefix: &str) -> String {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_ID_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = now.max(last + 1);
        match LAST_ID_MILLIS.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed)
        {
            Ok(_) => return format!("{}-{}", prefix, next),
            Err(actual) => last = actual,
        }
    }
}

/// Parse a positive amount field; `None` for blank, non-numeric or non-finite input.
pub(crate) fn parse_amount(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
}

pub(crate) const AMOUNT_MUST_BE_POSITIVE: &str = "Amount must be > 0";
