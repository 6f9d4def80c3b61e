//! Field predicates shared by the forms.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 8;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

static PERIOD_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8}$").expect("valid period tag regex"));

/// `local@domain.tld` shape; no attempt at full RFC 5322.
pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn validate_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

pub fn validate_password_match(password: &str, confirm: &str) -> bool {
    password == confirm
}

/// Non-empty after trimming whitespace.
pub fn validate_required(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Eight digits naming a real calendar day, `YYYYMMDD`.
pub fn validate_period_tag(tag: &str) -> bool {
    PERIOD_TAG_RE.is_match(tag) && NaiveDate::parse_from_str(tag, "%Y%m%d").is_ok()
}
