//! Data models representing backend tables.
//!
//! Every record is owned by the managed backend; these are the transient
//! copies the application reads, patches from the change feed and renders.

/// Financial account model
pub mod account;
/// Interpersonal debt ledger model
pub mod debt;
/// Reference list of people
pub mod person;
/// Transaction model
pub mod transaction;
/// Authenticated identity and session
pub mod user;

use serde::{Deserialize, Deserializer};

/// Deserialize a nullable amount, reading `null` as zero.
///
/// Combine with `#[serde(default)]` so a missing column also reads as zero.
pub(crate) fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}
