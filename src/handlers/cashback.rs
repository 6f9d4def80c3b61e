//! Cashback page.
//!
//! The route is declared in navigation but has no content yet.

use crate::error::AppError;

/// `GET /cashback` answers 501 until cashback tracking exists.
pub async fn cashback() -> AppError {
    AppError::NotImplemented("Cashback tracking")
}
