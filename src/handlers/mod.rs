//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives request data (JSON body, path params, session context)
//! 2. Runs the page or form logic against the session's workspace
//! 3. Returns the uniform JSON result or an `AppError`

/// Accounts page
pub mod accounts;
/// Sign-in, sign-up and sign-out
pub mod auth;
/// Cashback page (declared, not built)
pub mod cashback;
/// Inbound change feed
pub mod changes;
/// Dashboard summary
pub mod dashboard;
/// Debts page, add-debt and repayments
pub mod debts;
/// Service health
pub mod health;
/// Transactions page, add and delete
pub mod transactions;

use axum::http::Uri;
use chrono::{Local, NaiveDate};

use crate::backend::Store;
use crate::error::AppError;
use crate::middleware::auth::CurrentSession;
use crate::state::AppState;

/// Fallback for unknown paths.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Page {}", uri.path()))
}

/// Calendar date forms default to and aggregates compare against.
pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) fn store_for(state: &AppState, session: &CurrentSession) -> Store {
    state.client.store(session.access_token.clone())
}
