//! Accounts page.
//!
//! - GET /accounts - Active accounts with total balance and credit limit

use axum::{
    Extension, Json,
    extract::State,
};

use crate::{
    error::{AppError, Outcome},
    handlers::store_for,
    middleware::auth::CurrentSession,
    pages::AccountsView,
    state::AppState,
};

/// Render the accounts table.
///
/// The first visit of a session fetches the accounts and subscribes to
/// their changes; later visits apply the changes received since.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "totals": { "total_balance": 15234500.0, "total_credit_limit": 50000000.0 },
///     "total_balance_display": "15.234.500 ₫",
///     "table": { "state": "ready", "rows": [ ... ] }
///   }
/// }
/// ```
///
/// A failed fetch still answers 200 with an empty table and `error` set,
/// unless the backend refused the session token.
pub async fn accounts_page(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Json<Outcome<AccountsView>>, AppError> {
    let store = store_for(&state, &session);
    let mut pages = session.workspace.pages().lock().await;
    let view = pages.accounts_view(&state.hub, &store).await;
    if pages.token_refused() {
        return Err(AppError::Unauthenticated);
    }
    Ok(Json(Outcome::ok(view)))
}
