//! Dashboard summary.

use axum::{Extension, Json, extract::State};

use crate::{
    error::{AppError, Outcome},
    handlers::{store_for, today},
    middleware::auth::CurrentSession,
    pages::DashboardView,
    state::AppState,
};

/// `GET /dashboard`: welcome line, balance, this month's spending and
/// cashback, outstanding debt and the most recent transactions.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<CurrentSession>,
) -> Result<Json<Outcome<DashboardView>>, AppError> {
    let user = session
        .workspace
        .session()
        .user()
        .ok_or(AppError::Unauthenticated)?;

    let store = store_for(&state, &session);
    let mut pages = session.workspace.pages().lock().await;
    let view = pages
        .dashboard_view(&state.hub, &store, &user, today())
        .await;
    if pages.token_refused() {
        return Err(AppError::Unauthenticated);
    }
    Ok(Json(Outcome::ok(view)))
}
