//! HTTP router.

use axum::{
    Router, middleware as axum_middleware,
    response::Redirect,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::{handlers, middleware, state::AppState};

/// Build the application router.
///
/// # Routes
///
/// Public:
/// - `GET /health`
/// - `GET /` redirects to `/dashboard`
/// - `GET|POST /login`, `GET|POST /signup`, `POST /logout`
/// - `POST /hooks/changes` (signed change feed)
///
/// Behind the session middleware (redirect to `/login` without a session):
/// - `GET /dashboard`
/// - `GET|POST /transactions`, `DELETE /transactions/{id}`
/// - `GET /accounts`
/// - `GET|POST /debts`, `POST /debts/{ledger_id}/repayments`
/// - `GET /cashback`
///
/// Anything else answers 404.
pub fn router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route("/dashboard", get(handlers::dashboard::dashboard))
        .route(
            "/transactions",
            get(handlers::transactions::list_transactions)
                .post(handlers::transactions::create_transaction),
        )
        .route(
            "/transactions/{id}",
            delete(handlers::transactions::delete_transaction),
        )
        .route("/accounts", get(handlers::accounts::accounts_page))
        .route(
            "/debts",
            get(handlers::debts::list_debts).post(handlers::debts::create_debt),
        )
        .route(
            "/debts/{ledger_id}/repayments",
            post(handlers::debts::create_repayment),
        )
        .route("/cashback", get(handlers::cashback::cashback))
        // Apply session resolution to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::session_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/", get(|| async { Redirect::to("/dashboard") }))
        .route(
            "/login",
            get(handlers::auth::login_page).post(handlers::auth::login),
        )
        .route(
            "/signup",
            get(handlers::auth::signup_page).post(handlers::auth::signup),
        )
        .route("/logout", post(handlers::auth::logout))
        .route("/hooks/changes", post(handlers::changes::receive_change))
        .merge(protected_routes)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
