//! Session middleware.
//!
//! Intercepts every protected request to:
//! 1. Extract the access token from the `mf_session` cookie or the
//!    Authorization header
//! 2. Find the session's workspace, or restore it from the auth provider
//! 3. Ask the provider again when the workspace has not been confirmed recently
//! 4. Inject `CurrentSession` into the request
//! 5. Redirect to `/login` when there is no valid session, or when the
//!    backend rejects the token while the request is handled

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::services::auth_service;
use crate::session::{SessionHolder, Workspace};
use crate::state::AppState;

/// Cookie carrying the access token issued at sign-in.
pub const SESSION_COOKIE: &str = "mf_session";

/// Session context attached to authenticated requests.
///
/// Handlers extract it with `Extension<CurrentSession>`.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub access_token: String,
    pub workspace: Arc<Workspace>,
}

/// Access token sent by the caller, cookie first.
///
/// Accepted forms:
/// ```text
/// Cookie: mf_session=<token>
/// Authorization: Bearer <token>
/// ```
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.trim().to_string());

    from_cookie
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(|token| token.trim().to_string())
        })
        .filter(|token| !token.is_empty())
}

/// `Set-Cookie` value storing the session token.
pub fn session_cookie(access_token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE, access_token
    )
}

/// `Set-Cookie` value clearing the session token.
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// Redirect to `/login` that also drops the stale cookie.
fn signed_out_redirect() -> Response {
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Redirect::to("/login"),
    )
        .into_response()
}

/// Workspace for `access_token`, restoring it from the auth provider when
/// this process has not seen the token yet.
///
/// A known workspace not confirmed within `SESSION_REVALIDATE_SECS` is
/// checked with the provider again and evicted when the token is refused.
pub async fn resolve_session(state: &AppState, access_token: &str) -> Option<Arc<Workspace>> {
    if let Some(workspace) = state.sessions.get(access_token).await {
        workspace.touch();
        let max_age = Duration::from_secs(state.config.session_revalidate_secs);
        if !workspace.needs_revalidation(max_age) {
            return Some(workspace);
        }
        if auth_service::get_current_user(&state.client, access_token)
            .await
            .is_some()
        {
            workspace.mark_verified();
            return Some(workspace);
        }
        tracing::info!("auth provider no longer accepts the session, evicting");
        state.sessions.remove(access_token).await;
        return None;
    }

    let holder = SessionHolder::new(state.client.clone());
    let user = holder.restore(access_token).await?;
    tracing::info!(user = %user.id, "session restored");

    let workspace = Workspace::new(holder, state.config.transaction_page_limit);
    Some(
        state
            .sessions
            .insert(access_token.to_string(), workspace)
            .await,
    )
}

/// Session middleware function.
///
/// # Flow
///
/// 1. Read the token from the cookie or `Authorization: Bearer <token>`
/// 2. Resolve the workspace (registry first, then the auth provider)
/// 3. If found: inject `CurrentSession`, call the next handler
/// 4. If not: redirect to `/login`
/// 5. If the handler answers 401 (the backend refused the token), evict
///    the session and redirect to `/login`
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(access_token) = session_token(request.headers()) else {
        return Redirect::to("/login").into_response();
    };

    let Some(workspace) = resolve_session(&state, &access_token).await else {
        return signed_out_redirect();
    };

    request.extensions_mut().insert(CurrentSession {
        access_token: access_token.clone(),
        workspace,
    });

    let response = next.run(request).await;
    if response.status() == StatusCode::UNAUTHORIZED {
        tracing::info!("backend refused the session token, evicting");
        state.sessions.remove(&access_token).await;
        return signed_out_redirect();
    }
    response
}
