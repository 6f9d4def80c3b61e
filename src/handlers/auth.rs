//! Sign-in, sign-up and sign-out.
//!
//! - GET /login, GET /signup - Empty form descriptors
//! - POST /login - Password sign-in, sets the session cookie
//! - POST /signup - Register, then sign in after confirming the email
//! - POST /logout - Revoke the session and clear the cookie

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;

use crate::{
    error::{AppError, Outcome},
    forms::{
        FormController, FormInput, FormView, SubmitError, login::LoginForm, signup::SignupForm,
        submit,
    },
    middleware::auth::{clear_session_cookie, resolve_session, session_cookie, session_token},
    models::user::User,
    session::{SessionHolder, Workspace},
    state::AppState,
};

pub const SIGNUP_CONFIRMATION: &str =
    "Account created! Please check your email to confirm your account.";

#[derive(Debug, Serialize)]
pub struct SignedIn {
    pub user: User,

    /// Same token as the cookie, for clients sending `Authorization: Bearer`
    pub access_token: String,

    pub redirect_to: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SignedUp {
    pub user: User,
    pub message: &'static str,
    pub redirect_to: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SignedOut {
    pub redirect_to: &'static str,
}

/// True when the request already carries a valid session.
async fn is_signed_in(state: &AppState, headers: &HeaderMap) -> bool {
    match session_token(headers) {
        Some(token) => resolve_session(state, &token).await.is_some(),
        None => false,
    }
}

/// `GET /login`: the empty sign-in form, or a redirect when already signed in.
pub async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if is_signed_in(&state, &headers).await {
        return Redirect::to("/dashboard").into_response();
    }
    Json(Outcome::ok(FormView::of(&LoginForm::new()))).into_response()
}

/// `GET /signup`: the empty sign-up form, or a redirect when already signed in.
pub async fn signup_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if is_signed_in(&state, &headers).await {
        return Redirect::to("/dashboard").into_response();
    }
    Json(Outcome::ok(FormView::of(&SignupForm::new()))).into_response()
}

/// Sign in with email and password.
///
/// # Request Body
///
/// ```json
/// { "email": "an@example.com", "password": "secret123" }
/// ```
///
/// # Response
///
/// - **Success (200 OK)**: user and token, `Set-Cookie: mf_session=...`
/// - **Error (422)**: field errors, nothing sent to the provider
/// - **Error (401)**: the provider refused the credentials
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<FormInput>,
) -> Result<Response, AppError> {
    let mut form = LoginForm::new();
    form.fill(input);

    let holder = SessionHolder::new(state.client.clone());
    let signing_in = &holder;
    let active = match submit(&mut form, |credentials| async move {
        signing_in.sign_in(&credentials).await
    })
    .await
    {
        Ok(active) => active,
        Err(SubmitError::Rejected(e)) => return Err(AppError::SignInFailed(e.to_string())),
        Err(e) => return Err(e.into()),
    };

    let workspace = Workspace::new(holder, state.config.transaction_page_limit);
    state
        .sessions
        .insert(active.access_token.clone(), workspace)
        .await;

    let cookie = session_cookie(&active.access_token);
    let body = Outcome::ok(SignedIn {
        user: active.user,
        access_token: active.access_token,
        redirect_to: "/dashboard",
    });
    Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
}

/// Register a new user.
///
/// # Request Body
///
/// ```json
/// {
///   "name": "An Nguyen",
///   "email": "an@example.com",
///   "password": "secret123",
///   "confirm_password": "secret123"
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the new user and a confirmation message
/// - **Error (422)**: field errors
/// - **Error (502)**: the provider refused the registration
pub async fn signup(
    State(state): State<AppState>,
    Json(input): Json<FormInput>,
) -> Result<(StatusCode, Json<Outcome<SignedUp>>), AppError> {
    let mut form = SignupForm::new();
    form.fill(input);

    let holder = SessionHolder::new(state.client.clone());
    let registering = &holder;
    let user = submit(&mut form, |registration| async move {
        registering.sign_up(&registration).await
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(Outcome::ok(SignedUp {
            user,
            message: SIGNUP_CONFIRMATION,
            redirect_to: "/login",
        })),
    ))
}

/// Sign out and unmount the session's pages.
///
/// Always clears the cookie once the provider accepted the sign-out. When
/// the provider fails the session is kept and the error returned.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        if let Some(workspace) = resolve_session(&state, &token).await {
            workspace.session().sign_out().await?;
            state.sessions.remove(&token).await;
        }
    }

    let body = Outcome::ok(SignedOut {
        redirect_to: "/login",
    });
    Ok(([(header::SET_COOKIE, clear_session_cookie())], Json(body)).into_response())
}
