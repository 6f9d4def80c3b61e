//! Error types and HTTP error response handling.
//!
//! This module defines:
//! - `StoreError`: failures of calls to the managed backend (tables, RPC, auth)
//! - `Outcome`: the uniform `{success, data | error}` result every JSON route returns
//! - `AppError`: HTTP-facing errors and how they become responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;

use crate::forms::FieldErrors;

/// Failure of an external data-access or auth call.
///
/// The `Display` output is the human-readable message carried by the
/// uniform result, so backend messages are passed through untouched.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The request never produced a response (DNS, connect, timeout, TLS).
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The backend answered with a body we could not decode.
    #[error("Unexpected response from backend: {0}")]
    Decode(#[from] serde_json::Error),

    /// A single-row read matched nothing.
    #[error("{0} not found")]
    NotFound(String),
}

impl StoreError {
    /// HTTP status reported by the backend, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Api { status, .. } => Some(*status),
            StoreError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Uniform discriminated result returned by every data-access route.
///
/// ```json
/// { "success": true, "data": { ... } }
/// { "success": false, "error": "duplicate key value violates unique constraint" }
/// ```
#[derive(Debug, Serialize)]
pub struct Outcome<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Outcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

impl<T> From<Result<T, StoreError>> for Outcome<T> {
    fn from(result: Result<T, StoreError>) -> Self {
        match result {
            Ok(data) => Outcome::ok(data),
            Err(e) => Outcome::failed(e.to_string()),
        }
    }
}

/// Application-wide HTTP error type.
///
/// # Error Categories
///
/// - **Field validation**: a form rejected its input locally, nothing was sent
/// - **Backend**: the managed backend rejected or failed a call
/// - **Session**: sign-in failed or the change feed signature is wrong
/// - **Routing**: unknown resources and declared-but-unbuilt pages
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A call to the managed backend failed.
    ///
    /// Returns HTTP 502 Bad Gateway with the backend's message, 404 for a
    /// missing row and 401 when the backend refused the session token.
    #[error("{0}")]
    Backend(#[from] StoreError),

    /// Form input failed local validation.
    ///
    /// Returns HTTP 422 Unprocessable Entity with one message per field.
    #[error("Validation failed")]
    Validation(FieldErrors),

    /// The same form is already being submitted for this session.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("A submission for this form is already in progress")]
    SubmissionInFlight,

    /// The request needs a signed-in session and has none.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Not signed in")]
    Unauthenticated,

    /// The auth provider refused the credentials.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("{0}")]
    SignInFailed(String),

    /// Inbound change event carried a missing or wrong signature.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Invalid change feed signature")]
    InvalidSignature,

    /// Requested resource does not exist.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0} not found")]
    NotFound(String),

    /// Route exists but has no implementation yet.
    ///
    /// Returns HTTP 501 Not Implemented.
    #[error("{0} is not available yet")]
    NotImplemented(&'static str),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    InvalidRequest(String),
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// All errors return the uniform result shape plus a machine-readable code:
/// ```json
/// {
///   "success": false,
///   "code": "validation_failed",
///   "error": "Validation failed",
///   "fields": { "amount": "Amount must be > 0" }
/// }
/// ```
///
/// `fields` is only present for validation failures.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Backend(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Backend(e) if e.status() == Some(401) => {
                (StatusCode::UNAUTHORIZED, "session_expired")
            }
            AppError::Backend(_) => (StatusCode::BAD_GATEWAY, "backend_error"),
            AppError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed"),
            AppError::SubmissionInFlight => (StatusCode::CONFLICT, "submission_in_flight"),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            AppError::SignInFailed(_) => (StatusCode::UNAUTHORIZED, "sign_in_failed"),
            AppError::InvalidSignature => (StatusCode::UNAUTHORIZED, "invalid_signature"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::NotImplemented(_) => (StatusCode::NOT_IMPLEMENTED, "not_implemented"),
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        };

        if status.is_server_error() {
            tracing::warn!(code, error = %self, "request failed");
        }

        let mut body = json!({
            "success": false,
            "code": code,
            "error": self.to_string(),
        });
        if let AppError::Validation(fields) = &self {
            body["fields"] = json!(fields);
        }

        (status, Json(body)).into_response()
    }
}
