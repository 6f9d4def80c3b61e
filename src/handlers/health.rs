//! Health check endpoint for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{error::AppError, state::AppState};

/// Health check response.
///
/// Returns service status and backend connectivity.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: String,

    /// Auth provider reachability
    pub backend: String,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Checks
///
/// - Auth provider health endpoint answers with a success status
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "backend": "reachable",
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// # Response (502 Bad Gateway)
///
/// If the backend is unreachable, returns standard error response.
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state.client.health().await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        backend: "reachable".to_string(),
        timestamp: Utc::now(),
    }))
}
