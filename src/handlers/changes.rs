//! Inbound change feed.
//!
//! The backend posts one database webhook per row change. A payload is
//! accepted only with a valid `X-Webhook-Signature`, then fanned out to
//! every mounted page watching its table.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use serde::Serialize;

use crate::{
    change_feed::{RawChange, SIGNATURE_HEADER, verify_signature},
    error::{AppError, Outcome},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct ChangeAck {
    pub table: String,

    /// False when the table is not one the application tracks
    pub published: bool,

    /// Live pages the event reached
    pub listeners: usize,
}

/// `POST /hooks/changes`
///
/// # Response
///
/// - **Success (200 OK)**: acknowledged, including untracked tables
/// - **Error (401)**: missing or invalid signature
/// - **Error (400)**: body is not a change payload
pub async fn receive_change(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Outcome<ChangeAck>>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::InvalidSignature)?;

    if !verify_signature(&state.config.change_feed_secret, &body, signature) {
        tracing::warn!("rejected change event with invalid signature");
        return Err(AppError::InvalidSignature);
    }

    let raw: RawChange = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidRequest(format!("Malformed change event: {}", e)))?;
    let kind = raw.kind;
    let table = raw.table.clone();

    let ack = match state.hub.publish(raw) {
        Some((_, listeners)) => {
            tracing::info!(table = %table, kind = ?kind, listeners, "change event published");
            ChangeAck {
                table,
                published: true,
                listeners,
            }
        }
        None => {
            tracing::debug!(table = %table, "ignoring change event for untracked table");
            ChangeAck {
                table,
                published: false,
                listeners: 0,
            }
        }
    };

    Ok(Json(Outcome::ok(ack)))
}
