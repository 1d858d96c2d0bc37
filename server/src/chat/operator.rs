//! Operator actions exposed over HTTP: client list, direct reply, broadcast
//! and mark-as-read. Every mutation goes through the dispatcher.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::chat::presence::ClientSummary;
use crate::dispatch::DispatchError;
use crate::session::Delivery;
use crate::state::AppState;

/// Maximum operator message length in characters.
pub const MAX_CONTENT_LENGTH: usize = 4000;

#[derive(Debug, Deserialize)]
pub struct OperatorTextRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReplyResponse {
    pub delivered: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub recipients: usize,
}

/// Trim operator text and enforce the length bounds.
pub fn validate_text(text: &str) -> Result<&str, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("Message cannot be empty".to_string());
    }
    if trimmed.chars().count() > MAX_CONTENT_LENGTH {
        return Err(format!(
            "Message exceeds maximum length of {} characters",
            MAX_CONTENT_LENGTH
        ));
    }
    Ok(trimmed)
}

fn dispatch_failure(e: DispatchError) -> (StatusCode, String) {
    match e {
        DispatchError::Stopped => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
        DispatchError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// GET /api/clients
pub async fn list_clients(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClientSummary>>, (StatusCode, String)> {
    let list = state.dispatch.client_list().await.map_err(dispatch_failure)?;
    Ok(Json(list))
}

/// POST /api/clients/{id}/reply
/// An offline or unknown target answers `delivered: false`.
pub async fn reply(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
    Json(req): Json<OperatorTextRequest>,
) -> Result<Json<ReplyResponse>, (StatusCode, String)> {
    let text = validate_text(&req.text).map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    let delivery = state
        .dispatch
        .send_reply(&client_id, text)
        .await
        .map_err(dispatch_failure)?;
    Ok(Json(ReplyResponse {
        delivered: delivery == Delivery::Delivered,
    }))
}

/// POST /api/broadcast
pub async fn broadcast(
    State(state): State<AppState>,
    Json(req): Json<OperatorTextRequest>,
) -> Result<Json<BroadcastResponse>, (StatusCode, String)> {
    let text = validate_text(&req.text).map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    let recipients = state
        .dispatch
        .broadcast(text)
        .await
        .map_err(dispatch_failure)?;
    Ok(Json(BroadcastResponse { recipients }))
}

/// POST /api/clients/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let found = state
        .dispatch
        .mark_read(&client_id)
        .await
        .map_err(dispatch_failure)?;
    if found {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Client not found".to_string()))
    }
}
