//! Read-only history queries for the operator UI. These go straight to the
//! store on a blocking thread; they never touch the registry.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::chat::messages::Message;
use crate::db::models::SessionRecord;
use crate::db::store::{self, StoreError};
use crate::state::AppState;

/// Default and maximum number of messages returned per history request.
const DEFAULT_HISTORY_LIMIT: u32 = 1000;
const MAX_HISTORY_LIMIT: u32 = 5000;

/// Member ids generated for unidentified kiosk users.
const GUEST_PREFIXES: [&str; 2] = ["GUEST", "G_"];

#[derive(Debug, Deserialize)]
pub struct MembersQuery {
    #[serde(default)]
    pub include_guests: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadResponse {
    pub unread: i64,
}

pub fn is_guest(member: &str) -> bool {
    GUEST_PREFIXES.iter().any(|prefix| member.starts_with(prefix))
}

fn store_failure(e: StoreError) -> (StatusCode, String) {
    tracing::error!(error = %e, "History query failed");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn join_failure(e: tokio::task::JoinError) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, format!("Task join error: {}", e))
}

/// GET /api/members
pub async fn list_members(
    State(state): State<AppState>,
    Query(query): Query<MembersQuery>,
) -> Result<Json<Vec<String>>, (StatusCode, String)> {
    let db = state.db.clone();
    let members = tokio::task::spawn_blocking(move || store::get_all_members(&db))
        .await
        .map_err(join_failure)?
        .map_err(store_failure)?;

    let members = members
        .into_iter()
        .filter(|m| query.include_guests || !is_guest(m))
        .collect();
    Ok(Json(members))
}

/// GET /api/members/{member}/messages
/// Most recent first, as stored.
pub async fn member_messages(
    State(state): State<AppState>,
    Path(member): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<Message>>, (StatusCode, String)> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    let db = state.db.clone();
    let rows = tokio::task::spawn_blocking(move || store::get_messages_by_member(&db, &member, limit))
        .await
        .map_err(join_failure)?
        .map_err(store_failure)?;

    Ok(Json(rows.iter().map(Message::from_row).collect()))
}

/// GET /api/members/{member}/unread
pub async fn member_unread(
    State(state): State<AppState>,
    Path(member): Path<String>,
) -> Result<Json<UnreadResponse>, (StatusCode, String)> {
    let db = state.db.clone();
    let unread = tokio::task::spawn_blocking(move || store::get_unread_count(&db, &member))
        .await
        .map_err(join_failure)?
        .map_err(store_failure)?;
    Ok(Json(UnreadResponse { unread }))
}

/// GET /api/members/{member}/sessions
pub async fn member_sessions(
    State(state): State<AppState>,
    Path(member): Path<String>,
) -> Result<Json<Vec<SessionRecord>>, (StatusCode, String)> {
    let db = state.db.clone();
    let records = tokio::task::spawn_blocking(move || store::sessions_for_member(&db, &member))
        .await
        .map_err(join_failure)?
        .map_err(store_failure)?;
    Ok(Json(records))
}
