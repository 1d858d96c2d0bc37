use axum::routing::{get, post};
use axum::Router;

use crate::chat::{history, operator};
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// Build the operator UI router.
pub fn build_router(state: AppState) -> Router {
    // Live registry: every call goes through the dispatcher
    let operator_routes = Router::new()
        .route("/api/clients", get(operator::list_clients))
        .route("/api/clients/{id}/reply", post(operator::reply))
        .route("/api/clients/{id}/read", post(operator::mark_read))
        .route("/api/broadcast", post(operator::broadcast));

    // Persisted history, read-only
    let history_routes = Router::new()
        .route("/api/members", get(history::list_members))
        .route("/api/members/{member}/messages", get(history::member_messages))
        .route("/api/members/{member}/unread", get(history::member_unread))
        .route("/api/members/{member}/sessions", get(history::member_sessions));

    let ws_routes = Router::new().route("/ws", get(ws_handler::ws_upgrade));

    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(operator_routes)
        .merge(history_routes)
        .merge(ws_routes)
        .merge(health)
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
