use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
};

use crate::state::AppState;
use crate::ws::actor;

/// GET /ws
/// The UI bridge binds to a local address only, so no handshake auth.
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    tracing::info!("Operator UI connecting");
    ws.on_upgrade(move |socket| actor::run_connection(socket, state))
}
