use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, timeout};

use crate::chat::events::UiEvent;
use crate::state::AppState;
use crate::ws::protocol;

/// Ping interval: server sends WebSocket ping every 30 seconds.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Pong timeout: if pong not received within 10 seconds after ping, close.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the actor-per-connection pattern for one operator UI socket.
///
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Event task: forwards the event bus into that channel
/// - Reader loop: parses operator commands and forwards them to the dispatcher
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Subscribe before taking the snapshot so nothing falls in between
    let events = state.events.subscribe();
    send_snapshot(&state, &tx).await;

    tracing::info!("Operator UI actor started");

    // Spawn writer task: forwards mpsc messages to WebSocket sink
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Spawn event task: forwards the event bus into the same channel
    let event_handle = tokio::spawn(event_task(events, tx.clone(), state.clone()));

    // Track pong reception
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();

    // Spawn ping task: sends periodic pings and monitors pong responses
    let ping_tx = tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(PING_INTERVAL);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            // Send ping
            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died, connection is gone
                break;
            }

            // Wait for pong within timeout
            match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
                Ok(Some(())) => {
                    // Pong received, continue
                }
                _ => {
                    // Pong timeout or channel closed, close connection
                    tracing::warn!("Pong timeout, closing operator UI connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Reader loop: process incoming operator commands
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    // JSON command, answered with a command-result
                    protocol::handle_text_message(text.as_str(), &tx, &state).await;
                }
                Message::Binary(_) => {
                    tracing::debug!("Ignoring binary message from operator UI");
                }
                Message::Pong(_) => {
                    // Pong received, notify the ping task
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    // Respond to UI pings with pong
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(reason = ?frame, "Operator UI initiated close");
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Operator UI receive error");
                break;
            }
            None => {
                // Stream ended, UI disconnected
                tracing::info!("Operator UI stream ended");
                break;
            }
        }
    }

    // Cleanup: abort writer, event and ping tasks
    writer_handle.abort();
    event_handle.abort();
    ping_handle.abort();

    tracing::info!("Operator UI actor stopped");
}

/// Queue a fresh `update-client-list` for this connection only.
async fn send_snapshot(state: &AppState, tx: &mpsc::UnboundedSender<Message>) {
    match state.dispatch.client_list().await {
        Ok(list) => {
            if let Some(msg) = protocol::event_message(&UiEvent::UpdateClientList(list)) {
                let _ = tx.send(msg);
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not build client-list snapshot");
        }
    }
}

/// Forward bus events to the socket. A lagging subscriber skips what it
/// missed and resynchronises from a new snapshot.
async fn event_task(
    mut events: broadcast::Receiver<UiEvent>,
    tx: mpsc::UnboundedSender<Message>,
    state: AppState,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let Some(msg) = protocol::event_message(&event) else {
                    continue;
                };
                if tx.send(msg).is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Operator UI lagged behind event bus");
                send_snapshot(&state, &tx).await;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Writer task: receives messages from mpsc channel and forwards them to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            break;
        }
    }
}
