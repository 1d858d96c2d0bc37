use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::chat::events::UiEvent;
use crate::chat::operator::validate_text;
use crate::state::AppState;

/// Commands the operator UI sends over the WebSocket.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum UiCommand {
    SendReply { id: String, text: String },
    SendBroadcast { text: String },
    MarkAsRead { id: String },
}

/// Per-connection answer to a command. Broadcast events carry the actual
/// state change; this only tells the sender how its own command went.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum CommandOutcome {
    CommandResult {
        command: &'static str,
        ok: bool,
        detail: Option<String>,
    },
}

impl UiCommand {
    pub fn name(&self) -> &'static str {
        match self {
            UiCommand::SendReply { .. } => "send-reply",
            UiCommand::SendBroadcast { .. } => "send-broadcast",
            UiCommand::MarkAsRead { .. } => "mark-as-read",
        }
    }
}

/// Serialize an event into a WebSocket text message.
pub fn event_message(event: &UiEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize UI event");
            None
        }
    }
}

/// Handle one text message from the operator UI.
pub async fn handle_text_message(text: &str, tx: &mpsc::UnboundedSender<Message>, state: &AppState) {
    let command: UiCommand = match serde_json::from_str(text) {
        Ok(command) => command,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring malformed UI command");
            send_outcome(tx, "unknown", Err(format!("malformed command: {}", e)));
            return;
        }
    };

    let name = command.name();
    let result = dispatch_command(command, state).await;
    send_outcome(tx, name, result);
}

async fn dispatch_command(command: UiCommand, state: &AppState) -> Result<Option<String>, String> {
    match command {
        UiCommand::SendReply { id, text } => {
            let text = validate_text(&text)?;
            let delivery = state
                .dispatch
                .send_reply(&id, text)
                .await
                .map_err(|e| e.to_string())?;
            Ok(Some(delivery.as_str().to_string()))
        }
        UiCommand::SendBroadcast { text } => {
            let text = validate_text(&text)?;
            let recipients = state
                .dispatch
                .broadcast(text)
                .await
                .map_err(|e| e.to_string())?;
            Ok(Some(format!("{} recipients", recipients)))
        }
        UiCommand::MarkAsRead { id } => {
            let found = state
                .dispatch
                .mark_read(&id)
                .await
                .map_err(|e| e.to_string())?;
            if found {
                Ok(None)
            } else {
                Err(format!("unknown client {}", id))
            }
        }
    }
}

fn send_outcome(
    tx: &mpsc::UnboundedSender<Message>,
    command: &'static str,
    result: Result<Option<String>, String>,
) {
    let outcome = match result {
        Ok(detail) => CommandOutcome::CommandResult {
            command,
            ok: true,
            detail,
        },
        Err(detail) => CommandOutcome::CommandResult {
            command,
            ok: false,
            detail: Some(detail),
        },
    };
    if let Ok(json) = serde_json::to_string(&outcome) {
        let _ = tx.send(Message::Text(json.into()));
    }
}
