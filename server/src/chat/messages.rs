//! Chat message model shared by the registry, the history store and the UI
//! bridge.

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::StoredMessage;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Client,
    Operator,
    System,
}

impl Sender {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "client" => Some(Self::Client),
            "operator" => Some(Self::Operator),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Operator => "operator",
            Self::System => "system",
        }
    }
}

/// Message category. Doubles as the notification and sound category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Chat,
    Payment,
    Shutdown,
}

impl MessageKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chat" => Some(Self::Chat),
            "payment" => Some(Self::Payment),
            "shutdown" => Some(Self::Shutdown),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Payment => "payment",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Longest notification summary before it is cut with an ellipsis.
const SUMMARY_MAX_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender: Sender,
    pub kind: MessageKind,
    /// Free text, or the pre-rendered summary for payments
    pub content: String,
    pub timestamp: DateTime<Local>,
    /// Operator read state; only meaningful for client messages
    pub read: bool,
}

impl Message {
    pub fn client_chat(text: impl Into<String>, at: DateTime<Local>) -> Self {
        Self {
            sender: Sender::Client,
            kind: MessageKind::Chat,
            content: text.into(),
            timestamp: at,
            read: false,
        }
    }

    pub fn payment(sender_name: &str, amount: &str, method: &str, at: DateTime<Local>) -> Self {
        Self {
            sender: Sender::Client,
            kind: MessageKind::Payment,
            content: render_payment(sender_name, amount, method),
            timestamp: at,
            read: false,
        }
    }

    pub fn operator_chat(text: impl Into<String>, at: DateTime<Local>) -> Self {
        Self {
            sender: Sender::Operator,
            kind: MessageKind::Chat,
            content: text.into(),
            timestamp: at,
            read: true,
        }
    }

    /// System record written when the liveness sweep forces a client offline.
    pub fn shutdown_notice(at: DateTime<Local>) -> Self {
        Self {
            sender: Sender::System,
            kind: MessageKind::Shutdown,
            content: format!("Klien Shutdown Paksa di Jam {}", at.format("%H:%M")),
            timestamp: at,
            read: true,
        }
    }

    /// Rebuild a message from its history row. Unknown sender or kind
    /// values (legacy rows) fall back to client chat.
    pub fn from_row(row: &StoredMessage) -> Self {
        let timestamp = Local
            .timestamp_opt(row.timestamp, 0)
            .single()
            .unwrap_or_else(|| DateTime::<Utc>::default().with_timezone(&Local));
        Self {
            sender: Sender::parse(&row.sender).unwrap_or(Sender::Client),
            kind: MessageKind::parse(&row.kind).unwrap_or(MessageKind::Chat),
            content: row.content.clone(),
            timestamp,
            read: row.read,
        }
    }

    /// Short plain-text line for a notification popup.
    pub fn summary(&self) -> String {
        let text = match self.kind {
            MessageKind::Payment => self
                .content
                .replace("<br>", " | ")
                .replace("<strong>", "")
                .replace("</strong>", ""),
            MessageKind::Chat | MessageKind::Shutdown => self.content.clone(),
        };
        if text.chars().count() <= SUMMARY_MAX_CHARS {
            return text;
        }
        let mut cut: String = text.chars().take(SUMMARY_MAX_CHARS).collect();
        cut.push('…');
        cut
    }
}

/// Human-readable payment confirmation as shown in the operator chat.
pub fn render_payment(sender_name: &str, amount: &str, method: &str) -> String {
    format!(
        "<strong>Konfirmasi Pembayaran</strong><br>Nama: {}<br>Jumlah: Rp {}<br>ID: {}",
        sender_name, amount, method
    )
}
