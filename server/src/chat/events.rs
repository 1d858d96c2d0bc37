//! Event bus towards the operator UI.
//!
//! The registry emits `UiEvent`s after the corresponding state is durable;
//! any number of UI bridges subscribe and decide locally what to show
//! (e.g. suppressing popups while the conversation is focused).

use serde::Serialize;
use tokio::sync::broadcast;

use crate::chat::messages::{Message, MessageKind};
use crate::chat::presence::ClientSummary;

/// Default capacity of the event bus; slow subscribers past this lag behind
/// and resynchronise from a fresh client-list snapshot.
pub const EVENT_BUS_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum UiEvent {
    /// Full snapshot of every registry entry
    UpdateClientList(Vec<ClientSummary>),
    MessageReceived {
        client_id: String,
        message: Message,
    },
    ShowNotification {
        client_id: String,
        kind: MessageKind,
        pc_name: String,
        member: String,
        summary: String,
    },
    PlaySound {
        category: MessageKind,
        path: Option<String>,
    },
    /// A registry operation could not be persisted
    OperationFailed {
        operation: String,
        detail: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<UiEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscriber is not an error.
    pub fn emit(&self, event: UiEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(EVENT_BUS_CAPACITY)
    }
}
