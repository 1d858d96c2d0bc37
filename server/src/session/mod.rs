//! In-memory client sessions and the components that mutate them.

pub mod clock;
pub mod fixtures;
pub mod liveness;
pub mod registry;

use chrono::{DateTime, Local};
use std::collections::VecDeque;

use crate::chat::messages::{Message, Sender};
use crate::tcp::Connection;

pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::{Delivery, RegistrySettings, SessionRegistry};

/// Messages kept per session for fast UI redraw. The database stays
/// authoritative.
pub const HISTORY_CACHE_LIMIT: usize = 200;

/// Registry key of a member on a PC.
pub fn client_id(member: &str, pc_name: &str) -> String {
    format!("{}_{}", member, pc_name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Online,
    Offline,
    /// Offline because the liveness sweep timed the client out. Only a new
    /// connect frame leaves this state.
    ForcedShutdown,
}

impl SessionStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }

    pub fn is_offline(&self) -> bool {
        !self.is_online()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::ForcedShutdown => "forced_shutdown",
        }
    }
}

/// Bounded, most-recent-last message buffer.
#[derive(Debug, Clone, Default)]
pub struct HistoryCache {
    messages: VecDeque<Message>,
}

impl HistoryCache {
    pub fn push(&mut self, message: Message) {
        if self.messages.len() == HISTORY_CACHE_LIMIT {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.back()
    }

    pub fn mark_client_messages_read(&mut self) {
        for message in self.messages.iter_mut() {
            if message.sender == Sender::Client {
                message.read = true;
            }
        }
    }

    pub fn unread_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.sender == Sender::Client && !m.read)
            .count()
    }
}

/// One member on one PC, as tracked by the registry.
#[derive(Debug, Clone)]
pub struct ClientSession {
    pub id: String,
    pub member: String,
    pub pc_name: String,
    pub status: SessionStatus,
    /// Owned transport while online
    pub connection: Option<Connection>,
    /// Last inbound frame of any type; drives the liveness sweep
    pub last_seen_at: Option<DateTime<Local>>,
    /// Last non-heartbeat inbound frame; drives UI ordering
    pub last_activity_at: Option<DateTime<Local>>,
    /// Open span in the sessions table, if any
    pub persisted_session_id: Option<i64>,
    /// Synthetic session for manual UI testing; never swept
    pub is_virtual: bool,
    pub history: HistoryCache,
}

impl ClientSession {
    /// A freshly connected session.
    pub fn new(member: &str, pc_name: &str, now: DateTime<Local>) -> Self {
        Self {
            id: client_id(member, pc_name),
            member: member.to_string(),
            pc_name: pc_name.to_string(),
            status: SessionStatus::Online,
            connection: None,
            last_seen_at: Some(now),
            last_activity_at: None,
            persisted_session_id: None,
            is_virtual: false,
            history: HistoryCache::default(),
        }
    }
}
