//! Authoritative map of kiosk sessions.
//!
//! Every mutation takes `&mut self`; the dispatcher owns the registry and is
//! therefore the single serialization point for inbound frames, transport
//! closes, operator commands and the liveness sweep. Each transition is
//! written to the database before the matching UI event is emitted.

use chrono::{DateTime, Duration, Local};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::chat::events::{EventBus, UiEvent};
use crate::chat::messages::{Message, MessageKind};
use crate::chat::presence::{self, ClientSummary};
use crate::config::{Config, SoundConfig};
use crate::db::store::{self, StoreError, StoreResult};
use crate::db::DbPool;
use crate::session::clock::Clock;
use crate::session::{client_id, ClientSession, SessionStatus};
use crate::tcp::protocol::{self, Frame, Payload, BROADCAST_LABEL, REPLY_LABEL};
use crate::tcp::{Connection, ConnectionId};

#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Silence after which an online client is forced offline
    pub client_timeout: Duration,
    pub sounds: SoundConfig,
}

impl RegistrySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_timeout: Duration::seconds(config.client_timeout_seconds as i64),
            sounds: config.sounds.clone(),
        }
    }
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Outcome of a direct operator reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    Delivered,
    /// Target unknown, offline, or its transport failed; nothing persisted
    Dropped,
}

impl Delivery {
    pub fn as_str(&self) -> &'static str {
        match self {
            Delivery::Delivered => "delivered",
            Delivery::Dropped => "dropped",
        }
    }
}

pub struct SessionRegistry {
    sessions: HashMap<String, ClientSession>,
    db: DbPool,
    events: EventBus,
    clock: Arc<dyn Clock>,
    settings: RegistrySettings,
}

impl SessionRegistry {
    pub fn new(
        db: DbPool,
        events: EventBus,
        clock: Arc<dyn Clock>,
        settings: RegistrySettings,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            db,
            events,
            clock,
            settings,
        }
    }

    pub fn get(&self, client_id: &str) -> Option<&ClientSession> {
        self.sessions.get(client_id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &ClientSession> {
        self.sessions.values()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Handle one decoded frame received on `connection`.
    pub fn on_frame(&mut self, connection: &Connection, frame: Frame) -> StoreResult<()> {
        let id = client_id(&frame.member, &frame.pc_name);
        let now = self.clock.now();

        let message = match &frame.payload {
            Payload::CleanLogout => {
                self.on_clean_logout(&id)?;
                return Ok(());
            }
            Payload::Heartbeat => None,
            Payload::Payment {
                sender_name,
                amount,
                method,
            } => Some(Message::payment(sender_name, amount, method, now)),
            Payload::Chat { text } => Some(Message::client_chat(text.as_str(), now)),
        };

        self.bind_connection(&id, &frame, connection, now)?;

        match message {
            None => {
                self.publish_client_list();
                Ok(())
            }
            Some(message) => self.record_client_message(&id, message),
        }
    }

    /// Create or reactivate the session for `id` on `connection`.
    fn bind_connection(
        &mut self,
        id: &str,
        frame: &Frame,
        connection: &Connection,
        now: DateTime<Local>,
    ) -> StoreResult<()> {
        if !self.sessions.contains_key(id) {
            self.purge_stale_offline(&frame.member);
            let record_id =
                store::open_session(&self.db, &frame.member, &frame.pc_name, now.timestamp())?;
            let mut session = ClientSession::new(&frame.member, &frame.pc_name, now);
            session.persisted_session_id = Some(record_id);
            tracing::info!(
                client_id = %id,
                session_record = record_id,
                "Client session opened"
            );
            self.sessions.insert(id.to_string(), session);
        }

        let Some(session) = self.sessions.get_mut(id) else {
            return Ok(());
        };

        if session.persisted_session_id.is_none() {
            let record_id =
                store::open_session(&self.db, &session.member, &session.pc_name, now.timestamp())?;
            session.persisted_session_id = Some(record_id);
        }

        if let Some(previous) = session.connection.replace(connection.clone()) {
            if previous.id() != connection.id() {
                tracing::debug!(client_id = %id, "Replacing previous connection");
                previous.close();
            }
        }
        if session.status.is_offline() {
            tracing::info!(
                client_id = %id,
                previous = session.status.as_str(),
                "Client reconnected"
            );
        }
        session.status = SessionStatus::Online;
        session.last_seen_at = Some(now);
        Ok(())
    }

    /// Drop every offline entry of `member`, on any PC, ahead of a new entry.
    fn purge_stale_offline(&mut self, member: &str) {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| !(s.member == member && s.status.is_offline()));
        let purged = before - self.sessions.len();
        if purged > 0 {
            tracing::debug!(member = %member, purged, "Removed stale offline entries");
        }
    }

    fn record_client_message(&mut self, id: &str, message: Message) -> StoreResult<()> {
        let Some(session) = self.sessions.get_mut(id) else {
            return Ok(());
        };
        store::insert_message(&self.db, &session.member, &message)?;
        session.last_activity_at = Some(message.timestamp);
        session.history.push(message.clone());

        self.events.emit(UiEvent::ShowNotification {
            client_id: id.to_string(),
            kind: message.kind,
            pc_name: session.pc_name.clone(),
            member: session.member.clone(),
            summary: message.summary(),
        });
        self.events.emit(UiEvent::MessageReceived {
            client_id: id.to_string(),
            message,
        });
        self.publish_client_list();
        Ok(())
    }

    /// Explicit client teardown: the entry is removed entirely.
    pub fn on_clean_logout(&mut self, client_id: &str) -> StoreResult<bool> {
        let Some(mut session) = self.sessions.remove(client_id) else {
            tracing::debug!(client_id = %client_id, "Clean logout for unknown client");
            return Ok(false);
        };
        if let Some(connection) = session.connection.take() {
            connection.close();
        }
        let closed = close_record(&self.db, &mut session, self.clock.now());
        tracing::info!(client_id = %client_id, "Client logged out");
        self.publish_client_list();
        closed.map(|_| true)
    }

    /// Abrupt close or error on a transport. The entry stays (offline) so
    /// history and reconnection survive.
    pub fn on_transport_closed(&mut self, connection_id: ConnectionId) -> StoreResult<bool> {
        let now = self.clock.now();
        let mut found = false;
        let mut first_error = None;

        // One socket may have carried frames for several client ids
        for session in self.sessions.values_mut().filter(|s| {
            s.connection
                .as_ref()
                .is_some_and(|c| c.id() == connection_id)
        }) {
            found = true;
            session.connection = None;
            if session.status.is_online() {
                session.status = SessionStatus::Offline;
            }
            tracing::info!(client_id = %session.id, "Client disconnected");
            if let Err(e) = close_record(&self.db, session, now) {
                first_error.get_or_insert(e);
            }
        }

        if !found {
            return Ok(false);
        }
        self.publish_client_list();
        match first_error {
            Some(e) => Err(e),
            None => Ok(true),
        }
    }

    /// Reply to one client. Offline or unknown targets are dropped without
    /// persisting anything.
    pub fn send_reply(&mut self, client_id: &str, text: &str) -> StoreResult<Delivery> {
        let now = self.clock.now();
        let Some(session) = self.sessions.get_mut(client_id) else {
            return Ok(Delivery::Dropped);
        };
        let connection = match &session.connection {
            Some(connection) if session.status.is_online() => connection.clone(),
            _ => return Ok(Delivery::Dropped),
        };

        if !connection.send_frame(protocol::encode_operator(REPLY_LABEL, text)) {
            tracing::warn!(client_id = %client_id, "Reply failed, transport gone");
            self.on_transport_closed(connection.id())?;
            return Ok(Delivery::Dropped);
        }

        let message = Message::operator_chat(text, now);
        store::insert_message(&self.db, &session.member, &message)?;
        session.history.push(message.clone());
        self.events.emit(UiEvent::MessageReceived {
            client_id: client_id.to_string(),
            message,
        });
        self.publish_client_list();
        Ok(Delivery::Delivered)
    }

    /// Fan one operator message out to every online client. Returns how many
    /// clients received (and have persisted) it.
    pub fn broadcast(&mut self, text: &str) -> StoreResult<usize> {
        let now = self.clock.now();
        let frame = protocol::encode_operator(BROADCAST_LABEL, text);
        let mut delivered = 0;
        let mut failed_transports = Vec::new();
        let mut first_error = None;

        for (id, session) in self.sessions.iter_mut() {
            if !session.status.is_online() {
                continue;
            }
            let Some(connection) = &session.connection else {
                continue;
            };
            if !connection.send_frame(frame.clone()) {
                failed_transports.push(connection.id());
                continue;
            }

            let message = Message::operator_chat(text, now);
            match store::insert_message(&self.db, &session.member, &message) {
                Ok(_) => {
                    session.history.push(message.clone());
                    self.events.emit(UiEvent::MessageReceived {
                        client_id: id.clone(),
                        message,
                    });
                    delivered += 1;
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        for connection_id in failed_transports {
            if let Err(e) = self.on_transport_closed(connection_id) {
                first_error.get_or_insert(e);
            }
        }

        tracing::info!(recipients = delivered, "Broadcast sent");
        self.publish_client_list();
        match first_error {
            Some(e) => Err(e),
            None => Ok(delivered),
        }
    }

    /// Mark every client message of the member behind `client_id` as read.
    pub fn mark_read(&mut self, client_id: &str) -> StoreResult<bool> {
        let Some(member) = self.sessions.get(client_id).map(|s| s.member.clone()) else {
            return Ok(false);
        };
        store::mark_messages_read(&self.db, &member)?;
        for session in self.sessions.values_mut().filter(|s| s.member == member) {
            session.history.mark_client_messages_read();
        }
        self.publish_client_list();
        Ok(true)
    }

    /// Liveness sweep: force every silent online client offline, once per
    /// outage. Returns how many clients were forced offline.
    pub fn sweep(&mut self) -> StoreResult<usize> {
        let now = self.clock.now();
        let timeout = self.settings.client_timeout;
        let stale: Vec<String> = self
            .sessions
            .values()
            .filter(|s| !s.is_virtual && s.status.is_online())
            .filter(|s| s.last_seen_at.map_or(true, |seen| now - seen > timeout))
            .map(|s| s.id.clone())
            .collect();

        let mut forced = 0;
        let mut first_error = None;
        for id in stale {
            match self.force_shutdown(&id, now) {
                Ok(()) => forced += 1,
                Err(e) => {
                    tracing::error!(client_id = %id, error = %e, "Forced shutdown not persisted");
                    first_error.get_or_insert(e);
                }
            }
        }

        self.publish_client_list();
        match first_error {
            Some(e) => Err(e),
            None => Ok(forced),
        }
    }

    /// Persist first; a failed write leaves the session online so the next
    /// sweep retries.
    fn force_shutdown(&mut self, id: &str, now: DateTime<Local>) -> StoreResult<()> {
        let Some(session) = self.sessions.get_mut(id) else {
            return Ok(());
        };
        let notice = Message::shutdown_notice(now);
        close_record(&self.db, session, now)?;
        store::insert_message(&self.db, &session.member, &notice)?;

        session.status = SessionStatus::ForcedShutdown;
        session.last_activity_at = Some(now);
        if let Some(connection) = session.connection.take() {
            connection.close();
        }
        session.history.push(notice.clone());
        tracing::warn!(
            client_id = %id,
            last_seen = ?session.last_seen_at,
            "Client missed heartbeats, forced offline"
        );

        self.events.emit(UiEvent::ShowNotification {
            client_id: id.to_string(),
            kind: MessageKind::Shutdown,
            pc_name: session.pc_name.clone(),
            member: session.member.clone(),
            summary: notice.summary(),
        });
        self.events.emit(UiEvent::MessageReceived {
            client_id: id.to_string(),
            message: notice,
        });
        self.events.emit(UiEvent::PlaySound {
            category: MessageKind::Shutdown,
            path: self.settings.sounds.path_for(MessageKind::Shutdown),
        });
        Ok(())
    }

    /// Insert externally built sessions (virtual devices, fixtures).
    /// Existing ids are left untouched.
    pub fn seed(&mut self, sessions: Vec<ClientSession>) {
        for session in sessions {
            self.sessions.entry(session.id.clone()).or_insert(session);
        }
        self.publish_client_list();
    }

    pub fn client_list(&self) -> StoreResult<Vec<ClientSummary>> {
        presence::summarize(self.sessions.values(), |member| {
            store::get_unread_count(&self.db, member)
        })
    }

    fn publish_client_list(&self) {
        match self.client_list() {
            Ok(list) => self.events.emit(UiEvent::UpdateClientList(list)),
            Err(e) => self.report_failure("update-client-list", &e),
        }
    }

    /// Log a failed operation and surface it to the UI.
    pub fn report_failure(&self, operation: &str, error: &StoreError) {
        tracing::error!(operation = %operation, error = %error, "Registry operation failed");
        self.events.emit(UiEvent::OperationFailed {
            operation: operation.to_string(),
            detail: error.to_string(),
        });
    }

    /// Close every live transport and open session span. Called once when
    /// the dispatcher stops.
    pub fn shutdown(&mut self) -> StoreResult<()> {
        let now = self.clock.now();
        let mut first_error = None;
        for session in self.sessions.values_mut() {
            if let Some(connection) = session.connection.take() {
                connection.close();
            }
            if session.status.is_online() {
                session.status = SessionStatus::Offline;
            }
            if let Err(e) = close_record(&self.db, session, now) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Close the session's open span, forgetting it only once the write landed.
fn close_record(db: &DbPool, session: &mut ClientSession, now: DateTime<Local>) -> StoreResult<()> {
    if let Some(record_id) = session.persisted_session_id {
        store::close_session(db, record_id, now.timestamp())?;
        session.persisted_session_id = None;
    }
    Ok(())
}
