//! Serialized dispatch point.
//!
//! Socket actors, the liveness timer and the UI bridge never touch the
//! registry directly. They send `DispatchCommand`s to one loop that owns the
//! `SessionRegistry` and applies them in arrival order.

use tokio::sync::{mpsc, oneshot, watch};

use crate::chat::presence::ClientSummary;
use crate::db::store::{StoreError, StoreResult};
use crate::session::{ClientSession, Delivery, SessionRegistry};
use crate::tcp::protocol::Frame;
use crate::tcp::{Connection, ConnectionId};

type Reply<T> = oneshot::Sender<StoreResult<T>>;

/// Commands applied to the registry by the dispatch loop.
pub enum DispatchCommand {
    /// A decoded frame arrived on a socket.
    Frame { connection: Connection, frame: Frame },
    /// A socket ended (EOF, error, or writer failure).
    TransportClosed { connection_id: ConnectionId },
    SendReply {
        client_id: String,
        text: String,
        reply: Reply<Delivery>,
    },
    Broadcast { text: String, reply: Reply<usize> },
    MarkRead { client_id: String, reply: Reply<bool> },
    ClientList { reply: Reply<Vec<ClientSummary>> },
    /// Liveness sweep tick.
    Sweep,
    /// Insert fake sessions (virtual devices).
    Seed(Vec<ClientSession>),
}

/// Error returned to callers waiting on a dispatched command.
#[derive(Debug)]
pub enum DispatchError {
    Store(StoreError),
    /// The dispatch loop has stopped.
    Stopped,
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Store(e) => write!(f, "{}", e),
            DispatchError::Stopped => write!(f, "dispatcher stopped"),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Cloneable sender side of the dispatch loop. Never blocks.
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    tx: mpsc::UnboundedSender<DispatchCommand>,
}

/// Create a dispatch handle and the receiver the loop consumes.
pub fn channel() -> (DispatchHandle, mpsc::UnboundedReceiver<DispatchCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DispatchHandle { tx }, rx)
}

impl DispatchHandle {
    pub fn frame(&self, connection: Connection, frame: Frame) -> bool {
        self.tx
            .send(DispatchCommand::Frame { connection, frame })
            .is_ok()
    }

    pub fn transport_closed(&self, connection_id: ConnectionId) -> bool {
        self.tx
            .send(DispatchCommand::TransportClosed { connection_id })
            .is_ok()
    }

    pub fn request_sweep(&self) -> bool {
        self.tx.send(DispatchCommand::Sweep).is_ok()
    }

    pub fn seed(&self, sessions: Vec<ClientSession>) -> bool {
        self.tx.send(DispatchCommand::Seed(sessions)).is_ok()
    }

    pub async fn send_reply(&self, client_id: &str, text: &str) -> Result<Delivery, DispatchError> {
        let client_id = client_id.to_string();
        let text = text.to_string();
        self.request(|reply| DispatchCommand::SendReply {
            client_id,
            text,
            reply,
        })
        .await
    }

    pub async fn broadcast(&self, text: &str) -> Result<usize, DispatchError> {
        let text = text.to_string();
        self.request(|reply| DispatchCommand::Broadcast { text, reply })
            .await
    }

    pub async fn mark_read(&self, client_id: &str) -> Result<bool, DispatchError> {
        let client_id = client_id.to_string();
        self.request(|reply| DispatchCommand::MarkRead { client_id, reply })
            .await
    }

    pub async fn client_list(&self) -> Result<Vec<ClientSummary>, DispatchError> {
        self.request(|reply| DispatchCommand::ClientList { reply })
            .await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> DispatchCommand,
    ) -> Result<T, DispatchError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .map_err(|_| DispatchError::Stopped)?;
        rx.await
            .map_err(|_| DispatchError::Stopped)?
            .map_err(DispatchError::Store)
    }
}

/// Run the dispatch loop until `shutdown` flips to true, its sender is
/// dropped, or every handle is gone. On exit, live transports and open
/// session spans are closed; nothing mutates the registry afterwards.
pub async fn run_dispatch_loop(
    mut registry: SessionRegistry,
    mut commands: mpsc::UnboundedReceiver<DispatchCommand>,
    mut shutdown: watch::Receiver<bool>,
) {
    tracing::info!("Dispatcher started");

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            command = commands.recv() => match command {
                Some(command) => handle_command(&mut registry, command),
                None => break,
            },
        }
    }

    if let Err(e) = registry.shutdown() {
        registry.report_failure("shutdown", &e);
    }
    tracing::info!("Dispatcher stopped");
}

fn handle_command(registry: &mut SessionRegistry, command: DispatchCommand) {
    match command {
        DispatchCommand::Frame { connection, frame } => {
            let result = registry.on_frame(&connection, frame);
            report(registry, "inbound-frame", &result);
        }
        DispatchCommand::TransportClosed { connection_id } => {
            let result = registry.on_transport_closed(connection_id);
            report(registry, "transport-closed", &result);
        }
        DispatchCommand::SendReply {
            client_id,
            text,
            reply,
        } => {
            let result = registry.send_reply(&client_id, &text);
            report(registry, "send-reply", &result);
            let _ = reply.send(result);
        }
        DispatchCommand::Broadcast { text, reply } => {
            let result = registry.broadcast(&text);
            report(registry, "send-broadcast", &result);
            let _ = reply.send(result);
        }
        DispatchCommand::MarkRead { client_id, reply } => {
            let result = registry.mark_read(&client_id);
            report(registry, "mark-as-read", &result);
            let _ = reply.send(result);
        }
        DispatchCommand::ClientList { reply } => {
            let _ = reply.send(registry.client_list());
        }
        DispatchCommand::Sweep => {
            let result = registry.sweep();
            report(registry, "liveness-sweep", &result);
        }
        DispatchCommand::Seed(sessions) => registry.seed(sessions),
    }
}

fn report<T>(registry: &SessionRegistry, operation: &str, result: &StoreResult<T>) {
    if let Err(e) = result {
        registry.report_failure(operation, e);
    }
}
