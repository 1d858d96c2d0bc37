pub mod actor;
pub mod listener;
pub mod protocol;

use tokio::sync::mpsc;

/// Process-unique id of one accepted kiosk socket.
pub type ConnectionId = u64;

/// Instruction for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Write one encoded frame
    Frame(String),
    /// Shut the socket down
    Close,
}

/// Handle to a live kiosk socket.
///
/// Sends never block: they queue onto the writer task's channel. A failed
/// send means the writer is gone, which callers treat as a disconnect.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl Connection {
    pub fn new(id: ConnectionId, tx: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { id, tx }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a frame; false if the writer task has stopped.
    pub fn send_frame(&self, frame: String) -> bool {
        self.tx.send(Outbound::Frame(frame)).is_ok()
    }

    pub fn close(&self) {
        let _ = self.tx.send(Outbound::Close);
    }
}
