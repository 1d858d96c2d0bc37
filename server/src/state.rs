use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::chat::events::EventBus;
use crate::db::DbPool;
use crate::dispatch::DispatchHandle;
use crate::tcp::ConnectionId;

/// Shared application state handed to socket actors and axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>; read-only queries from the
    /// UI bridge go here directly
    pub db: DbPool,
    /// Every registry mutation goes through the dispatcher
    pub dispatch: DispatchHandle,
    /// UI event bus
    pub events: EventBus,
    connection_ids: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(db: DbPool, dispatch: DispatchHandle, events: EventBus) -> Self {
        Self {
            db,
            dispatch,
            events,
            connection_ids: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Allocate the id of a newly accepted kiosk socket.
    pub fn next_connection_id(&self) -> ConnectionId {
        self.connection_ids.fetch_add(1, Ordering::Relaxed)
    }
}
