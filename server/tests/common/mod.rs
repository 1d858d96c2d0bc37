//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Local, TimeZone};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch};

use netchat_operator::chat::events::{EventBus, UiEvent};
use netchat_operator::db::{self, DbPool};
use netchat_operator::dispatch::{self, DispatchHandle};
use netchat_operator::session::{
    Clock, ManualClock, RegistrySettings, SessionRegistry, SystemClock,
};
use netchat_operator::state::AppState;
use netchat_operator::tcp::protocol::{self, Frame};
use netchat_operator::tcp::{Connection, ConnectionId, Outbound};

/// 2025-07-19 14:30:00 local time.
pub fn start_time() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2025, 7, 19, 14, 30, 0)
        .single()
        .expect("unambiguous local time")
}

pub struct RegistryFixture {
    pub registry: SessionRegistry,
    pub clock: ManualClock,
    pub db: DbPool,
    pub events: broadcast::Receiver<UiEvent>,
}

/// Registry over an in-memory database, a manual clock and the default
/// 25 second timeout.
pub fn registry_fixture() -> RegistryFixture {
    let db = db::init_memory_db().expect("Failed to init DB");
    let bus = EventBus::default();
    let events = bus.subscribe();
    let clock = ManualClock::new(start_time());
    let registry = SessionRegistry::new(
        db.clone(),
        bus,
        Arc::new(clock.clone()),
        RegistrySettings::default(),
    );
    RegistryFixture {
        registry,
        clock,
        db,
        events,
    }
}

/// A fake kiosk transport: the connection handle plus what its writer
/// task would have received.
pub fn kiosk(id: ConnectionId) -> (Connection, mpsc::UnboundedReceiver<Outbound>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Connection::new(id, tx), rx)
}

pub fn frame(raw: &str) -> Frame {
    protocol::decode(raw).expect("valid frame")
}

/// Everything currently queued on the event receiver.
pub fn drain_events(rx: &mut broadcast::Receiver<UiEvent>) -> Vec<UiEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn drain_outbound(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<Outbound> {
    let mut out = Vec::new();
    while let Ok(o) = rx.try_recv() {
        out.push(o);
    }
    out
}

/// A full operator stack on random local ports: kiosk TCP listener, UI
/// bridge and dispatcher over an on-disk database in a temp dir.
pub struct TestServer {
    pub kiosk_addr: std::net::SocketAddr,
    pub ui_addr: std::net::SocketAddr,
    pub state: AppState,
    pub shutdown: watch::Sender<bool>,
    _data_dir: tempfile::TempDir,
}

impl TestServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.ui_addr)
    }

    pub fn dispatch(&self) -> &DispatchHandle {
        &self.state.dispatch
    }
}

pub async fn start_test_server() -> TestServer {
    start_test_server_with_clock(Arc::new(SystemClock)).await
}

pub async fn start_test_server_with_clock(clock: Arc<dyn Clock>) -> TestServer {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = db::init_db(&data_dir).expect("Failed to init DB");
    let events = EventBus::default();
    let (dispatch_handle, dispatch_rx) = dispatch::channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let registry = SessionRegistry::new(
        db.clone(),
        events.clone(),
        clock,
        RegistrySettings::default(),
    );
    tokio::spawn(dispatch::run_dispatch_loop(
        registry,
        dispatch_rx,
        shutdown_rx.clone(),
    ));

    let state = AppState::new(db, dispatch_handle, events);

    let kiosk_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let kiosk_addr = kiosk_listener.local_addr().unwrap();
    tokio::spawn(netchat_operator::tcp::listener::serve(
        kiosk_listener,
        state.clone(),
        shutdown_rx,
    ));

    let app = netchat_operator::routes::build_router(state.clone());
    let ui_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let ui_addr = ui_listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(ui_listener, app).await.unwrap();
    });

    TestServer {
        kiosk_addr,
        ui_addr,
        state,
        shutdown: shutdown_tx,
        _data_dir: tmp_dir,
    }
}

/// Poll `check` until it returns true or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
