//! Liveness timer and dispatcher, on tokio's paused clock.

mod common;

use chrono::Duration as ChronoDuration;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use common::{frame, kiosk, start_time};
use netchat_operator::chat::events::{EventBus, UiEvent};
use netchat_operator::chat::messages::MessageKind;
use netchat_operator::db;
use netchat_operator::dispatch;
use netchat_operator::session::liveness::spawn_liveness_monitor;
use netchat_operator::session::{ManualClock, RegistrySettings, SessionRegistry};

struct Harness {
    handle: dispatch::DispatchHandle,
    clock: ManualClock,
    bus: EventBus,
    db: db::DbPool,
    shutdown: watch::Sender<bool>,
    dispatcher: tokio::task::JoinHandle<()>,
}

fn harness() -> Harness {
    let db = db::init_memory_db().unwrap();
    let bus = EventBus::default();
    let clock = ManualClock::new(start_time());
    let registry = SessionRegistry::new(
        db.clone(),
        bus.clone(),
        Arc::new(clock.clone()),
        RegistrySettings::default(),
    );
    let (handle, rx) = dispatch::channel();
    let (shutdown, shutdown_rx) = watch::channel(false);
    let dispatcher = tokio::spawn(dispatch::run_dispatch_loop(registry, rx, shutdown_rx));
    Harness {
        handle,
        clock,
        bus,
        db,
        shutdown,
        dispatcher,
    }
}

#[tokio::test(start_paused = true)]
async fn monitor_tick_forces_silent_client_offline() {
    let h = harness();
    let mut events = h.bus.subscribe();
    let (conn, _out) = kiosk(1);
    h.handle.frame(conn, frame("PC-01|bob|__HEARTBEAT__"));
    // Round-trip so the frame is applied before the clock moves
    h.handle.client_list().await.unwrap();

    h.clock.advance(ChronoDuration::seconds(26));
    let monitor = spawn_liveness_monitor(
        h.handle.clone(),
        Duration::from_secs(20),
        h.shutdown.subscribe(),
    );

    let forced = tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            match events.recv().await {
                Ok(UiEvent::ShowNotification { kind, client_id, .. }) => {
                    break (kind, client_id);
                }
                Ok(_) => continue,
                Err(e) => panic!("event bus closed: {}", e),
            }
        }
    })
    .await
    .expect("sweep within one interval");
    assert_eq!(forced, (MessageKind::Shutdown, "bob_PC-01".to_string()));

    let list = h.handle.client_list().await.unwrap();
    assert_eq!(list[0].status, "offline");
    assert!(list[0].forced_shutdown);

    h.shutdown.send(true).unwrap();
    monitor.await.unwrap();
    h.dispatcher.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn monitor_does_not_sweep_before_first_interval() {
    let h = harness();
    let (conn, _out) = kiosk(1);
    h.handle.frame(conn, frame("PC-01|bob|__HEARTBEAT__"));
    h.handle.client_list().await.unwrap();
    h.clock.advance(ChronoDuration::seconds(26));

    let monitor = spawn_liveness_monitor(
        h.handle.clone(),
        Duration::from_secs(20),
        h.shutdown.subscribe(),
    );
    tokio::time::sleep(Duration::from_secs(19)).await;

    let list = h.handle.client_list().await.unwrap();
    assert_eq!(list[0].status, "online");

    h.shutdown.send(true).unwrap();
    monitor.await.unwrap();
}

#[tokio::test]
async fn dispatcher_surfaces_persistence_failures() {
    let h = harness();
    let mut events = h.bus.subscribe();
    h.db.lock()
        .unwrap()
        .execute("DROP TABLE messages", [])
        .unwrap();

    let (conn, _out) = kiosk(1);
    h.handle.frame(conn, frame("PC-01|bob|hello"));

    let failure = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(UiEvent::OperationFailed { operation, .. }) = events.recv().await {
                break operation;
            }
        }
    })
    .await
    .expect("operation-failed event");
    assert_eq!(failure, "inbound-frame");

    let err = h.handle.broadcast("hi").await;
    assert!(err.is_err());
}

#[tokio::test]
async fn stopped_dispatcher_rejects_requests() {
    let h = harness();
    let (conn, mut out) = kiosk(1);
    h.handle.frame(conn, frame("PC-01|bob|__HEARTBEAT__"));
    assert_eq!(h.handle.client_list().await.unwrap().len(), 1);

    h.shutdown.send(true).unwrap();
    h.dispatcher.await.unwrap();

    // Shutdown closed the kiosk transport
    assert_eq!(out.recv().await, Some(netchat_operator::tcp::Outbound::Close));
    assert!(matches!(
        h.handle.client_list().await,
        Err(dispatch::DispatchError::Stopped)
    ));
    assert!(!h.handle.request_sweep());
}
