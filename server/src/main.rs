use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

use netchat_operator::chat::events::EventBus;
use netchat_operator::config::{generate_config_template, Cli, Config};
use netchat_operator::session::fixtures::virtual_devices;
use netchat_operator::session::liveness::spawn_liveness_monitor;
use netchat_operator::session::{RegistrySettings, SessionRegistry, SystemClock};
use netchat_operator::state::AppState;
use netchat_operator::{db, dispatch, routes, tcp};

/// Virtual devices seeded by --virtual-devices.
const VIRTUAL_ONLINE: usize = 20;
const VIRTUAL_OFFLINE: usize = 10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Handle --generate-config: print template and exit
    if cli.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load(&cli)?;

    // Initialize tracing/logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("netchat_operator=info"));
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
    }

    config.validate()?;

    tracing::info!("NetChat operator v{} starting", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite database
    let db = db::init_db(&config.data_dir)?;

    // Event bus towards the operator UI, dispatcher channel, shutdown signal
    let events = EventBus::default();
    let (dispatch_handle, dispatch_rx) = dispatch::channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // The registry is owned by the dispatch loop from here on

    let clock = Arc::new(SystemClock);
    let registry = SessionRegistry::new(
        db.clone(),
        events.clone(),
        clock,
        RegistrySettings::from_config(&config),
    );

    // Spawn the dispatch loop
    let dispatcher = tokio::spawn(dispatch::run_dispatch_loop(
        registry,
        dispatch_rx,
        shutdown_rx.clone(),
    ));

    if config.virtual_devices {
        let now = chrono::Local::now();
        dispatch_handle.seed(virtual_devices(VIRTUAL_ONLINE, VIRTUAL_OFFLINE, now));
        tracing::info!(
            online = VIRTUAL_ONLINE,
            offline = VIRTUAL_OFFLINE,
            "Seeded virtual devices"
        );
    }

    // Spawn the liveness timer; sweeps run on the dispatcher
    let liveness = spawn_liveness_monitor(
        dispatch_handle.clone(),
        Duration::from_secs(config.heartbeat_interval_seconds),
        shutdown_rx.clone(),
    );

    // Build application state
    let app_state = AppState::new(db, dispatch_handle, events);

    // Kiosk listener
    let tcp_listener = TcpListener::bind(config.tcp_address()).await?;
    let kiosks = tokio::spawn(tcp::listener::serve(
        tcp_listener,
        app_state.clone(),
        shutdown_rx.clone(),
    ));

    // Operator UI bridge
    let app = routes::build_router(app_state);
    let ui_listener = TcpListener::bind(config.ui_address()).await?;
    tracing::info!("Operator UI listening on {}", config.ui_address());

    let mut ui_shutdown = shutdown_rx;
    let ui = tokio::spawn(async move {
        let result = axum::serve(ui_listener, app)
            .with_graceful_shutdown(async move {
                let _ = ui_shutdown.wait_for(|stop| *stop).await;
            })
            .await;
        if let Err(e) = result {
            tracing::error!(error = %e, "Operator UI server failed");
        }
    });

    // Wait for Ctrl-C, then stop everything on the same signal
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    let _ = shutdown_tx.send(true);

    // Dispatcher exit closes every kiosk transport and open session record
    let _ = kiosks.await;
    let _ = liveness.await;
    let _ = dispatcher.await;
    let _ = ui.await;

    tracing::info!("NetChat operator stopped");
    Ok(())
}
