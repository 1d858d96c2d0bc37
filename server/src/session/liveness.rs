//! Periodic liveness sweep.
//!
//! The timer only asks the dispatcher for a sweep; the sweep itself runs on
//! the dispatcher, serialized with every other registry mutation.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::dispatch::DispatchHandle;

/// Spawn the liveness timer. It stops when `shutdown` flips to true (or its
/// sender is dropped) or when the dispatcher is gone.
pub fn spawn_liveness_monitor(
    dispatch: DispatchHandle,
    sweep_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the first immediate tick
        ticker.tick().await;

        tracing::debug!(interval_secs = sweep_interval.as_secs(), "Liveness monitor started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if !dispatch.request_sweep() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Liveness monitor stopped");
    })
}
