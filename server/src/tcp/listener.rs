use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::state::AppState;
use crate::tcp::actor;

/// Accept kiosk sockets until `shutdown` flips to true, spawning one actor
/// per connection.
pub async fn serve(listener: TcpListener, state: AppState, mut shutdown: watch::Receiver<bool>) {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Kiosk listener on {}", addr);
    }

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(actor::run_connection(stream, peer, state.clone()));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Accept failed");
                }
            },
        }
    }

    tracing::info!("Kiosk listener stopped");
}
