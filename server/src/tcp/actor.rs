use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::state::AppState;
use crate::tcp::protocol;
use crate::tcp::{Connection, Outbound};

/// Bytes read from a kiosk socket at once. Each read is decoded as one
/// frame, so this is also the largest frame accepted intact: a longer write
/// arrives split across reads and its header-less tail is dropped as
/// malformed.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Run the actor-per-connection pattern for one kiosk socket.
///
/// - Writer task: owns the write half, drains an mpsc channel of `Outbound`
/// - Reader loop: decodes each read as one frame and forwards it to the dispatcher
///
/// The actor ends when the peer closes, a read fails, or the writer stops
/// (write error or operator-initiated close). It always reports
/// `TransportClosed` so the session never stays online on a dead socket.
pub async fn run_connection(stream: TcpStream, peer: SocketAddr, state: AppState) {
    let connection_id = state.next_connection_id();
    let (mut reader, writer) = stream.into_split();
    let (tx, rx) = mpsc::unbounded_channel::<Outbound>();
    let connection = Connection::new(connection_id, tx);

    tracing::info!(peer = %peer, connection_id, "Kiosk connected");

    let mut writer_handle = tokio::spawn(writer_task(writer, rx));
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    tracing::info!(peer = %peer, connection_id, "Kiosk closed connection");
                    break;
                }
                Ok(n) => handle_chunk(&buf[..n], &connection, &state),
                Err(e) => {
                    tracing::warn!(peer = %peer, connection_id, error = %e, "Kiosk read error");
                    break;
                }
            },
            _ = &mut writer_handle => {
                tracing::debug!(peer = %peer, connection_id, "Writer stopped, closing connection");
                break;
            }
        }
    }

    writer_handle.abort();
    state.dispatch.transport_closed(connection_id);

    tracing::info!(peer = %peer, connection_id, "Kiosk actor stopped");
}

/// Decode one read as one frame and hand it to the dispatcher.
/// A malformed frame is dropped here; the connection stays open.
fn handle_chunk(data: &[u8], connection: &Connection, state: &AppState) {
    let text = String::from_utf8_lossy(data);
    match protocol::decode(&text) {
        Ok(frame) => {
            state.dispatch.frame(connection.clone(), frame);
        }
        Err(e) => {
            tracing::debug!(
                connection_id = connection.id(),
                error = %e,
                "Dropping malformed frame: {}",
                text.chars().take(100).collect::<String>()
            );
        }
    }
}

/// Writer task: receives outbound frames and writes them to the socket.
async fn writer_task(mut writer: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Frame(frame) => {
                if let Err(e) = writer.write_all(frame.as_bytes()).await {
                    tracing::warn!(error = %e, "Kiosk write failed");
                    break;
                }
            }
            Outbound::Close => {
                let _ = writer.shutdown().await;
                break;
            }
        }
    }
}
