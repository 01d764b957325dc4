//! Bridges transport connections to the hub.
//!
//! Each accepted connection gets its own task. The task registers with the
//! hub, then shuttles frames both ways until either side goes away.

use bytes::Bytes;
use lumen_core::HubHandle;
use lumen_transport::{Connection, PendingConnection, Transport};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::metrics::{self, SessionMetricsGuard};

/// Back-off after a failed accept, so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept connections forever, spawning one task per connection.
///
/// The handshake runs inside the spawned task, so the loop only waits on
/// the listener itself.
pub async fn serve_connections(transport: impl Transport, hub: HubHandle) {
    info!(transport = transport.name(), "Accepting sessions");

    loop {
        match transport.accept().await {
            Ok(pending) => {
                tokio::spawn(establish_connection(pending, hub.clone()));
            }
            Err(e) => {
                error!(error = %e, "Accept failed");
                metrics::record_error("accept");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

/// Complete the handshake of an accepted connection, then run it.
pub async fn establish_connection(pending: Box<dyn PendingConnection>, hub: HubHandle) {
    let remote = pending.remote_addr().unwrap_or_else(|| "unknown".to_string());

    match pending.establish().await {
        Ok(conn) => handle_connection(conn, hub).await,
        Err(e) => {
            warn!(remote = %remote, error = %e, "Connection setup failed");
            metrics::record_error("handshake");
        }
    }
}

/// Run one connection until it closes.
pub async fn handle_connection(mut conn: Box<dyn Connection>, hub: HubHandle) {
    let remote = conn.remote_addr().unwrap_or_else(|| "unknown".to_string());
    let (outbox_tx, mut outbox) = mpsc::unbounded_channel::<Bytes>();

    let id = match hub.connect(outbox_tx).await {
        Ok(id) => id,
        Err(e) => {
            warn!(remote = %remote, error = %e, "Connection refused");
            metrics::record_error("refused");
            if let Err(e) = conn.close().await {
                debug!(remote = %remote, error = %e, "Close after refusal failed");
            }
            return;
        }
    };

    let _metrics_guard = SessionMetricsGuard::new();
    info!(session = %id, remote = %remote, "Client connected");

    loop {
        tokio::select! {
            biased;

            // Frames queued by the hub for this session
            frame = outbox.recv() => {
                let Some(frame) = frame else {
                    debug!(session = %id, "Outbox detached");
                    break;
                };
                metrics::record_frame(frame.len(), "outbound");
                if let Err(e) = conn.send_text(frame).await {
                    debug!(session = %id, error = %e, "Send failed");
                    break;
                }
            }

            // Frames from the client
            inbound = conn.recv() => {
                match inbound {
                    Ok(Some(data)) => {
                        metrics::record_frame(data.len(), "inbound");
                        if hub.frame(id, data).is_err() {
                            error!(session = %id, "Hub stopped");
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(session = %id, error = %e, "Connection error");
                        metrics::record_error("websocket");
                        break;
                    }
                }
            }
        }
    }

    if hub.disconnect(id).is_err() {
        debug!(session = %id, "Hub stopped before disconnect");
    }
    if let Err(e) = conn.close().await {
        debug!(session = %id, error = %e, "Close failed");
    }

    info!(session = %id, "Client disconnected");
}
