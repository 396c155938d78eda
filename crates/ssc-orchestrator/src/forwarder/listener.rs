//! TCP listener for one port mapping
//!
//! Accepts clients and spawns a relay session for each.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ssc_core::error::ForwardError;
use ssc_core::PortMapping;

use super::relay::{relay, RelayStats};
use super::{next_session_id, ConnectionEvent};

/// Pause after a failed accept so a persistent error (EMFILE) does not spin
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Accepts connections on one mapping's listen address
pub struct Forwarder {
    /// Listen and destination addresses
    mapping: PortMapping,
    /// Bound socket
    listener: TcpListener,
    /// Shared channel to the coordinator
    event_tx: mpsc::Sender<ConnectionEvent>,
    /// Stops the accept loop
    cancel: CancellationToken,
}

impl Forwarder {
    /// Bind the mapping's listen address
    pub async fn bind(
        mapping: PortMapping,
        event_tx: mpsc::Sender<ConnectionEvent>,
        cancel: CancellationToken,
    ) -> Result<Self, ForwardError> {
        let listener = TcpListener::bind(mapping.listen)
            .await
            .map_err(|source| ForwardError::Bind {
                address: mapping.listen,
                source,
            })?;

        Ok(Self {
            mapping,
            listener,
            event_tx,
            cancel,
        })
    }

    /// Address actually bound (differs from the mapping for port 0)
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn mapping(&self) -> &PortMapping {
        &self.mapping
    }

    /// Run the accept loop in a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Accept until cancelled
    ///
    /// Sessions already running are not cancelled; they finish when a peer
    /// closes.
    pub async fn run(self) {
        let local = self.local_addr().unwrap_or(self.mapping.listen);
        tracing::info!(
            "Forwarding {} -> {}",
            local,
            self.mapping.destination
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Listener on {} shutting down", local);
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((socket, peer)) => {
                            tokio::spawn(serve_session(
                                socket,
                                peer,
                                local,
                                self.mapping.destination,
                                self.event_tx.clone(),
                            ));
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection on {}: {}", local, e);
                            tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                        }
                    }
                }
            }
        }
    }
}

/// Dial the destination and relay one client, bracketed by Begin/End events
async fn serve_session(
    socket: TcpStream,
    peer: SocketAddr,
    listen: SocketAddr,
    destination: SocketAddr,
    event_tx: mpsc::Sender<ConnectionEvent>,
) {
    let session = next_session_id();
    tracing::info!(session, %peer, "Connection accepted on {}", listen);

    // The coordinator only goes away at shutdown, so send failures are ignored
    let _ = event_tx
        .send(ConnectionEvent::Begin {
            session,
            peer,
            listen,
        })
        .await;

    let stats = match TcpStream::connect(destination).await {
        Ok(upstream) => relay(socket, upstream).await,
        Err(e) => {
            tracing::warn!(session, "Failed to connect to {}: {}", destination, e);
            drop(socket);
            RelayStats::default()
        }
    };

    tracing::info!(
        session,
        %peer,
        sent = stats.sent,
        received = stats.received,
        "Connection closed"
    );

    let _ = event_tx
        .send(ConnectionEvent::End {
            session,
            sent: stats.sent,
            received: stats.received,
        })
        .await;
}
