//! Connection forwarder
//!
//! One [`Forwarder`] per port mapping accepts clients, dials the mapping's
//! destination, and relays bytes both ways. Every session reports a
//! [`ConnectionEvent::Begin`] and exactly one matching
//! [`ConnectionEvent::End`] on the shared event channel.

mod listener;
mod relay;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

pub use listener::Forwarder;
pub use relay::{relay, RelayStats};

/// Capacity of the channel shared by all forwarders
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Identifier of one relay session, unique for the life of the program
pub type SessionId = u64;

fn next_session_id() -> SessionId {
    NEXT_SESSION.fetch_add(1, Ordering::Relaxed)
}

/// Lifecycle notification for one relay session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A client was accepted; sent before the destination is dialed
    Begin {
        session: SessionId,
        peer: SocketAddr,
        listen: SocketAddr,
    },

    /// Both directions of the session are finished
    End {
        session: SessionId,
        /// Bytes relayed client -> destination
        sent: u64,
        /// Bytes relayed destination -> client
        received: u64,
    },
}

impl ConnectionEvent {
    /// Session this event belongs to
    pub fn session(&self) -> SessionId {
        match self {
            ConnectionEvent::Begin { session, .. } | ConnectionEvent::End { session, .. } => *session,
        }
    }

    /// Whether this is the opening event of a session
    pub fn is_begin(&self) -> bool {
        matches!(self, ConnectionEvent::Begin { .. })
    }
}
