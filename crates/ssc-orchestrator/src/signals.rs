//! Termination signals aimed at the supervisor itself

use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};

use ssc_core::ChildSignal;

/// SIGINT and SIGTERM listeners
///
/// Registering replaces the default disposition, so the supervisor is no
/// longer killed outright and can relay the signal to its child first.
pub struct TerminationSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl TerminationSignals {
    pub fn register() -> io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next signal, mapped to the one to forward
    pub async fn recv(&mut self) -> ChildSignal {
        tokio::select! {
            Some(()) = self.interrupt.recv() => ChildSignal::Interrupt,
            Some(()) = self.terminate.recv() => ChildSignal::Terminate,
            else => std::future::pending().await,
        }
    }
}
