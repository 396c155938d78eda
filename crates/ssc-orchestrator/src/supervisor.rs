//! Startup wiring
//!
//! Binds every listener, starts the child, and hands both to a
//! [`Coordinator`]. Any failure here happens before the child is started
//! (bind) or leaves nothing running (spawn), so startup is all or nothing.

use std::future::Future;
use std::net::SocketAddr;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use ssc_core::config::SupervisorConfig;
use ssc_core::{ChildSignal, SscError};
use ssc_process::ProcessController;

use crate::coordinator::{Coordinator, Shutdown};
use crate::forwarder::{Forwarder, EVENT_CHANNEL_CAPACITY};

/// A running child with its forwarders
pub struct Supervisor {
    coordinator: Coordinator<ProcessController>,
    listen_addrs: Vec<SocketAddr>,
    pgid: Option<i32>,
    cancel: CancellationToken,
    forwarders: Vec<JoinHandle<()>>,
}

impl Supervisor {
    /// Bind all mappings, then start the child
    pub async fn launch(config: &SupervisorConfig) -> Result<Self, SscError> {
        config.validate()?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let mut bound = Vec::with_capacity(config.mappings.len());
        for mapping in &config.mappings {
            let forwarder = Forwarder::bind(*mapping, event_tx.clone(), cancel.clone()).await?;
            bound.push(forwarder);
        }
        // Forwarders hold the only senders from here on
        drop(event_tx);

        let listen_addrs = bound
            .iter()
            .map(|f| f.local_addr().unwrap_or(f.mapping().listen))
            .collect();

        let mut process = ProcessController::new(config.command.clone(), config.interactive);
        let exit_rx = process.start()?;
        let pgid = process.pgid();

        let forwarders = bound.into_iter().map(Forwarder::spawn).collect();

        let coordinator = Coordinator::new(
            config.freeze_delay,
            config.nap_duration,
            process,
            event_rx,
            exit_rx,
        );

        Ok(Self {
            coordinator,
            listen_addrs,
            pgid,
            cancel,
            forwarders,
        })
    }

    /// Addresses actually bound, in mapping order
    pub fn listen_addrs(&self) -> &[SocketAddr] {
        &self.listen_addrs
    }

    /// Process group of the child
    pub fn pgid(&self) -> Option<i32> {
        self.pgid
    }

    /// Supervise until the child exits or `shutdown` yields a signal
    pub async fn run_until<F>(self, shutdown: F) -> Shutdown
    where
        F: Future<Output = ChildSignal>,
    {
        let outcome = self.coordinator.run(shutdown).await;

        self.cancel.cancel();
        for handle in self.forwarders {
            let _ = handle.await;
        }
        outcome
    }
}
