//! Activity coordinator
//!
//! The single task that decides whether the child runs. It owns the
//! [`ActivityState`] and the debounce timer, and waits on exactly one
//! multiplexed point for:
//!
//! - connection begin/end events from every forwarder,
//! - the debounce timer,
//! - the child's exit notification,
//! - an external termination signal.
//!
//! Events are handled one at a time and to completion, so no state here is
//! shared or locked. The loop ends on the first terminal event (exit or
//! signal) and is not restartable.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use ssc_core::config::serde_utils::format_duration;
use ssc_core::traits::ProcessControl;
use ssc_core::ChildSignal;
use ssc_process::ProcessExit;

use crate::forwarder::ConnectionEvent;
use crate::state::{ActivityState, TimerCommand};

/// Why the coordinator stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    /// The child exited; `None` if its exit status was lost
    ProcessExited(Option<ProcessExit>),
    /// A termination signal was received and forwarded to the child
    Signal(ChildSignal),
}

/// Drives pause/resume of one process from connection activity
pub struct Coordinator<P: ProcessControl> {
    state: ActivityState,
    process: P,
    events: mpsc::Receiver<ConnectionEvent>,
    exit_rx: oneshot::Receiver<ProcessExit>,
}

impl<P: ProcessControl> Coordinator<P> {
    /// Create a coordinator for an already started process
    pub fn new(
        freeze_delay: Duration,
        nap_duration: Duration,
        process: P,
        events: mpsc::Receiver<ConnectionEvent>,
        exit_rx: oneshot::Receiver<ProcessExit>,
    ) -> Self {
        Self {
            state: ActivityState::new(freeze_delay, nap_duration, Instant::now()),
            process,
            events,
            exit_rx,
        }
    }

    /// Run until the child exits or `shutdown` yields a signal
    ///
    /// The debounce timer starts armed for one freeze delay. The process
    /// handle is dropped when this returns, releasing anything it holds
    /// (such as raw terminal mode).
    pub async fn run<F>(mut self, shutdown: F) -> Shutdown
    where
        F: Future<Output = ChildSignal>,
    {
        tokio::pin!(shutdown);

        let timer = tokio::time::sleep(self.state.freeze_delay());
        tokio::pin!(timer);
        let mut timer_armed = true;
        let mut events_open = true;

        tracing::debug!(
            "Counting down {} before pausing",
            format_duration(self.state.freeze_delay())
        );

        loop {
            tokio::select! {
                event = self.events.recv(), if events_open => {
                    match event {
                        Some(event) => {
                            if let Some(command) = self.on_connection_event(event) {
                                let deadline = match command {
                                    TimerCommand::FireNow => Instant::now(),
                                    TimerCommand::Countdown(delay) => Instant::now() + delay,
                                };
                                timer.as_mut().reset(deadline);
                                timer_armed = true;
                            }
                        }
                        None => {
                            tracing::debug!("All forwarders are gone");
                            events_open = false;
                        }
                    }
                }

                () = &mut timer, if timer_armed => {
                    timer_armed = false;
                    self.on_timer();
                }

                exit = &mut self.exit_rx => {
                    let exit = match exit {
                        Ok(exit) => {
                            tracing::info!("Process exited with {}", exit);
                            Some(exit)
                        }
                        Err(_) => {
                            tracing::warn!("Process exit status was lost");
                            None
                        }
                    };
                    return Shutdown::ProcessExited(exit);
                }

                signal = &mut shutdown => {
                    self.forward_signal(signal);
                    return Shutdown::Signal(signal);
                }
            }
        }
    }

    /// Update the count; returns how to re-arm the timer, if at all
    fn on_connection_event(&mut self, event: ConnectionEvent) -> Option<TimerCommand> {
        let now = Instant::now();

        match event {
            ConnectionEvent::Begin { session, peer, .. } => {
                if self.state.connection_opened(now) {
                    tracing::info!(session, %peer, "First connection");
                    if self.process.is_paused() {
                        match self.process.resume() {
                            Ok(()) => tracing::info!("Resumed process"),
                            Err(e) => tracing::error!("Failed to resume process: {}", e),
                        }
                    }
                }
                tracing::debug!(
                    session,
                    total = self.state.total_connections(),
                    "Connection begin"
                );
                // A pending countdown keeps running; the fire handler re-checks the count
                None
            }

            ConnectionEvent::End {
                session,
                sent,
                received,
            } => {
                let command = self.state.connection_closed(now);
                tracing::debug!(
                    session,
                    sent,
                    received,
                    total = self.state.total_connections(),
                    "Connection end"
                );

                match command {
                    Some(TimerCommand::FireNow) => {
                        tracing::info!(
                            "Last connection closed after {}ms, nap mode: pausing now",
                            self.state.active_for(now).as_millis()
                        );
                    }
                    Some(TimerCommand::Countdown(delay)) => {
                        tracing::info!(
                            "Last connection closed, counting down {}",
                            format_duration(delay)
                        );
                    }
                    None => {}
                }
                command
            }
        }
    }

    fn on_timer(&mut self) {
        if !self.state.timer_fired() {
            tracing::debug!(
                total = self.state.total_connections(),
                "Countdown elapsed with open connections"
            );
            return;
        }
        if self.process.is_paused() {
            return;
        }

        match self.process.pause() {
            Ok(()) => tracing::info!("Paused process"),
            Err(e) => tracing::error!("Failed to pause process: {}", e),
        }
    }

    /// Best-effort delivery of a termination signal to the child
    fn forward_signal(&mut self, signal: ChildSignal) {
        tracing::info!(
            total = self.state.total_connections(),
            "Received {}, forwarding to process",
            signal
        );

        if let Err(e) = self.process.signal(signal) {
            tracing::error!("Failed to forward {}: {}", signal, e);
        }

        // A stopped group only acts on the signal once continued
        if self.process.is_paused() {
            if let Err(e) = self.process.resume() {
                tracing::error!("Failed to resume process after {}: {}", signal, e);
            }
        }
    }
}
