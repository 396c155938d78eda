//! Activity debounce state
//!
//! Pure bookkeeping for the coordinator: connection count, countdown flag
//! and the time of the last 0 -> 1 transition. Every method takes `now`
//! instead of reading a clock, and none of them touch the process.

use std::time::Duration;

use tokio::time::Instant;

/// What the coordinator should do with the debounce timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Fire as soon as possible (nap shortcut)
    FireNow,
    /// Fire after the given delay
    Countdown(Duration),
}

/// Connection accounting and debounce flags
#[derive(Debug, Clone)]
pub struct ActivityState {
    /// Open sessions across all mappings
    total_connections: u64,
    /// A countdown toward a pause is pending and has not fired yet
    timing: bool,
    /// When the count last went from 0 to 1
    last_first_connection: Instant,
    /// Idle time before the child is paused
    freeze_delay: Duration,
    /// Sessions shorter than this re-pause without a full countdown
    nap_duration: Duration,
}

impl ActivityState {
    /// Fresh state at startup
    ///
    /// The initial countdown counts as timing, so a child that never sees a
    /// connection is paused after one full freeze delay.
    pub fn new(freeze_delay: Duration, nap_duration: Duration, now: Instant) -> Self {
        Self {
            total_connections: 0,
            timing: true,
            last_first_connection: now,
            freeze_delay,
            nap_duration,
        }
    }

    /// Record a connection begin; returns true on the 0 -> 1 transition
    pub fn connection_opened(&mut self, now: Instant) -> bool {
        self.total_connections += 1;
        if self.total_connections == 1 {
            self.last_first_connection = now;
            true
        } else {
            false
        }
    }

    /// Record a connection end
    ///
    /// Returns how to re-arm the timer when the count drops to zero, and
    /// `None` while other sessions are still open.
    pub fn connection_closed(&mut self, now: Instant) -> Option<TimerCommand> {
        if self.total_connections == 0 {
            tracing::warn!("Connection end without a matching begin");
            return None;
        }

        self.total_connections -= 1;
        if self.total_connections > 0 {
            return None;
        }

        let active_for = now.saturating_duration_since(self.last_first_connection);
        if active_for < self.nap_duration && !self.timing {
            Some(TimerCommand::FireNow)
        } else {
            self.timing = true;
            Some(TimerCommand::Countdown(self.freeze_delay))
        }
    }

    /// Record that the debounce timer fired; returns true if nobody is connected
    pub fn timer_fired(&mut self) -> bool {
        self.timing = false;
        self.total_connections == 0
    }

    pub fn total_connections(&self) -> u64 {
        self.total_connections
    }

    pub fn is_timing(&self) -> bool {
        self.timing
    }

    pub fn freeze_delay(&self) -> Duration {
        self.freeze_delay
    }

    /// Time since the last 0 -> 1 transition
    pub fn active_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_first_connection)
    }
}
