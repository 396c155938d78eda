//! Process control trait

use crate::error::ProcessError;
use crate::types::ChildSignal;

/// Signal-level control over the supervised process group
///
/// Every operation is synchronous and returns immediately. Implementations
/// treat a process that was never started as a no-op and return `Ok(())`.
pub trait ProcessControl {
    /// Stop the process group and mark it paused
    fn pause(&mut self) -> Result<(), ProcessError>;

    /// Continue the process group and clear the paused flag
    fn resume(&mut self) -> Result<(), ProcessError>;

    /// Deliver an arbitrary signal to the process group
    fn signal(&mut self, signal: ChildSignal) -> Result<(), ProcessError>;

    /// Last known paused flag; not verified against the real process state
    fn is_paused(&self) -> bool;

    /// Ask the process group to terminate
    fn stop(&mut self) -> Result<(), ProcessError> {
        self.signal(ChildSignal::Terminate)
    }

    /// Kill the process group
    fn kill(&mut self) -> Result<(), ProcessError> {
        self.signal(ChildSignal::Kill)
    }
}
