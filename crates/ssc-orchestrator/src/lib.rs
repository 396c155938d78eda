//! ssc-orchestrator: Suspends a child process while nobody is connected
//!
//! Listens on every configured port mapping, relays each accepted
//! connection to its destination, and pauses or resumes the supervised
//! process according to how many relay sessions are open.

pub mod coordinator;
pub mod forwarder;
pub mod signals;
pub mod state;
pub mod supervisor;

pub use coordinator::{Coordinator, Shutdown};
pub use state::ActivityState;
pub use supervisor::Supervisor;
