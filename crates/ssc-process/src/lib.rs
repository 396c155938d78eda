//! ssc-process: Control over the single supervised child process
//!
//! The controller starts the child in its own process group, either wired to
//! the supervisor's own stdio or behind a pseudo-terminal, and pauses,
//! resumes and signals the whole group on request.

pub mod controller;
pub mod pty;
pub mod terminal;

pub use controller::{ProcessController, ProcessExit};
