//! ssc-core: Core types, errors and configuration for ssc
//!
//! This crate provides the shared types, the process-control trait, and the
//! configuration structures used by the process controller and the
//! orchestrator.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::SscError;
pub use types::{ChildSignal, PortMapping};
