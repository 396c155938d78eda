//! Core error types for ssc

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::ChildSignal;

/// Top-level error type for ssc
#[derive(Error, Debug)]
pub enum SscError {
    /// Forwarding error
    #[error("Forwarding error: {0}")]
    Forward(#[from] ForwardError),

    /// Process error
    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connection forwarding errors
#[derive(Error, Debug)]
pub enum ForwardError {
    /// The listen address could not be bound
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Supervised process errors
#[derive(Error, Debug)]
pub enum ProcessError {
    /// No program was given
    #[error("Command is empty")]
    EmptyCommand,

    /// The process was already started
    #[error("Process already started (pgid {0})")]
    AlreadyStarted(i32),

    /// The executable could not be launched
    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Pseudo-terminal setup failed
    #[error("PTY error: {0}")]
    Pty(String),

    /// The controlling terminal could not be switched to or from raw mode
    #[error("Terminal error: {0}")]
    Terminal(#[source] std::io::Error),

    /// A signal could not be delivered to the process group
    #[error("Failed to send {signal} to process group {pgid}: {source}")]
    Signal {
        signal: ChildSignal,
        pgid: i32,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Port mapping is not of the form `listen=destination`
    #[error("Invalid port mapping '{0}': expected listen=destination")]
    InvalidMapping(String),

    /// Address could not be parsed or resolved
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Duration string could not be parsed
    #[error("Invalid duration '{0}'")]
    InvalidDuration(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),
}
