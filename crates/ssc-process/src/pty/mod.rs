//! Pseudo-terminal bridge for interactive mode
//!
//! The child runs on the slave side of a PTY. Two blocking tasks copy the
//! supervisor's stdin into the master and the master's output to stdout,
//! while the controlling terminal is held in raw mode.

mod bridge;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use portable_pty::{native_pty_system, CommandBuilder, ExitStatus, MasterPty};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::oneshot;

use ssc_core::error::ProcessError;

use crate::controller::ProcessExit;
use crate::terminal::{current_size, RawModeGuard};

/// How long trailing output may take to drain after the child is reaped
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(250);

/// A child attached to a pseudo-terminal
///
/// Holds the terminal in raw mode until dropped.
pub struct PtyBridge {
    /// Process group (the child is a session leader)
    pgid: i32,
    /// Restores the terminal on drop
    _raw_mode: RawModeGuard,
}

impl PtyBridge {
    /// Spawn `program` on a fresh PTY and start bridging stdio to it
    ///
    /// `exit_tx` receives the exit status once the child is reaped and its
    /// output has been drained.
    pub fn spawn(
        program: &str,
        args: &[String],
        exit_tx: oneshot::Sender<ProcessExit>,
    ) -> Result<Self, ProcessError> {
        let raw_mode = RawModeGuard::enable()?;

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(current_size())
            .map_err(|e| ProcessError::Pty(format!("{:#}", e.context("Failed to open PTY"))))?;

        let (reader, writer) = master_io(pair.master.as_ref())
            .map_err(|e| ProcessError::Pty(format!("{:#}", e)))?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(args);
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }

        let mut child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| ProcessError::Spawn {
                program: program.to_string(),
                source: e
                    .downcast::<io::Error>()
                    .unwrap_or_else(|e| io::Error::new(io::ErrorKind::Other, format!("{:#}", e))),
            })?;

        // Only the child may hold the slave, so the master sees EOF when it exits
        drop(pair.slave);

        let pgid = match child.process_id() {
            Some(pid) => pid as i32,
            None => {
                let _ = child.kill();
                return Err(ProcessError::Pty("PTY child has no process id".to_string()));
            }
        };
        tracing::debug!("Spawned PTY child with PID {}", pgid);

        bridge::spawn_input(writer);
        let output = bridge::spawn_output(reader);
        tokio::spawn(follow_window_size(pair.master));

        tokio::spawn(async move {
            let exit = match tokio::task::spawn_blocking(move || child.wait()).await {
                Ok(Ok(status)) => pty_exit(&status),
                Ok(Err(e)) => {
                    tracing::error!("Failed to wait for PTY child {}: {}", pgid, e);
                    ProcessExit {
                        code: None,
                        signal: None,
                    }
                }
                Err(e) => {
                    tracing::error!("PTY wait task failed: {}", e);
                    ProcessExit {
                        code: None,
                        signal: None,
                    }
                }
            };

            if tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, output).await.is_err() {
                tracing::debug!("PTY output still open after child exit");
            }
            let _ = exit_tx.send(exit);
        });

        Ok(Self {
            pgid,
            _raw_mode: raw_mode,
        })
    }

    /// Process group of the PTY child
    pub fn pgid(&self) -> i32 {
        self.pgid
    }
}

/// Exit of a PTY child
///
/// portable-pty reports a signal death as a plain exit code, so `signal` is
/// never set in interactive mode.
fn pty_exit(status: &ExitStatus) -> ProcessExit {
    ProcessExit::with_code(status.exit_code() as i32)
}

/// Reader and writer handles for the master side
fn master_io(
    master: &dyn MasterPty,
) -> Result<(Box<dyn io::Read + Send>, Box<dyn io::Write + Send>)> {
    let reader = master
        .try_clone_reader()
        .context("Failed to clone PTY reader")?;
    let writer = master.take_writer().context("Failed to take PTY writer")?;
    Ok((reader, writer))
}

/// Keep the PTY the same size as the controlling terminal
///
/// Owns the master for the rest of the program, which keeps the PTY open.
async fn follow_window_size(master: Box<dyn MasterPty + Send>) {
    let mut winch = match signal(SignalKind::window_change()) {
        Ok(winch) => winch,
        Err(e) => {
            tracing::warn!("Failed to watch terminal size: {}", e);
            std::future::pending::<()>().await;
            return;
        }
    };

    while winch.recv().await.is_some() {
        let size = current_size();
        tracing::debug!("Resizing PTY to {}x{}", size.cols, size.rows);
        if let Err(e) = master.resize(size) {
            tracing::warn!("Failed to resize PTY: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pty_exit_carries_code_only() {
        let exit = pty_exit(&ExitStatus::with_exit_code(3));
        assert_eq!(exit.code, Some(3));
        assert_eq!(exit.signal, None);
        assert!(!exit.success());

        assert!(pty_exit(&ExitStatus::with_exit_code(0)).success());
    }
}
