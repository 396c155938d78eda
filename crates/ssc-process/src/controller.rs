//! Process controller
//!
//! Owns the lifecycle of the one supervised child. The child always runs in
//! its own process group so that stop/continue/terminate reach everything it
//! spawns, and exactly one [`ProcessExit`] is delivered once it is reaped.

use std::fmt;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{ExitStatus, Stdio};

use tokio::sync::oneshot;

use ssc_core::error::ProcessError;
use ssc_core::traits::ProcessControl;
use ssc_core::ChildSignal;

use crate::pty::PtyBridge;

/// How the supervised process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Terminating signal, if the process was killed by one
    ///
    /// Only plain children report this; a PTY child killed by a signal
    /// shows up as an exit code instead.
    pub signal: Option<i32>,
}

impl ProcessExit {
    /// Exit with a known code
    pub fn with_code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Whether the process exited with code 0
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<ExitStatus> for ProcessExit {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.signal) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(signal)) => write!(f, "signal {}", signal),
            (None, None) => write!(f, "unknown status"),
        }
    }
}

/// Starts, pauses, resumes and signals the supervised child
pub struct ProcessController {
    /// Program followed by its arguments
    command: Vec<String>,
    /// Run behind a pseudo-terminal
    interactive: bool,
    /// Process group of the running child
    pgid: Option<i32>,
    /// Last known paused flag
    paused: bool,
    /// Terminal bridge, interactive mode only
    pty: Option<PtyBridge>,
}

impl ProcessController {
    /// Create a controller; nothing runs until [`start`](Self::start)
    pub fn new(command: Vec<String>, interactive: bool) -> Self {
        Self {
            command,
            interactive,
            pgid: None,
            paused: false,
            pty: None,
        }
    }

    /// Launch the child in its own process group
    ///
    /// Returns the receiver of the single exit notification. Must be called
    /// from within a tokio runtime.
    pub fn start(&mut self) -> Result<oneshot::Receiver<ProcessExit>, ProcessError> {
        if let Some(pgid) = self.pgid {
            return Err(ProcessError::AlreadyStarted(pgid));
        }

        let (program, args) = self
            .command
            .split_first()
            .ok_or(ProcessError::EmptyCommand)?;
        let (exit_tx, exit_rx) = oneshot::channel();

        let pgid = if self.interactive {
            let bridge = PtyBridge::spawn(program, args, exit_tx)?;
            let pgid = bridge.pgid();
            self.pty = Some(bridge);
            pgid
        } else {
            spawn_inherited(program, args, exit_tx)?
        };

        tracing::info!(
            pgid,
            pty = self.pty.is_some(),
            "Started process: {}",
            self.command.join(" ")
        );

        self.pgid = Some(pgid);
        self.paused = false;
        Ok(exit_rx)
    }

    /// Process group of the child, once started
    pub fn pgid(&self) -> Option<i32> {
        self.pgid
    }
}

impl ProcessControl for ProcessController {
    fn pause(&mut self) -> Result<(), ProcessError> {
        if self.pgid.is_none() {
            return Ok(());
        }
        self.signal(ChildSignal::Stop)?;
        self.paused = true;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), ProcessError> {
        if self.pgid.is_none() {
            return Ok(());
        }
        self.signal(ChildSignal::Continue)?;
        self.paused = false;
        Ok(())
    }

    fn signal(&mut self, signal: ChildSignal) -> Result<(), ProcessError> {
        let Some(pgid) = self.pgid else {
            return Ok(());
        };

        // killpg reaches every member of the group, grandchildren included
        let result = unsafe { libc::killpg(pgid as libc::pid_t, signal.as_raw()) };
        if result != 0 {
            return Err(ProcessError::Signal {
                signal,
                pgid,
                source: std::io::Error::last_os_error(),
            });
        }

        tracing::debug!(pgid, "Sent {} to process group", signal);
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

/// Spawn the child sharing the supervisor's stdio, returning its process group
fn spawn_inherited(
    program: &str,
    args: &[String],
    exit_tx: oneshot::Sender<ProcessExit>,
) -> Result<i32, ProcessError> {
    let mut command = std::process::Command::new(program);
    command
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .process_group(0);

    let mut child = tokio::process::Command::from(command)
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        })?;

    // process_group(0) makes the child the leader of a new group
    let pgid = child
        .id()
        .map(|pid| pid as i32)
        .ok_or_else(|| ProcessError::Spawn {
            program: program.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "child exited before start"),
        })?;

    tokio::spawn(async move {
        let exit = match child.wait().await {
            Ok(status) => ProcessExit::from(status),
            Err(e) => {
                tracing::error!("Failed to wait for process {}: {}", pgid, e);
                ProcessExit {
                    code: None,
                    signal: None,
                }
            }
        };
        let _ = exit_tx.send(exit);
    });

    Ok(pgid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn command(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unstarted_controller_is_a_noop() {
        let mut controller = ProcessController::new(command(&["sleep", "1"]), false);
        assert!(controller.pause().is_ok());
        assert!(!controller.is_paused());
        assert!(controller.resume().is_ok());
        assert!(controller.stop().is_ok());
        assert!(controller.kill().is_ok());
        assert!(controller.pgid().is_none());
    }

    #[tokio::test]
    async fn test_empty_command() {
        let mut controller = ProcessController::new(Vec::new(), false);
        assert!(matches!(controller.start(), Err(ProcessError::EmptyCommand)));
    }

    #[tokio::test]
    async fn test_spawn_error() {
        let mut controller =
            ProcessController::new(command(&["/nonexistent/ssc-test-binary"]), false);
        assert!(matches!(
            controller.start(),
            Err(ProcessError::Spawn { program, .. }) if program == "/nonexistent/ssc-test-binary"
        ));
    }

    #[tokio::test]
    async fn test_exit_notification_carries_code() {
        let mut controller = ProcessController::new(command(&["sh", "-c", "exit 3"]), false);
        let exit_rx = controller.start().unwrap();

        let exit = tokio::time::timeout(Duration::from_secs(5), exit_rx)
            .await
            .expect("process did not exit")
            .unwrap();
        assert_eq!(exit, ProcessExit::with_code(3));
        assert!(!exit.success());
    }

    #[tokio::test]
    async fn test_start_twice_is_rejected() {
        let mut controller = ProcessController::new(command(&["sleep", "5"]), false);
        let _exit_rx = controller.start().unwrap();
        assert!(matches!(
            controller.start(),
            Err(ProcessError::AlreadyStarted(_))
        ));
        controller.kill().unwrap();
    }

    #[tokio::test]
    async fn test_child_leads_its_own_process_group() {
        let mut controller = ProcessController::new(command(&["sleep", "5"]), false);
        let _exit_rx = controller.start().unwrap();
        let pgid = controller.pgid().unwrap();

        let group = unsafe { libc::getpgid(pgid as libc::pid_t) };
        assert_eq!(group, pgid);
        assert_ne!(group, unsafe { libc::getpgrp() });

        controller.kill().unwrap();
    }

    #[tokio::test]
    async fn test_pause_resume_tracks_flag() {
        let mut controller = ProcessController::new(command(&["sleep", "5"]), false);
        let _exit_rx = controller.start().unwrap();

        controller.pause().unwrap();
        assert!(controller.is_paused());
        controller.resume().unwrap();
        assert!(!controller.is_paused());

        controller.kill().unwrap();
    }

    #[tokio::test]
    async fn test_stop_delivers_exit_with_signal() {
        let mut controller = ProcessController::new(command(&["sleep", "30"]), false);
        let exit_rx = controller.start().unwrap();

        controller.stop().unwrap();
        let exit = tokio::time::timeout(Duration::from_secs(5), exit_rx)
            .await
            .expect("process did not exit")
            .unwrap();
        assert_eq!(exit.signal, Some(libc::SIGTERM));
        assert_eq!(exit.code, None);
    }

    #[tokio::test]
    async fn test_signal_to_reaped_group_fails() {
        let mut controller = ProcessController::new(command(&["true"]), false);
        let exit_rx = controller.start().unwrap();
        tokio::time::timeout(Duration::from_secs(5), exit_rx)
            .await
            .expect("process did not exit")
            .unwrap();

        let result = controller.pause();
        assert!(matches!(
            result,
            Err(ProcessError::Signal {
                signal: ChildSignal::Stop,
                ..
            })
        ));
        assert!(!controller.is_paused());
    }

    #[test]
    fn test_process_exit_display() {
        assert_eq!(ProcessExit::with_code(0).to_string(), "exit code 0");
        let signalled = ProcessExit {
            code: None,
            signal: Some(15),
        };
        assert_eq!(signalled.to_string(), "signal 15");
    }
}
