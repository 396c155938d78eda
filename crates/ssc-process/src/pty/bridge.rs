//! Blocking copy tasks between the supervisor's stdio and the PTY master

use std::io::{self, Read, Write};

use tokio::task::JoinHandle;

const BUFFER_SIZE: usize = 4096;

/// Copy the supervisor's stdin into the PTY
pub(crate) fn spawn_input(writer: Box<dyn Write + Send>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let stdin = io::stdin();
        pump(stdin.lock(), writer, "stdin -> pty");
    })
}

/// Copy PTY output to the supervisor's stdout
pub(crate) fn spawn_output(reader: Box<dyn Read + Send>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let stdout = io::stdout();
        pump(reader, stdout.lock(), "pty -> stdout");
    })
}

/// Copy until EOF or the first error, flushing after every chunk
fn pump(mut reader: impl Read, mut writer: impl Write, direction: &'static str) -> u64 {
    let mut buf = [0u8; BUFFER_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => {
                tracing::debug!("{}: EOF", direction);
                break;
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                // EIO on the master is how Linux reports that the child side closed
                tracing::debug!("{}: closed: {}", direction, e);
                break;
            }
        };

        if let Err(e) = writer.write_all(&buf[..n]).and_then(|_| writer.flush()) {
            tracing::debug!("{}: write failed: {}", direction, e);
            break;
        }
        total += n as u64;
    }

    tracing::debug!("{}: copied {} bytes", direction, total);
    total
}
