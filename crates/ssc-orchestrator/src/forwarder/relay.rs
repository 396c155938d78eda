//! Bidirectional byte relay for one session

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

const RELAY_BUFFER_SIZE: usize = 16 * 1024;

/// Bytes moved by a finished session
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    /// Client -> destination
    pub sent: u64,
    /// Destination -> client
    pub received: u64,
}

/// Relay between `client` and `upstream` until either direction ends
///
/// The first direction to hit EOF or an error ends the session: the other
/// direction is abandoned and both sockets are shut down and closed.
pub async fn relay(client: TcpStream, upstream: TcpStream) -> RelayStats {
    let _ = client.set_nodelay(true);
    let _ = upstream.set_nodelay(true);

    let (mut client_read, mut client_write) = client.into_split();
    let (mut upstream_read, mut upstream_write) = upstream.into_split();
    let mut stats = RelayStats::default();

    let (direction, result) = {
        let to_upstream = pipe(&mut client_read, &mut upstream_write, &mut stats.sent);
        let to_client = pipe(&mut upstream_read, &mut client_write, &mut stats.received);

        tokio::select! {
            result = to_upstream => ("client -> upstream", result),
            result = to_client => ("upstream -> client", result),
        }
    };

    match result {
        Ok(()) => tracing::trace!("Relay {} reached EOF", direction),
        Err(e) => tracing::debug!("Relay {} closed: {}", direction, e),
    }

    let _ = client_write.shutdown().await;
    let _ = upstream_write.shutdown().await;

    stats
}

/// Copy until EOF, counting bytes once they are written
async fn pipe<R, W>(reader: &mut R, writer: &mut W, counter: &mut u64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = BytesMut::with_capacity(RELAY_BUFFER_SIZE);

    loop {
        buf.clear();
        if reader.read_buf(&mut buf).await? == 0 {
            return Ok(());
        }
        writer.write_all(&buf).await?;
        *counter += buf.len() as u64;
    }
}
