//! Sender-side connection management.
//!
//! A [`SenderConnection`] owns the TCP stream for its lifetime:
//! connect → handshake → steady-state sends → dropped on failure. The
//! transmit pump builds a fresh one on every reconnect, which is what
//! guarantees the handshake is resent per connection.

use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::codec::FrameCodec;
use crate::error::StreamError;
use crate::session::SessionInfo;

/// Bound on any single socket operation; an exceeded deadline fails
/// the operation instead of hanging the pump.
pub const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// An established, handshaken connection to the receiver.
pub struct SenderConnection {
    framed: Framed<TcpStream, FrameCodec>,
    peer: SocketAddr,
}

impl SenderConnection {
    /// Connect to `peer` and send the session-info handshake as the
    /// first framed message.
    pub async fn establish(peer: SocketAddr, session: &SessionInfo) -> Result<Self, StreamError> {
        let stream = tokio::time::timeout(IO_TIMEOUT, TcpStream::connect(peer))
            .await
            .map_err(|_| StreamError::Timeout(IO_TIMEOUT))??;
        stream.set_nodelay(true)?;

        let mut conn = Self {
            framed: Framed::new(stream, FrameCodec),
            peer,
        };
        conn.send(Bytes::from(session.to_bytes()?)).await?;
        Ok(conn)
    }

    /// Write one framed payload, bounded by [`IO_TIMEOUT`].
    pub async fn send(&mut self, payload: Bytes) -> Result<(), StreamError> {
        tokio::time::timeout(IO_TIMEOUT, self.framed.send(payload))
            .await
            .map_err(|_| StreamError::Timeout(IO_TIMEOUT))?
    }

    /// The receiver address this connection targets.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

// ── Tests ────────────────────────────────────────────────────────
