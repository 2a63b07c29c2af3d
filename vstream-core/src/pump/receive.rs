//! Receive pump — socket → playback buffer.
//!
//! Owns the listening socket. Each accepted connection must open with
//! a session-info handshake; repeated handshake failures are fatal,
//! since nothing downstream can render frames whose parameters are
//! unknown. After the handshake, framed payloads are decoded and
//! pushed with the `DropOldest` policy so playback always sees the
//! freshest frames. A disconnect returns the pump to accept, which is
//! how a reconnecting sender resumes the stream.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures::StreamExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::buffer::{FrameBuffer, PushOutcome};
use crate::codec::{FrameCodec, LENGTH_PREFIX_SIZE};
use crate::error::StreamError;
use crate::frame::{DecodedFrame, EncodedFrame};
use crate::metrics::Metrics;
use crate::net::IO_TIMEOUT;
use crate::retry::RetryPolicy;
use crate::session::SessionInfo;

pub struct ReceivePump {
    listener: TcpListener,
    buffer: Arc<FrameBuffer<DecodedFrame>>,
    metrics: Arc<Metrics>,
    running: Arc<AtomicBool>,
    session_tx: watch::Sender<Option<SessionInfo>>,
    handshake_retry: RetryPolicy,
}

impl ReceivePump {
    /// Bind the listening socket.
    pub async fn bind(
        addr: SocketAddr,
        buffer: Arc<FrameBuffer<DecodedFrame>>,
        metrics: Arc<Metrics>,
        running: Arc<AtomicBool>,
    ) -> Result<Self, StreamError> {
        let listener = TcpListener::bind(addr).await?;
        let (session_tx, _) = watch::channel(None);
        Ok(Self {
            listener,
            buffer,
            metrics,
            running,
            session_tx,
            handshake_retry: RetryPolicy::handshake(),
        })
    }

    /// The bound address (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, StreamError> {
        Ok(self.listener.local_addr()?)
    }

    /// Watch that yields the session info of the current connection.
    pub fn session_watch(&self) -> watch::Receiver<Option<SessionInfo>> {
        self.session_tx.subscribe()
    }

    /// Accept and serve connections until the stop flag clears.
    /// Handshake failures are retried per the policy across fresh
    /// connections; exhausting it ends the pump with an error.
    pub async fn run(&mut self) -> Result<(), StreamError> {
        info!(addr = %self.local_addr()?, "listening for sender");
        let mut handshake_failures = 0u32;

        while self.running.load(Ordering::SeqCst) {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                _ = super::wait_for_stop(&self.running) => return Ok(()),
            };
            let stream = match accepted {
                Ok((stream, peer)) => {
                    info!(%peer, "sender connected");
                    stream
                }
                Err(e) => {
                    warn!("accept error: {e}");
                    continue;
                }
            };

            match self.serve_connection(stream).await {
                Ok(()) => {
                    handshake_failures = 0;
                    debug!("connection closed, back to accept");
                }
                Err(e @ StreamError::HandshakeFailure(_)) => {
                    handshake_failures += 1;
                    if handshake_failures >= self.handshake_retry.max_attempts {
                        return Err(e);
                    }
                    warn!(
                        attempt = handshake_failures,
                        max = self.handshake_retry.max_attempts,
                        "handshake failed: {e}"
                    );
                    tokio::time::sleep(self.handshake_retry.backoff).await;
                }
                Err(e) => warn!("connection error: {e}"),
            }
        }
        Ok(())
    }

    async fn serve_connection(&mut self, stream: TcpStream) -> Result<(), StreamError> {
        stream.set_nodelay(true)?;
        let mut framed = Framed::new(stream, FrameCodec);

        let session = self.read_handshake(&mut framed).await?;
        info!(
            "session: {}x{} @ {:.1} fps, quality {}",
            session.width, session.height, session.target_fps, session.quality
        );
        self.metrics.set_session(session.clone());
        self.session_tx.send_replace(Some(session));

        loop {
            let recv_start = Instant::now();
            let next = tokio::select! {
                item = tokio::time::timeout(IO_TIMEOUT, framed.next()) => item,
                _ = super::wait_for_stop(&self.running) => return Ok(()),
            };
            let item = match next {
                Ok(item) => item,
                Err(_) => {
                    warn!("receive timed out after {IO_TIMEOUT:?}");
                    return Ok(());
                }
            };

            let payload = match item {
                Some(Ok(payload)) => payload,
                Some(Err(e)) => {
                    warn!("receive error: {e}");
                    tokio::time::sleep(super::TRANSIENT_DELAY).await;
                    continue;
                }
                None => {
                    info!("sender disconnected");
                    return Ok(());
                }
            };

            // Latency spans the wait for the frame, so it reflects the
            // sender's pacing as well as the network.
            self.metrics.record_frame_received(
                (payload.len() + LENGTH_PREFIX_SIZE) as u64,
                payload.len(),
                recv_start.elapsed(),
            );

            match EncodedFrame::new(payload).decode() {
                Ok(frame) => {
                    if self.buffer.push(frame) == PushOutcome::Evicted {
                        debug!("playback buffer full, evicted oldest frame");
                    }
                    self.metrics
                        .set_buffer_level(self.buffer.len(), self.buffer.capacity());
                }
                Err(e) => {
                    warn!("frame decode failed: {e}");
                    self.metrics.record_frame_dropped();
                }
            }
        }
    }

    async fn read_handshake(
        &self,
        framed: &mut Framed<TcpStream, FrameCodec>,
    ) -> Result<SessionInfo, StreamError> {
        let first = tokio::time::timeout(IO_TIMEOUT, framed.next())
            .await
            .map_err(|_| StreamError::HandshakeFailure("timed out waiting for handshake".into()))?
            .ok_or_else(|| StreamError::HandshakeFailure("connection closed before handshake".into()))?
            .map_err(|e| StreamError::HandshakeFailure(e.to_string()))?;
        SessionInfo::from_bytes(&first)
    }
}

// ── Tests ────────────────────────────────────────────────────────
