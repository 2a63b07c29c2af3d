//! Transmit pump — send buffer → socket.
//!
//! Pops at the target FPS cadence and writes framed payloads through a
//! [`SenderConnection`]. Any write failure drops the connection; the
//! pump then rebuilds one (which resends the handshake) and keeps
//! going, waiting the policy backoff after a failed reconnect instead
//! of spinning in a connect loop. Frames popped during an outage are
//! lost, never duplicated.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::buffer::FrameBuffer;
use crate::error::StreamError;
use crate::frame::EncodedFrame;
use crate::metrics::Metrics;
use crate::net::SenderConnection;
use crate::retry::RetryPolicy;
use crate::session::SessionInfo;

pub struct TransmitPump {
    peer: SocketAddr,
    session: SessionInfo,
    buffer: Arc<FrameBuffer<EncodedFrame>>,
    metrics: Arc<Metrics>,
    running: Arc<AtomicBool>,
    reconnect: RetryPolicy,
}

impl TransmitPump {
    pub fn new(
        peer: SocketAddr,
        session: SessionInfo,
        buffer: Arc<FrameBuffer<EncodedFrame>>,
        metrics: Arc<Metrics>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            peer,
            session,
            buffer,
            metrics,
            running,
            reconnect: RetryPolicy::reconnect(),
        }
    }

    /// Run until the stop flag clears. Returns early only if the very
    /// first connection cannot be established before a stop.
    pub async fn run(&mut self) -> Result<(), StreamError> {
        let interval = Duration::from_secs_f64(1.0 / self.session.target_fps);
        let mut conn = match self.connect_with_backoff().await {
            Some(conn) => conn,
            None => return Ok(()), // stopped before first connect
        };
        info!(peer = %self.peer, "transmitting at {:.1} fps", self.session.target_fps);

        while self.running.load(Ordering::SeqCst) {
            let loop_start = Instant::now();

            let Some(frame) = self.buffer.pop() else {
                tokio::time::sleep(super::IDLE_POLL).await;
                continue;
            };
            self.metrics
                .set_buffer_level(self.buffer.len(), self.buffer.capacity());

            let payload_len = frame.len();
            let send_start = Instant::now();
            match conn.send(frame.payload).await {
                Ok(()) => {
                    self.metrics.record_frame_sent(
                        (payload_len + crate::codec::LENGTH_PREFIX_SIZE) as u64,
                        payload_len,
                        send_start.elapsed(),
                    );
                }
                Err(e) => {
                    warn!("send failed: {e}; reconnecting");
                    self.metrics.record_frame_dropped();
                    // One reconnect attempt per frame cycle; a failure
                    // waits the backoff rather than blocking the pump.
                    match SenderConnection::establish(self.peer, &self.session).await {
                        Ok(new_conn) => {
                            info!(peer = %self.peer, "reconnected");
                            conn = new_conn;
                        }
                        Err(e) => {
                            warn!("reconnect failed: {e}");
                            tokio::time::sleep(self.reconnect.backoff).await;
                        }
                    }
                }
            }

            super::pace(loop_start, interval).await;
        }

        debug!("transmit pump stopped");
        Ok(())
    }

    /// Establish the initial connection, retrying with backoff until
    /// it succeeds or the pump is stopped.
    async fn connect_with_backoff(&self) -> Option<SenderConnection> {
        while self.running.load(Ordering::SeqCst) {
            match SenderConnection::establish(self.peer, &self.session).await {
                Ok(conn) => return Some(conn),
                Err(e) => {
                    warn!(peer = %self.peer, "connect failed: {e}");
                    tokio::time::sleep(self.reconnect.backoff).await;
                }
            }
        }
        None
    }
}

// ── Tests ────────────────────────────────────────────────────────
