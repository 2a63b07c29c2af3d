//! Playback pump — playback buffer → display sink.
//!
//! Paces presentation at the stream's FPS: taken from the handshake
//! published by the receive pump, or forced by an override. Before the
//! first frame it pre-fills a couple of frames (bounded by a short
//! deadline) to absorb network jitter without adding visible latency.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::buffer::FrameBuffer;
use crate::error::StreamError;
use crate::frame::DecodedFrame;
use crate::metrics::Metrics;
use crate::session::SessionInfo;
use crate::sink::DisplaySink;

/// Frames to accumulate before playback starts.
const PREFILL_FRAMES: usize = 5;

/// Smaller pre-fill for low-latency mode.
const PREFILL_FRAMES_LOW_LATENCY: usize = 2;

/// Upper bound on the pre-fill wait.
const PREFILL_TIMEOUT: Duration = Duration::from_secs(1);

pub struct PlaybackPump {
    buffer: Arc<FrameBuffer<DecodedFrame>>,
    sink: Box<dyn DisplaySink>,
    metrics: Arc<Metrics>,
    running: Arc<AtomicBool>,
    session_rx: watch::Receiver<Option<SessionInfo>>,
    override_fps: Option<f64>,
    low_latency: bool,
}

impl PlaybackPump {
    pub fn new(
        buffer: Arc<FrameBuffer<DecodedFrame>>,
        sink: Box<dyn DisplaySink>,
        metrics: Arc<Metrics>,
        running: Arc<AtomicBool>,
        session_rx: watch::Receiver<Option<SessionInfo>>,
        override_fps: Option<f64>,
    ) -> Self {
        Self {
            buffer,
            sink,
            metrics,
            running,
            session_rx,
            override_fps,
            low_latency: false,
        }
    }

    /// Trade jitter absorption for a smaller pre-fill.
    pub fn with_low_latency(mut self, low_latency: bool) -> Self {
        self.low_latency = low_latency;
        self
    }

    /// Run until the stop flag clears.
    pub async fn run(&mut self) -> Result<(), StreamError> {
        let Some(fps) = self.resolve_fps().await else {
            return Ok(()); // stopped before a session arrived
        };
        let interval = Duration::from_secs_f64(1.0 / fps);

        self.prefill().await;
        info!("playback at {:.1} fps", fps);

        while self.running.load(Ordering::SeqCst) {
            let loop_start = Instant::now();

            let Some(frame) = self.buffer.pop() else {
                tokio::time::sleep(super::IDLE_POLL).await;
                continue;
            };
            self.metrics
                .set_buffer_level(self.buffer.len(), self.buffer.capacity());

            match self.sink.present(&frame) {
                Ok(()) => self.metrics.record_frame_displayed(),
                Err(e) => warn!("display error: {e}"),
            }

            super::pace(loop_start, interval).await;
        }

        debug!("playback pump stopped");
        Ok(())
    }

    /// Playback rate: the override if set, otherwise the handshake's
    /// target FPS once it arrives. `None` means stopped while waiting.
    async fn resolve_fps(&mut self) -> Option<f64> {
        if let Some(fps) = self.override_fps {
            return Some(fps);
        }
        loop {
            let known = self.session_rx.borrow().as_ref().map(|s| s.target_fps);
            if let Some(fps) = known {
                return Some(fps);
            }
            tokio::select! {
                changed = self.session_rx.changed() => {
                    if changed.is_err() {
                        return None; // receive pump gone
                    }
                }
                _ = super::wait_for_stop(&self.running) => return None,
            }
        }
    }

    async fn prefill(&self) {
        let frames = if self.low_latency {
            PREFILL_FRAMES_LOW_LATENCY
        } else {
            PREFILL_FRAMES
        };
        let target = frames.min(self.buffer.capacity());
        let deadline = Instant::now() + PREFILL_TIMEOUT;
        while self.running.load(Ordering::SeqCst)
            && self.buffer.len() < target
            && Instant::now() < deadline
        {
            tokio::time::sleep(super::IDLE_POLL).await;
        }
        debug!(buffered = self.buffer.len(), "pre-fill done");
    }
}

// ── Tests ────────────────────────────────────────────────────────
