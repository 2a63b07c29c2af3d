//! Capture/encode pump — source → send buffer.
//!
//! Reads raw frames from the [`FrameSource`] at a rate slightly above
//! the target FPS (capped at the source's native rate) so the send
//! buffer stays populated without runaway memory use, applies an
//! optional uniform rescale, JPEG-encodes, and pushes with the
//! `RejectNewest` policy — a full buffer skips the frame rather than
//! stalling the source. End-of-source rewinds for loop playback.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use image::imageops::FilterType;
use tracing::{debug, warn};

use crate::buffer::{FrameBuffer, PushOutcome};
use crate::error::StreamError;
use crate::frame::{DecodedFrame, EncodedFrame};
use crate::metrics::Metrics;
use crate::session::SessionInfo;
use crate::sink::DisplaySink;
use crate::source::FrameSource;

/// Read-rate headroom over the target FPS.
const READ_RATE_FACTOR: f64 = 1.1;

pub struct CapturePump<S: FrameSource> {
    source: S,
    buffer: Arc<FrameBuffer<EncodedFrame>>,
    metrics: Arc<Metrics>,
    running: Arc<AtomicBool>,
    target_fps: f64,
    scale: f64,
    quality: u8,
    preview: Option<Box<dyn DisplaySink>>,
}

impl<S: FrameSource> CapturePump<S> {
    pub fn new(
        source: S,
        buffer: Arc<FrameBuffer<EncodedFrame>>,
        metrics: Arc<Metrics>,
        running: Arc<AtomicBool>,
        target_fps: f64,
        scale: f64,
        quality: u8,
    ) -> Self {
        Self {
            source,
            buffer,
            metrics,
            running,
            target_fps,
            scale,
            quality,
            preview: None,
        }
    }

    /// Mirror outgoing frames into a local sink.
    pub fn with_preview(mut self, sink: Box<dyn DisplaySink>) -> Self {
        self.preview = Some(sink);
        self
    }

    /// Output resolution after the configured rescale.
    pub fn output_dimensions(&self) -> (u32, u32) {
        let (w, h) = self.source.dimensions();
        if self.scale == 1.0 {
            (w, h)
        } else {
            (
                ((w as f64 * self.scale).round() as u32).max(1),
                ((h as f64 * self.scale).round() as u32).max(1),
            )
        }
    }

    /// The session record this pump's output corresponds to.
    pub fn session_info(&self) -> SessionInfo {
        let (w, h) = self.output_dimensions();
        SessionInfo::new(w, h, self.target_fps, self.quality)
    }

    /// Run until the stop flag clears. A non-positive capture rate is
    /// rejected up front; `1/0` is not a pacing interval.
    pub async fn run(&mut self) -> Result<(), StreamError> {
        let read_fps = (self.target_fps * READ_RATE_FACTOR).min(self.source.native_fps());
        if !read_fps.is_finite() || read_fps <= 0.0 {
            return Err(StreamError::Other(format!(
                "invalid capture rate {read_fps} (target {} fps, source {} fps)",
                self.target_fps,
                self.source.native_fps()
            )));
        }
        let interval = Duration::from_secs_f64(1.0 / read_fps);
        let (out_w, out_h) = self.output_dimensions();
        debug!(read_fps, "capture pump started");

        while self.running.load(Ordering::SeqCst) {
            let loop_start = Instant::now();

            let raw = match self.source.next_frame().await {
                Ok(frame) => frame,
                Err(StreamError::SourceExhausted) => {
                    // Loop playback: back to the first frame.
                    self.source.rewind();
                    continue;
                }
                Err(e) => {
                    warn!("capture error: {e}");
                    tokio::time::sleep(super::TRANSIENT_DELAY).await;
                    continue;
                }
            };

            let scaled = if self.scale == 1.0 {
                raw
            } else {
                image::imageops::resize(&raw, out_w, out_h, FilterType::Triangle)
            };

            if let Some(sink) = self.preview.as_mut() {
                match sink.present(&DecodedFrame::new(scaled.clone())) {
                    Ok(()) => self.metrics.record_frame_displayed(),
                    Err(e) => warn!("preview error: {e}"),
                }
            }

            let encoded = match EncodedFrame::from_image(&scaled, self.quality) {
                Ok(f) => f,
                Err(e) => {
                    warn!("frame encode error: {e}");
                    continue;
                }
            };

            if self.buffer.push(encoded) == PushOutcome::Rejected {
                // Buffer full: skip this frame, never stall the source.
                self.metrics.record_frame_dropped();
            }
            self.metrics
                .set_buffer_level(self.buffer.len(), self.buffer.capacity());

            super::pace(loop_start, interval).await;
        }

        debug!("capture pump stopped");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
