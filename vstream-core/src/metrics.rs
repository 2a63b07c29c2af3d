//! Traffic and quality metrics shared by every pump.
//!
//! One [`Metrics`] value per process, passed by `Arc` to each pump and
//! to the HTTP responder — no ambient globals. All counters live
//! behind a single mutex so a snapshot is one lock acquisition and can
//! never observe a torn update. Rolling windows keep the last
//! [`ROLLING_WINDOW`] samples; everything else is monotonic.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::session::SessionInfo;

/// Number of samples kept in each rolling window.
pub const ROLLING_WINDOW: usize = 30;

// ── Metrics ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MetricsInner {
    bytes_transferred: u64,
    packets: u64,
    frames_sent: u64,
    frames_received: u64,
    frames_displayed: u64,
    frames_dropped: u64,
    /// Last `ROLLING_WINDOW` payload sizes in bytes.
    frame_sizes: VecDeque<usize>,
    /// Last `ROLLING_WINDOW` per-frame processing latencies.
    frame_times: VecDeque<Duration>,
    buffer_len: usize,
    buffer_capacity: usize,
    session: Option<SessionInfo>,
}

impl MetricsInner {
    fn push_window<T>(window: &mut VecDeque<T>, sample: T) {
        window.push_back(sample);
        if window.len() > ROLLING_WINDOW {
            window.pop_front();
        }
    }
}

/// Thread-safe metrics aggregator.
#[derive(Debug)]
pub struct Metrics {
    started: Instant,
    inner: Mutex<MetricsInner>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            inner: Mutex::new(MetricsInner::default()),
        }
    }

    /// A frame left over the wire. `wire_bytes` includes the length
    /// prefix; `payload_len` and `latency` feed the rolling windows.
    pub fn record_frame_sent(&self, wire_bytes: u64, payload_len: usize, latency: Duration) {
        let mut inner = self.lock();
        inner.bytes_transferred += wire_bytes;
        inner.packets += 1;
        inner.frames_sent += 1;
        MetricsInner::push_window(&mut inner.frame_sizes, payload_len);
        MetricsInner::push_window(&mut inner.frame_times, latency);
    }

    /// A framed message arrived, decodable or not.
    pub fn record_frame_received(&self, wire_bytes: u64, payload_len: usize, latency: Duration) {
        let mut inner = self.lock();
        inner.bytes_transferred += wire_bytes;
        inner.packets += 1;
        inner.frames_received += 1;
        MetricsInner::push_window(&mut inner.frame_sizes, payload_len);
        MetricsInner::push_window(&mut inner.frame_times, latency);
    }

    /// A frame was delivered to the display sink.
    pub fn record_frame_displayed(&self) {
        self.lock().frames_displayed += 1;
    }

    /// A frame was lost: undecodable payload, buffer eviction, or a
    /// capture-side rejected push.
    pub fn record_frame_dropped(&self) {
        self.lock().frames_dropped += 1;
    }

    /// Update the buffer occupancy gauge. Called by the pumps after
    /// push/pop so the responder never touches the buffer itself.
    pub fn set_buffer_level(&self, len: usize, capacity: usize) {
        let mut inner = self.lock();
        inner.buffer_len = len;
        inner.buffer_capacity = capacity;
    }

    /// Record the negotiated session parameters once known.
    pub fn set_session(&self, session: SessionInfo) {
        self.lock().session = Some(session);
    }

    /// Point-in-time view of every counter and derived rate.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.lock();
        let elapsed = self.started.elapsed().as_secs_f64().max(f64::EPSILON);

        let avg_frame_size = if inner.frame_sizes.is_empty() {
            0.0
        } else {
            inner.frame_sizes.iter().sum::<usize>() as f64 / inner.frame_sizes.len() as f64
        };
        let avg_frame_time = if inner.frame_times.is_empty() {
            0.0
        } else {
            inner
                .frame_times
                .iter()
                .map(Duration::as_secs_f64)
                .sum::<f64>()
                / inner.frame_times.len() as f64
        };
        let actual_fps = if avg_frame_time > 0.0 {
            1.0 / avg_frame_time
        } else {
            0.0
        };
        let drop_rate = if inner.frames_received > 0 {
            inner.frames_dropped as f64 / inner.frames_received as f64 * 100.0
        } else {
            0.0
        };
        let buffer_fullness = if inner.buffer_capacity > 0 {
            inner.buffer_len as f64 / inner.buffer_capacity as f64 * 100.0
        } else {
            0.0
        };

        MetricsSnapshot {
            bandwidth_usage: inner.bytes_transferred as f64 / (1024.0 * 1024.0) / elapsed,
            packet_rate: inner.packets as f64 / elapsed,
            frame_size: avg_frame_size / 1024.0,
            frame_time_ms: avg_frame_time * 1000.0,
            actual_fps,
            target_fps: inner.session.as_ref().map(|s| s.target_fps),
            buffer_fullness,
            frame_drop_rate: drop_rate,
            bytes_transferred: inner.bytes_transferred,
            packets: inner.packets,
            frames_sent: inner.frames_sent,
            frames_received: inner.frames_received,
            frames_displayed: inner.frames_displayed,
            frames_dropped: inner.frames_dropped,
            resolution: inner
                .session
                .as_ref()
                .map(|s| format!("{}x{}", s.width, s.height)),
            quality: inner.session.as_ref().map(|s| s.quality),
            uptime_secs: elapsed,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MetricsInner> {
        self.inner.lock().expect("metrics poisoned")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

// ── MetricsSnapshot ──────────────────────────────────────────────

/// Serializable point-in-time metrics view, the `/metrics` body.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// MB/s since process start.
    pub bandwidth_usage: f64,
    /// Packets per second since process start.
    pub packet_rate: f64,
    /// Rolling average frame size in KB.
    pub frame_size: f64,
    /// Rolling average per-frame processing time in milliseconds.
    pub frame_time_ms: f64,
    /// Derived FPS (`1 / avg frame time`).
    pub actual_fps: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_fps: Option<f64>,
    /// Buffer occupancy percentage.
    pub buffer_fullness: f64,
    /// Dropped frames as a percentage of received frames.
    pub frame_drop_rate: f64,
    pub bytes_transferred: u64,
    pub packets: u64,
    pub frames_sent: u64,
    pub frames_received: u64,
    pub frames_displayed: u64,
    pub frames_dropped: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    pub uptime_secs: f64,
}

// ── Tests ────────────────────────────────────────────────────────
