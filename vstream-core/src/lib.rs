//! # vstream-core
//!
//! Core library for the vstream point-to-point video streaming pair.
//!
//! This crate contains:
//! - **Codec**: `FrameCodec` — length-prefixed framing via `tokio_util`
//! - **Session**: `SessionInfo` handshake record exchanged per connection
//! - **Frames**: `EncodedFrame` / `DecodedFrame` and the JPEG boundary
//! - **Buffer**: `FrameBuffer` — bounded queue with overflow policies
//! - **Pumps**: the four worker loops (capture, transmit, receive, playback)
//! - **Source/Sink**: `FrameSource` and `DisplaySink` seams at the edges
//! - **Metrics**: rolling-window stats and the `GET /metrics` endpoint
//! - **Error**: `StreamError` — typed, `thiserror`-based error hierarchy

pub mod buffer;
pub mod codec;
pub mod error;
pub mod frame;
pub mod metrics;
pub mod net;
pub mod pump;
pub mod retry;
pub mod session;
pub mod sink;
pub mod source;
pub mod web;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use buffer::{DEFAULT_CAPACITY, FrameBuffer, OverflowPolicy, PushOutcome};
pub use codec::{FrameCodec, LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE};
pub use error::StreamError;
pub use frame::{DecodedFrame, EncodedFrame};
pub use metrics::{Metrics, MetricsSnapshot, ROLLING_WINDOW};
pub use net::{IO_TIMEOUT, SenderConnection};
pub use pump::{CapturePump, PlaybackPump, ReceivePump, TransmitPump};
pub use retry::RetryPolicy;
pub use session::SessionInfo;
pub use sink::{DisplaySink, FileSink, NullSink};
pub use source::{FrameSource, ImageDirSource, PatternSource};
