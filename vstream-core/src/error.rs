//! Domain-specific error types for the streaming pipeline.
//!
//! All fallible operations return `Result<T, StreamError>`.
//! Transient failures (short reads, write errors, undecodable frames)
//! are typed so the pumps can self-heal; only a failed handshake is
//! treated as fatal by the binaries.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the streaming pipeline.
#[derive(Debug, Error)]
pub enum StreamError {
    // ── Protocol Errors ──────────────────────────────────────────
    /// The peer never delivered a parseable session-info record.
    #[error("handshake failed: {0}")]
    HandshakeFailure(String),

    /// The stream closed before a complete framed message arrived.
    #[error("short read: got {got} of {needed} bytes")]
    ShortRead { needed: usize, got: usize },

    /// The length prefix exceeds the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // ── Pipeline Errors ──────────────────────────────────────────
    /// A payload failed to decode into an image. Counted as a dropped
    /// frame; the pipeline continues.
    #[error("frame decode failed: {0}")]
    DecodeFailure(String),

    /// The capture source reached end-of-stream. Triggers a rewind,
    /// not a shutdown.
    #[error("capture source exhausted")]
    SourceExhausted,

    /// A frame could not be encoded for transmission.
    #[error("encoding error: {0}")]
    Encoding(String),

    // ── Connection Errors ────────────────────────────────────────
    /// The TCP/IO layer reported an error.
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// An operation exceeded its deadline.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for StreamError {
    fn from(s: String) -> Self {
        StreamError::Other(s)
    }
}

impl From<&str> for StreamError {
    fn from(s: &str) -> Self {
        StreamError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(e: serde_json::Error) -> Self {
        StreamError::HandshakeFailure(e.to_string())
    }
}

impl From<image::ImageError> for StreamError {
    fn from(e: image::ImageError) -> Self {
        StreamError::DecodeFailure(e.to_string())
    }
}

impl StreamError {
    /// Whether the pump that hit this error should retry rather than
    /// bail out.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StreamError::ShortRead { .. }
                | StreamError::Connection(_)
                | StreamError::DecodeFailure(_)
                | StreamError::Timeout(_)
        )
    }
}
