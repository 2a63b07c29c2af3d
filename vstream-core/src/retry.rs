//! Explicit retry policy for connection-level recovery.
//!
//! Replaces ad hoc retry loops with named parameters so the handshake
//! and reconnect behaviour is visible at the call site.

use std::time::Duration;

/// Bounded retry with a fixed backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts before giving up.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts,
            backoff,
        }
    }

    /// Handshake policy: 3 attempts, 2 s apart, then fatal.
    pub fn handshake() -> Self {
        Self::new(3, Duration::from_secs(2))
    }

    /// Reconnect policy: unbounded attempts, 1 s backoff. The transmit
    /// pump retries one reconnect per frame cycle rather than spinning
    /// in a connect loop.
    pub fn reconnect() -> Self {
        Self::new(u32::MAX, Duration::from_secs(1))
    }
}
