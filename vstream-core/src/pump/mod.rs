//! The four worker loops that move frames through the pipeline.
//!
//! Sender side: [`CapturePump`] → buffer → [`TransmitPump`] → socket.
//! Receiver side: socket → [`ReceivePump`] → buffer → [`PlaybackPump`].
//!
//! Each pump polls a shared stop flag between iterations and pairs
//! with exactly one other pump through a [`FrameBuffer`]; the buffer
//! lock is the only state they share.
//!
//! [`FrameBuffer`]: crate::buffer::FrameBuffer

pub mod capture;
pub mod playback;
pub mod receive;
pub mod transmit;

pub use capture::CapturePump;
pub use playback::PlaybackPump;
pub use receive::ReceivePump;
pub use transmit::TransmitPump;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Sleep while a paced loop has no work, short enough to stay
/// responsive to the stop flag.
pub(crate) const IDLE_POLL: Duration = Duration::from_millis(1);

/// Delay inserted after a transient receive failure.
pub(crate) const TRANSIENT_DELAY: Duration = Duration::from_millis(10);

/// Sleep for the remainder of the frame interval.
pub(crate) async fn pace(loop_start: Instant, interval: Duration) {
    let elapsed = loop_start.elapsed();
    if elapsed < interval {
        tokio::time::sleep(interval - elapsed).await;
    }
}

/// Resolves once `running` goes false (polled, cooperative).
pub(crate) async fn wait_for_stop(running: &Arc<AtomicBool>) {
    loop {
        if !running.load(Ordering::SeqCst) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pace_sleeps_the_remainder() {
        let interval = Duration::from_millis(50);
        let start = Instant::now();
        pace(start, interval).await;
        assert!(start.elapsed() >= interval);
    }

    #[tokio::test]
    async fn pace_is_instant_when_already_late() {
        let start = Instant::now() - Duration::from_millis(100);
        let before = Instant::now();
        pace(start, Duration::from_millis(50)).await;
        assert!(before.elapsed() < Duration::from_millis(20));
    }

    #[tokio::test]
    async fn wait_for_stop_returns_on_flag() {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(false, Ordering::SeqCst);
        });
        tokio::time::timeout(Duration::from_secs(2), wait_for_stop(&running))
            .await
            .expect("stop flag not observed");
    }
}
