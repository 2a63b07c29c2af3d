//! Display sinks for the playback pump.
//!
//! Windowing is out of scope; the seam is a trait so a GUI can plug in
//! later. [`FileSink`] keeps the latest frame on disk as a poor man's
//! preview, [`NullSink`] discards frames (headless runs still count
//! them as displayed).

use std::path::PathBuf;

use crate::error::StreamError;
use crate::frame::DecodedFrame;

/// Consumer of decoded frames at the end of the pipeline. Sinks are
/// owned by pumps that run as spawned tasks, so they must be safe to
/// move and share across threads.
pub trait DisplaySink: Send + Sync {
    /// Present one frame. Errors are logged by the playback pump and
    /// do not stop playback.
    fn present(&mut self, frame: &DecodedFrame) -> Result<(), StreamError>;
}

// ── NullSink ─────────────────────────────────────────────────────

/// Discards every frame.
#[derive(Debug, Default)]
pub struct NullSink;

impl DisplaySink for NullSink {
    fn present(&mut self, _frame: &DecodedFrame) -> Result<(), StreamError> {
        Ok(())
    }
}

// ── FileSink ─────────────────────────────────────────────────────

/// Overwrites a single file with the most recent frame (JPEG).
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    quality: u8,
}

impl FileSink {
    pub fn new(path: PathBuf, quality: u8) -> Self {
        Self { path, quality }
    }
}

impl DisplaySink for FileSink {
    fn present(&mut self, frame: &DecodedFrame) -> Result<(), StreamError> {
        let encoded = crate::frame::EncodedFrame::from_image(&frame.image, self.quality)?;
        std::fs::write(&self.path, &encoded.payload)?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn sinks_move_and_share_across_tasks() {
        fn check<T: Send + Sync>() {}
        check::<NullSink>();
        check::<FileSink>();
        check::<Box<dyn DisplaySink>>();
    }

    #[test]
    fn null_sink_accepts_frames() {
        let mut sink = NullSink;
        let frame = DecodedFrame::new(RgbImage::new(4, 4));
        assert!(sink.present(&frame).is_ok());
    }

    #[test]
    fn file_sink_writes_latest_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preview.jpg");
        let mut sink = FileSink::new(path.clone(), 85);

        let frame = DecodedFrame::new(RgbImage::from_pixel(8, 8, image::Rgb([1, 2, 3])));
        sink.present(&frame).unwrap();
        let first_len = std::fs::metadata(&path).unwrap().len();
        assert!(first_len > 0);

        // Second present overwrites rather than appends.
        sink.present(&frame).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), first_len);
    }
}
