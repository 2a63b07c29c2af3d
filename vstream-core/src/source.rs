//! Frame sources for the capture pump.
//!
//! A [`FrameSource`] hands out raw frames at its native rate and can be
//! rewound when exhausted — the pipeline is built for continuous
//! streaming of a looping source. Two implementations:
//!
//! - [`PatternSource`]: synthetic moving gradient, runs without any
//!   media on disk.
//! - [`ImageDirSource`]: cycles the JPEG files of a directory in
//!   sorted order, standing in for a looping video file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::RgbImage;

use crate::error::StreamError;

/// Supplier of raw frames for the capture pump.
#[async_trait]
pub trait FrameSource: Send {
    /// The next raw frame, or [`StreamError::SourceExhausted`] at
    /// end-of-stream.
    async fn next_frame(&mut self) -> Result<RgbImage, StreamError>;

    /// Seek back to the first frame (loop playback).
    fn rewind(&mut self);

    /// Native frame rate; caps the capture read rate.
    fn native_fps(&self) -> f64;

    /// Source resolution before any rescale.
    fn dimensions(&self) -> (u32, u32);
}

// ── PatternSource ────────────────────────────────────────────────

/// Synthetic moving-gradient source. Infinite by default; an optional
/// loop length makes it exhaust so rewind handling can be exercised.
pub struct PatternSource {
    width: u32,
    height: u32,
    fps: f64,
    frame_index: u64,
    loop_len: Option<u64>,
}

impl PatternSource {
    pub fn new(width: u32, height: u32, fps: f64) -> Self {
        Self {
            width,
            height,
            fps,
            frame_index: 0,
            loop_len: None,
        }
    }

    /// Exhaust after `frames` frames instead of running forever.
    pub fn with_loop_len(mut self, frames: u64) -> Self {
        self.loop_len = Some(frames);
        self
    }
}

#[async_trait]
impl FrameSource for PatternSource {
    async fn next_frame(&mut self) -> Result<RgbImage, StreamError> {
        if let Some(len) = self.loop_len {
            if self.frame_index >= len {
                return Err(StreamError::SourceExhausted);
            }
        }
        let t = self.frame_index as u32;
        let image = RgbImage::from_fn(self.width, self.height, |x, y| {
            image::Rgb([
                ((x + t * 3) % 256) as u8,
                ((y + t * 2) % 256) as u8,
                ((x + y + t) % 256) as u8,
            ])
        });
        self.frame_index += 1;
        Ok(image)
    }

    fn rewind(&mut self) {
        self.frame_index = 0;
    }

    fn native_fps(&self) -> f64 {
        self.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

// ── ImageDirSource ───────────────────────────────────────────────

/// Plays the JPEG files of a directory in sorted order, looping when
/// told to rewind.
pub struct ImageDirSource {
    files: Vec<PathBuf>,
    index: usize,
    fps: f64,
    width: u32,
    height: u32,
}

impl ImageDirSource {
    /// Scan `dir` for `.jpg`/`.jpeg` files. The first frame is decoded
    /// up front to learn the source resolution.
    pub async fn open(dir: &Path, fps: f64) -> Result<Self, StreamError> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_jpeg = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
            if is_jpeg {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(StreamError::Other(format!(
                "no jpeg frames in {}",
                dir.display()
            )));
        }

        let first = Self::load(&files[0]).await?;
        Ok(Self {
            width: first.width(),
            height: first.height(),
            files,
            index: 0,
            fps,
        })
    }

    async fn load(path: &Path) -> Result<RgbImage, StreamError> {
        let bytes = tokio::fs::read(path).await?;
        let image = image::load_from_memory(&bytes)?;
        Ok(image.to_rgb8())
    }

    /// Number of frames in one loop.
    pub fn frame_count(&self) -> usize {
        self.files.len()
    }
}

#[async_trait]
impl FrameSource for ImageDirSource {
    async fn next_frame(&mut self) -> Result<RgbImage, StreamError> {
        if self.index >= self.files.len() {
            return Err(StreamError::SourceExhausted);
        }
        let frame = Self::load(&self.files[self.index]).await?;
        self.index += 1;
        Ok(frame)
    }

    fn rewind(&mut self) {
        self.index = 0;
    }

    fn native_fps(&self) -> f64 {
        self.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

// ── Tests ────────────────────────────────────────────────────────
