//! Frame payload types moved through the pipeline.
//!
//! Frames are owned exclusively by whichever pump currently holds them
//! and move by value through the bounded buffers — never shared.
//! Compression is delegated to the `image` crate's JPEG codec.

use std::io::Cursor;
use std::time::Instant;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::error::StreamError;

// ── EncodedFrame ─────────────────────────────────────────────────

/// A JPEG-compressed frame ready for network transmission.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Compressed payload (JPEG).
    pub payload: Bytes,
    /// Logical capture time.
    pub captured_at: Instant,
}

impl EncodedFrame {
    pub fn new(payload: Bytes) -> Self {
        Self {
            payload,
            captured_at: Instant::now(),
        }
    }

    /// Compress an image at the given JPEG quality (1–100).
    pub fn from_image(image: &RgbImage, quality: u8) -> Result<Self, StreamError> {
        let mut out = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut out, quality);
        image
            .write_with_encoder(encoder)
            .map_err(|e| StreamError::Encoding(e.to_string()))?;
        Ok(Self::new(Bytes::from(out.into_inner())))
    }

    /// Decompress back into pixels. An undecodable payload is a
    /// [`StreamError::DecodeFailure`].
    pub fn decode(&self) -> Result<DecodedFrame, StreamError> {
        let image = image::load_from_memory(&self.payload)?;
        Ok(DecodedFrame::new(image.to_rgb8()))
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

// ── DecodedFrame ─────────────────────────────────────────────────

/// A decompressed frame ready for presentation.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Decoded pixel data.
    pub image: RgbImage,
    /// When the receive pump finished decoding it.
    pub received_at: Instant,
}

impl DecodedFrame {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            received_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

// ── Tests ────────────────────────────────────────────────────────
