//! Session-info handshake record.
//!
//! The first framed message on every connection is a [`SessionInfo`]
//! serialized as JSON — a self-describing, field-tagged record so the
//! two peers do not have to share a memory layout. It is created once
//! per connection by the sender and immutable afterwards.

use serde::{Deserialize, Serialize};

use crate::error::StreamError;

/// Stream parameters negotiated before any frames flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Frame width in pixels (after any capture-side rescale).
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Target playback frames per second.
    pub target_fps: f64,
    /// JPEG quality, 1–100.
    pub quality: u8,
}

impl SessionInfo {
    pub fn new(width: u32, height: u32, target_fps: f64, quality: u8) -> Self {
        Self {
            width,
            height,
            target_fps,
            quality,
        }
    }

    /// Check the record is usable before entering steady state.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.width == 0 || self.height == 0 {
            return Err(StreamError::HandshakeFailure(format!(
                "invalid resolution {}x{}",
                self.width, self.height
            )));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(StreamError::HandshakeFailure(format!(
                "quality {} out of range 1-100",
                self.quality
            )));
        }
        if !self.target_fps.is_finite() || self.target_fps <= 0.0 {
            return Err(StreamError::HandshakeFailure(format!(
                "invalid target fps {}",
                self.target_fps
            )));
        }
        Ok(())
    }

    /// Serialize for the handshake frame.
    pub fn to_bytes(&self) -> Result<Vec<u8>, StreamError> {
        serde_json::to_vec(self).map_err(|e| StreamError::Encoding(e.to_string()))
    }

    /// Parse a handshake frame. An unparseable or invalid record is a
    /// [`StreamError::HandshakeFailure`] — there is no fallback to
    /// default parameters.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StreamError> {
        let info: SessionInfo = serde_json::from_slice(bytes)?;
        info.validate()?;
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let info = SessionInfo::new(1280, 720, 29.97, 85);
        let bytes = info.to_bytes().unwrap();
        let parsed = SessionInfo::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, info);
    }

    #[test]
    fn json_is_field_tagged() {
        let info = SessionInfo::new(640, 480, 30.0, 90);
        let text = String::from_utf8(info.to_bytes().unwrap()).unwrap();
        assert!(text.contains("\"width\""));
        assert!(text.contains("\"target_fps\""));
    }

    #[test]
    fn rejects_garbage() {
        let err = SessionInfo::from_bytes(b"\x80\x04not json").unwrap_err();
        assert!(matches!(err, StreamError::HandshakeFailure(_)));
    }

    #[test]
    fn rejects_out_of_range_quality() {
        let info = SessionInfo::new(640, 480, 30.0, 0);
        assert!(info.validate().is_err());

        let bytes = serde_json::to_vec(&serde_json::json!({
            "width": 640, "height": 480, "target_fps": 30.0, "quality": 101
        }))
        .unwrap();
        assert!(SessionInfo::from_bytes(&bytes).is_err());
    }

    #[test]
    fn rejects_zero_resolution() {
        let info = SessionInfo::new(0, 480, 30.0, 90);
        assert!(matches!(
            info.validate(),
            Err(StreamError::HandshakeFailure(_))
        ));
    }
}
