//! Length-prefixed wire framing.
//!
//! Every message — the one-time session-info handshake and each frame
//! payload — is framed the same way:
//!
//! ```text
//! length:  u32  (4 bytes, big-endian)
//! payload: [u8] (length bytes, opaque)
//! ```
//!
//! There is no magic number or version field; the receiver knows the
//! first message on a connection is the handshake by position. The
//! decoder is fed by [`tokio_util::codec::Framed`], so a payload split
//! across any number of TCP segments reassembles identically.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::StreamError;

/// Length-prefix size on the wire.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Upper bound on a single framed payload. The original protocol had
/// no limit; this guard keeps a corrupted prefix from triggering an
/// unbounded allocation.
pub const MAX_FRAME_SIZE: usize = 32 * 1024 * 1024;

/// Codec for `[u32 BE length][payload]` frames.
#[derive(Debug, Default)]
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = StreamError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        prefix.copy_from_slice(&src[..LENGTH_PREFIX_SIZE]);
        let length = u32::from_be_bytes(prefix) as usize;

        if length > MAX_FRAME_SIZE {
            return Err(StreamError::FrameTooLarge {
                size: length,
                max: MAX_FRAME_SIZE,
            });
        }

        if src.len() < LENGTH_PREFIX_SIZE + length {
            // Not all bytes have arrived yet; reserve so the next read
            // can complete the frame in one pass.
            src.reserve(LENGTH_PREFIX_SIZE + length - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX_SIZE);
        let payload = src.split_to(length).freeze();
        Ok(Some(payload))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => {
                // Peer closed mid-frame.
                let needed = if src.len() >= LENGTH_PREFIX_SIZE {
                    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
                    prefix.copy_from_slice(&src[..LENGTH_PREFIX_SIZE]);
                    LENGTH_PREFIX_SIZE + u32::from_be_bytes(prefix) as usize
                } else {
                    LENGTH_PREFIX_SIZE
                };
                Err(StreamError::ShortRead {
                    needed,
                    got: src.len(),
                })
            }
        }
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = StreamError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > MAX_FRAME_SIZE {
            return Err(StreamError::FrameTooLarge {
                size: item.len(),
                max: MAX_FRAME_SIZE,
            });
        }
        dst.reserve(LENGTH_PREFIX_SIZE + item.len());
        dst.put_u32(item.len() as u32);
        dst.extend_from_slice(&item);
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
