/// Highway frame envelope.
///
/// ```text
/// [0]            0x28 start sentinel
/// [1..5]         head length (u32 BE)
/// [5..9]         body length (u32 BE)
/// [9..9+H]       head (protobuf)
/// [9+H..9+H+B]   body (raw chunk bytes)
/// [9+H+B]        0x29 end sentinel
/// ```
///
/// No escaping: the sentinels only serve as a sanity check, lengths do the
/// actual framing.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::error::FrameError;

/// Start sentinel.
pub const FRAME_START: u8 = 0x28;

/// End sentinel.
pub const FRAME_END: u8 = 0x29;

/// Sentinel plus the two length fields.
pub const FRAME_PREFIX: usize = 9;

/// Total envelope bytes around head and body.
pub const FRAME_OVERHEAD: usize = FRAME_PREFIX + 1;

/// Largest frame the stream decoder accepts (1 MiB chunk + head fits easily).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub head: Bytes,
    pub body: Bytes,
}

impl Frame {
    pub fn new(head: impl Into<Bytes>, body: impl Into<Bytes>) -> Self {
        Self {
            head: head.into(),
            body: body.into(),
        }
    }

    pub fn encoded_len(&self) -> usize {
        FRAME_OVERHEAD + self.head.len() + self.body.len()
    }
}

/// Append an encoded frame to `dst`.
pub fn encode_frame_into(dst: &mut BytesMut, head: &[u8], body: &[u8]) {
    dst.reserve(FRAME_OVERHEAD + head.len() + body.len());
    dst.put_u8(FRAME_START);
    dst.put_u32(head.len() as u32);
    dst.put_u32(body.len() as u32);
    dst.put_slice(head);
    dst.put_slice(body);
    dst.put_u8(FRAME_END);
}

/// Encode `head` and `body` into a standalone frame.
pub fn encode_frame(head: &[u8], body: &[u8]) -> Vec<u8> {
    let total = FRAME_OVERHEAD + head.len() + body.len();
    let mut buf = Vec::with_capacity(total);
    buf.push(FRAME_START);
    buf.extend_from_slice(&(head.len() as u32).to_be_bytes());
    buf.extend_from_slice(&(body.len() as u32).to_be_bytes());
    buf.extend_from_slice(head);
    buf.extend_from_slice(body);
    buf.push(FRAME_END);
    buf
}

/// Split a complete frame into `(head, body)`.
///
/// Sentinels are not checked. Lengths that run past the buffer are an error.
pub fn decode_frame(frame: &[u8]) -> Result<(&[u8], &[u8]), FrameError> {
    if frame.len() < FRAME_PREFIX {
        return Err(FrameError::Truncated {
            needed: FRAME_PREFIX,
            available: frame.len(),
        });
    }
    let head_len = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]) as usize;
    let body_len = u32::from_be_bytes([frame[5], frame[6], frame[7], frame[8]]) as usize;

    let head_end = FRAME_PREFIX.saturating_add(head_len);
    let body_end = head_end.saturating_add(body_len);
    if body_end > frame.len() {
        return Err(FrameError::Truncated {
            needed: body_end,
            available: frame.len(),
        });
    }
    Ok((&frame[FRAME_PREFIX..head_end], &frame[head_end..body_end]))
}

/// Stream codec for Highway frames over a byte stream (TCP).
///
/// Reads are not frame aligned, so the decoder buffers until a whole frame
/// is available and checks both sentinels.
#[derive(Debug, Clone)]
pub struct HighwayCodec {
    max_frame: usize,
}

impl HighwayCodec {
    pub fn new() -> Self {
        Self {
            max_frame: MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame(max_frame: usize) -> Self {
        Self { max_frame }
    }
}

impl Default for HighwayCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for HighwayCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if src.len() < FRAME_PREFIX {
            return Ok(None);
        }
        if src[0] != FRAME_START {
            return Err(FrameError::BadSentinel {
                found: src[0],
                position: "start",
            });
        }

        let head_len = u32::from_be_bytes([src[1], src[2], src[3], src[4]]) as usize;
        let body_len = u32::from_be_bytes([src[5], src[6], src[7], src[8]]) as usize;
        let total = FRAME_OVERHEAD
            .saturating_add(head_len)
            .saturating_add(body_len);
        if total > self.max_frame {
            return Err(FrameError::TooLarge(total));
        }
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut raw = src.split_to(total).freeze();
        if raw[total - 1] != FRAME_END {
            return Err(FrameError::BadSentinel {
                found: raw[total - 1],
                position: "end",
            });
        }
        raw.advance(FRAME_PREFIX);
        let head = raw.split_to(head_len);
        let body = raw.split_to(body_len);
        trace!(head_len, body_len, "frame decoded");
        Ok(Some(Frame { head, body }))
    }
}

impl Encoder<Frame> for HighwayCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        if item.encoded_len() > self.max_frame {
            return Err(FrameError::TooLarge(item.encoded_len()));
        }
        encode_frame_into(dst, &item.head, &item.body);
        Ok(())
    }
}
