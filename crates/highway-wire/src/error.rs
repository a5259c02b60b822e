//! Error types for frame and message decoding.

use thiserror::Error;

/// Envelope-level failures.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Declared lengths point past the end of the buffer.
    #[error("truncated frame: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    /// Stream decoder found something other than the start sentinel.
    #[error("bad frame sentinel {found:#04x} at {position}")]
    BadSentinel { found: u8, position: &'static str },

    #[error("frame too large: {0} bytes")]
    TooLarge(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Message-level failures.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("protobuf decode error: {0}")]
    Protobuf(#[from] prost::DecodeError),

    /// A segment head whose `data_offset + data_length` does not fit in u64.
    #[error("segment range overflows: offset {offset} + length {length}")]
    RangeOverflow { offset: u64, length: u32 },
}
