//! Upload error taxonomy. Every variant is terminal for the file in flight;
//! nothing in this crate retries.

use highway_digest::DigestError;
use highway_wire::{DecodeError, FrameError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    /// Socket or source-file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status} for chunk at offset {offset}")]
    HttpStatus {
        status: reqwest::StatusCode,
        offset: u64,
    },

    /// Non-zero error code in a Highway response head.
    #[error("server returned error code {code} at offset {offset}")]
    Server { code: u32, offset: u64 },

    /// Flash Transfer slice answered with something other than "success".
    #[error("slice at offset {start} rejected with status {status:?}")]
    Rejected { status: String, start: u64 },

    #[error("malformed frame: {0}")]
    Frame(FrameError),

    #[error("malformed message: {0}")]
    Decode(#[from] DecodeError),

    #[error("digest error: {0}")]
    Digest(#[from] DigestError),

    /// The transfer ended before the server acknowledged the whole file.
    #[error("upload ended with {acknowledged} of {total} bytes acknowledged")]
    Unacknowledged { acknowledged: u64, total: u64 },

    /// The source produced a different number of bytes than declared.
    #[error("source size mismatch: declared {declared}, read {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    /// Zero-length files are rejected up front.
    #[error("refusing to upload an empty file")]
    EmptyFile,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<FrameError> for UploadError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Io(io) => UploadError::Io(io),
            other => UploadError::Frame(other),
        }
    }
}

impl From<prost::DecodeError> for UploadError {
    fn from(e: prost::DecodeError) -> Self {
        UploadError::Decode(DecodeError::Protobuf(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_io_errors_surface_as_io() {
        let e: UploadError =
            FrameError::Io(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")).into();
        assert!(matches!(e, UploadError::Io(_)));

        let e: UploadError = FrameError::TooLarge(1).into();
        assert!(matches!(e, UploadError::Frame(FrameError::TooLarge(1))));
    }

    #[test]
    fn test_protobuf_errors_surface_as_decode() {
        use prost::Message;

        let e: UploadError = highway_wire::RespDataHighwayHead::decode(&[0x1A, 0x05][..])
            .unwrap_err()
            .into();
        assert!(matches!(e, UploadError::Decode(DecodeError::Protobuf(_))));
    }

    #[test]
    fn test_messages_carry_offsets() {
        let e = UploadError::Server {
            code: 81,
            offset: 1_048_576,
        };
        assert_eq!(e.to_string(), "server returned error code 81 at offset 1048576");
    }
}
