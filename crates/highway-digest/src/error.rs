//! Error types for digest and fingerprint computation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestError {
    /// A range was fed somewhere other than the next expected offset.
    #[error("fingerprint input out of order: expected offset {expected}, got {actual}")]
    OutOfOrder { expected: u64, actual: u64 },

    /// More bytes were fed than the declared file size.
    #[error("fingerprint input overruns file size {file_size} (fed up to {end})")]
    Overrun { file_size: u64, end: u64 },

    /// `finalize` was called before the whole file was fed.
    #[error("fingerprint incomplete: fed {fed} of {file_size} bytes")]
    Incomplete { fed: u64, file_size: u64 },

    /// A chunk size of zero cannot partition a file.
    #[error("chunk size must be non-zero")]
    ZeroChunkSize,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
