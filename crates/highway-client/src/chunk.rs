//! Chunk layout shared by both upload protocols.

use bytes::Bytes;
use serde::Serialize;

/// Largest Highway chunk and the Flash Transfer slice size.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// One chunk of the file, as announced in a request head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    pub offset: u64,
    pub length: u32,
    pub md5: [u8; 16],
}

impl ChunkDescriptor {
    pub fn of(offset: u64, data: &[u8]) -> Self {
        Self {
            offset,
            length: data.len() as u32,
            md5: highway_digest::md5(data),
        }
    }

    pub fn end(&self) -> u64 {
        self.offset + self.length as u64
    }
}

/// Number of `chunk_size` chunks needed to cover `file_size` bytes.
pub fn chunk_count(file_size: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    file_size.div_ceil(chunk_size)
}

/// Re-split an arbitrary read buffer into pieces of at most `max` bytes.
/// The pieces share the buffer's storage.
pub fn split_blocks(buf: Bytes, max: usize) -> impl Iterator<Item = Bytes> {
    let max = max.max(1);
    let len = buf.len();
    (0..len).step_by(max).map(move |start| buf.slice(start..(start + max).min(len)))
}

/// Outcome of a finished upload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub chunks: u32,
    pub bytes_sent: u64,
    pub bytes_acknowledged: u64,
    pub duration_ms: u64,
}
