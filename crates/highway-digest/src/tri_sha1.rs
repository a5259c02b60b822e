/// Partial-file fingerprint ("tri-SHA1").
///
/// Small files are hashed whole. From 30 MiB up only three 10 MiB windows
/// are hashed: head, middle and tail. The file size is appended as a
/// little-endian u64 before finalizing.
///
/// ```text
/// size < 30 MiB:  [0 ................................ size)
/// size >= 30 MiB: [0, 10M) .. [size/2 - 5M, size/2 + 5M) .. [size - 10M, size)
/// ```

use std::ops::Range;

use sha1::{Digest, Sha1};

use crate::error::DigestError;

const MIB: u64 = 1024 * 1024;

/// Files below this size are hashed in full.
pub const FULL_HASH_LIMIT: u64 = 30 * MIB;

/// Length of each window for large files.
pub const WINDOW_SIZE: u64 = 10 * MIB;

/// Compute the hashed windows for a file of `file_size` bytes.
pub fn fingerprint_windows(file_size: u64) -> Vec<Range<u64>> {
    if file_size < FULL_HASH_LIMIT {
        return vec![0..file_size];
    }
    let half = file_size >> 1;
    let half_window = WINDOW_SIZE / 2;
    vec![
        0..WINDOW_SIZE,
        half - half_window..half + half_window,
        file_size - WINDOW_SIZE..file_size,
    ]
}

/// Streaming fingerprint over the windows of one file.
///
/// Input must cover `[0, file_size)` exactly once, in order.
pub struct TriSha1 {
    hasher: Sha1,
    offset: u64,
    file_size: u64,
    windows: Vec<Range<u64>>,
}

impl TriSha1 {
    pub fn new(file_size: u64) -> Self {
        Self {
            hasher: Sha1::new(),
            offset: 0,
            file_size,
            windows: fingerprint_windows(file_size),
        }
    }

    pub fn windows(&self) -> &[Range<u64>] {
        &self.windows
    }

    /// Next offset the fingerprint expects.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Feed the next sequential range of the file.
    pub fn update(&mut self, data: &[u8]) -> Result<(), DigestError> {
        let start = self.offset;
        let end = start + data.len() as u64;
        if end > self.file_size {
            return Err(DigestError::Overrun {
                file_size: self.file_size,
                end,
            });
        }

        for window in &self.windows {
            let from = start.max(window.start);
            let to = end.min(window.end);
            if from < to {
                self.hasher
                    .update(&data[(from - start) as usize..(to - start) as usize]);
            }
        }

        self.offset = end;
        Ok(())
    }

    /// Feed a range that claims to start at `offset`; rejects gaps and overlaps.
    pub fn update_at(&mut self, offset: u64, data: &[u8]) -> Result<(), DigestError> {
        if offset != self.offset {
            return Err(DigestError::OutOfOrder {
                expected: self.offset,
                actual: offset,
            });
        }
        self.update(data)
    }

    pub fn finalize(mut self) -> Result<[u8; 20], DigestError> {
        if self.offset != self.file_size {
            return Err(DigestError::Incomplete {
                fed: self.offset,
                file_size: self.file_size,
            });
        }
        self.hasher.update(self.file_size.to_le_bytes());
        Ok(self.hasher.finalize().into())
    }
}
