/// Highway digest primitives.
///
/// - `Sha1Stream`: SHA-1 with non-destructive state snapshots
/// - `TriSha1`: head/middle/tail partial-file fingerprint
/// - Whole-file MD5/SHA-1 helpers and the cumulative digest vector

pub mod error;
pub mod file;
pub mod sha1_stream;
pub mod tri_sha1;

pub use error::DigestError;
pub use file::{
    cumulative_digest_vector, md5_file, md5_head_10m, read_chunk, sha1_file, tri_sha1_file,
    READ_BUF_SIZE,
};
pub use sha1_stream::{sha1, Endian, Sha1Stream, BLOCK_SIZE, DIGEST_SIZE};
pub use tri_sha1::{fingerprint_windows, TriSha1, FULL_HASH_LIMIT, WINDOW_SIZE};

/// MD5 of an in-memory block (per-chunk integrity in Highway heads).
pub fn md5(data: &[u8]) -> [u8; 16] {
    use md5::Digest;
    md5::Md5::digest(data).into()
}
