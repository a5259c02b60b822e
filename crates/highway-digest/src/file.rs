//! Whole-file digest helpers. All reads go through a bounded buffer.

use std::path::Path;

use md5::{Digest, Md5};
use sha1::Sha1;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::DigestError;
use crate::sha1_stream::{Endian, Sha1Stream};
use crate::tri_sha1::TriSha1;

/// Read buffer size for file hashing.
pub const READ_BUF_SIZE: usize = 1024 * 1024;

/// Length of the head region covered by `md5_head_10m`.
pub const HEAD_MD5_LEN: usize = 10_002_432;

/// Fill `buf` from `reader` until it is full or EOF. Returns bytes read.
pub async fn read_chunk<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]).await? {
            0 => break,
            n => total += n,
        }
    }
    Ok(total)
}

async fn for_each_block<F>(path: &Path, mut f: F) -> Result<u64, DigestError>
where
    F: FnMut(&[u8]) -> Result<(), DigestError>,
{
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut total = 0u64;
    loop {
        let n = read_chunk(&mut file, &mut buf).await?;
        if n == 0 {
            break;
        }
        f(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}

pub async fn md5_file(path: impl AsRef<Path>) -> Result<[u8; 16], DigestError> {
    let mut hasher = Md5::new();
    for_each_block(path.as_ref(), |block| {
        hasher.update(block);
        Ok(())
    })
    .await?;
    Ok(hasher.finalize().into())
}

pub async fn sha1_file(path: impl AsRef<Path>) -> Result<[u8; 20], DigestError> {
    let mut hasher = Sha1::new();
    for_each_block(path.as_ref(), |block| {
        hasher.update(block);
        Ok(())
    })
    .await?;
    Ok(hasher.finalize().into())
}

/// MD5 over the first `HEAD_MD5_LEN` bytes (or the whole file if shorter).
pub async fn md5_head_10m(path: impl AsRef<Path>) -> Result<[u8; 16], DigestError> {
    let mut file = tokio::fs::File::open(path.as_ref()).await?;
    let mut buf = vec![0u8; HEAD_MD5_LEN];
    let n = read_chunk(&mut file, &mut buf).await?;
    Ok(Md5::digest(&buf[..n]).into())
}

/// Partial-file fingerprint of the file at `path`.
pub async fn tri_sha1_file(path: impl AsRef<Path>, file_size: u64) -> Result<[u8; 20], DigestError> {
    let mut fp = TriSha1::new(file_size);
    for_each_block(path.as_ref(), |block| fp.update(block)).await?;
    fp.finalize()
}

/// One-pass cumulative digest vector.
///
/// Entry `i` is the little-endian state snapshot after `(i + 1) * chunk_size`
/// bytes, except the last entry which is the finalized SHA-1 of the whole
/// file. Length is `ceil(size / chunk_size)`; an empty file yields an empty
/// vector.
pub async fn cumulative_digest_vector(
    path: impl AsRef<Path>,
    chunk_size: u64,
) -> Result<Vec<[u8; 20]>, DigestError> {
    if chunk_size == 0 {
        return Err(DigestError::ZeroChunkSize);
    }
    let path = path.as_ref();
    let size = tokio::fs::metadata(path).await?.len();

    let mut stream = Sha1Stream::new();
    let mut out = Vec::with_capacity(size.div_ceil(chunk_size) as usize);
    let mut next_boundary = chunk_size;
    let mut fed = 0u64;

    for_each_block(path, |mut block| {
        while !block.is_empty() {
            let take = ((next_boundary - fed) as usize).min(block.len());
            stream.update(&block[..take]);
            fed += take as u64;
            block = &block[take..];

            if fed == next_boundary && fed < size {
                out.push(stream.digest(Endian::Little));
                next_boundary += chunk_size;
            }
        }
        Ok(())
    })
    .await?;

    if fed != size {
        return Err(DigestError::Incomplete { fed, file_size: size });
    }
    if size > 0 {
        out.push(stream.finalize());
    }

    debug!(path = %path.display(), entries = out.len(), "cumulative digest vector built");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(data: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(data).unwrap();
        f.flush().unwrap();
        f
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_whole_file_digests() {
        let f = write_temp(b"abc");
        assert_eq!(
            hex::encode(sha1_file(f.path()).await.unwrap()),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            hex::encode(md5_file(f.path()).await.unwrap()),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert_eq!(
            md5_head_10m(f.path()).await.unwrap(),
            md5_file(f.path()).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_tri_sha1_file_matches_streaming() {
        let data = pattern(300_000);
        let f = write_temp(&data);
        let mut fp = TriSha1::new(data.len() as u64);
        fp.update(&data).unwrap();
        assert_eq!(
            tri_sha1_file(f.path(), data.len() as u64).await.unwrap(),
            fp.finalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_cumulative_vector_shape() {
        let chunk = 1024u64;
        let data = pattern(3 * chunk as usize + 10);
        let f = write_temp(&data);

        let vector = cumulative_digest_vector(f.path(), chunk).await.unwrap();
        assert_eq!(vector.len(), 4);
        assert_eq!(vector[3], crate::sha1(&data));

        for (i, entry) in vector[..3].iter().enumerate() {
            let mut s = Sha1Stream::new();
            s.update(&data[..(i + 1) * chunk as usize]);
            assert_eq!(*entry, s.digest(Endian::Little));
        }
    }

    #[tokio::test]
    async fn test_cumulative_vector_exact_multiple_and_empty() {
        let chunk = 4096u64;
        let data = pattern(2 * chunk as usize);
        let f = write_temp(&data);
        let vector = cumulative_digest_vector(f.path(), chunk).await.unwrap();
        assert_eq!(vector.len(), 2);
        assert_eq!(vector[1], crate::sha1(&data));

        let empty = write_temp(b"");
        assert!(cumulative_digest_vector(empty.path(), chunk).await.unwrap().is_empty());
        assert!(matches!(
            cumulative_digest_vector(empty.path(), 0).await,
            Err(DigestError::ZeroChunkSize)
        ));
    }
}
