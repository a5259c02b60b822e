/// Flash Transfer slice upload.
///
/// Two passes over the file:
///
/// 1. Build the cumulative digest vector. Entry `i` is the SHA-1 state after
///    hashing the first `(i + 1) * chunk_size` bytes, taken as a
///    little-endian snapshot; the last entry is the finalized whole-file
///    SHA-1 instead.
/// 2. POST each slice in order, every request carrying the full vector,
///    the slice's own SHA-1, and its inclusive byte range.
///
/// Any status other than "success" aborts the upload.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use highway_digest::{read_chunk, sha1, sha1_file, DigestError, Endian, Sha1Stream, READ_BUF_SIZE};
use highway_wire::{FlashTransferUploadReq, FlashTransferUploadResp, FlashUploadBody, Message, Sha1StateV};
use reqwest::header::{ACCEPT, CONNECTION};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use crate::chunk::{chunk_count, UploadReport, CHUNK_SIZE};
use crate::error::UploadError;
use crate::logging::{TracingLogger, TransferEvent, TransferLog, TransferLogger};

pub const FLASH_ENDPOINT: &str = "https://multimedia.qfile.qq.com/sliceupload";

const COMPONENT: &str = "flash-transfer";

pub struct FlashTransferUploader {
    client: reqwest::Client,
    endpoint: String,
    chunk_size: u64,
    logger: Arc<dyn TransferLogger>,
}

impl Default for FlashTransferUploader {
    fn default() -> Self {
        Self::new()
    }
}

impl FlashTransferUploader {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: FLASH_ENDPOINT.to_owned(),
            chunk_size: CHUNK_SIZE as u64,
            logger: Arc::new(TracingLogger),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn TransferLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    fn log(&self, transfer_id: &str, event: TransferEvent) {
        self.logger.log(TransferLog {
            component: COMPONENT,
            transfer_id: transfer_id.to_owned(),
            event,
        });
    }

    /// Upload the file at `path` under `ukey`.
    pub async fn upload_file(
        &self,
        ukey: &str,
        app_id: u32,
        path: impl AsRef<Path>,
    ) -> Result<UploadReport, UploadError> {
        let path = path.as_ref();
        // Stays empty until the whole-file SHA-1 is known.
        let mut transfer_id = String::new();
        let result = self.run(ukey, app_id, path, &mut transfer_id).await;
        if let Err(e) = &result {
            self.log(&transfer_id, TransferEvent::Error { message: e.to_string() });
        }
        result
    }

    async fn run(
        &self,
        ukey: &str,
        app_id: u32,
        path: &Path,
        transfer_id: &mut String,
    ) -> Result<UploadReport, UploadError> {
        let file_size = tokio::fs::metadata(path).await?.len();
        if file_size == 0 {
            return Err(UploadError::EmptyFile);
        }
        let started = Instant::now();

        let vector = build_digest_vector(path, file_size, self.chunk_size).await?;
        if let Some(whole) = vector.last() {
            *transfer_id = hex::encode(whole);
        }
        let transfer_id = transfer_id.as_str();
        self.log(transfer_id, TransferEvent::DigestVectorBuilt {
            entries: vector.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        });
        let sha1_state = Sha1StateV {
            state: vector.iter().map(|d| Bytes::copy_from_slice(d)).collect(),
        };

        let mut file = File::open(path).await?;
        let mut buf = vec![0u8; self.chunk_size as usize];
        let mut chunks = 0u32;
        let mut start = 0u64;

        while start < file_size {
            let len = self.chunk_size.min(file_size - start) as usize;
            file.read_exact(&mut buf[..len]).await?;
            let slice = &buf[..len];

            self.log(transfer_id, TransferEvent::ChunkSent {
                offset: start,
                length: len as u32,
            });
            let req = FlashTransferUploadReq {
                tag1: FlashTransferUploadReq::TAG1,
                app_id,
                tag3: FlashTransferUploadReq::TAG3,
                body: Some(FlashUploadBody {
                    reserved: Bytes::new(),
                    ukey: ukey.to_owned(),
                    start,
                    end: start + len as u64 - 1,
                    sha1: Bytes::copy_from_slice(&sha1(slice)),
                    sha1_state: Some(sha1_state.clone()),
                    body: Bytes::copy_from_slice(slice),
                }),
            };

            if let Err(e) = self.upload_slice(&req, start).await {
                if let UploadError::Rejected { status, .. } = &e {
                    self.log(transfer_id, TransferEvent::SliceRejected {
                        start,
                        status: status.clone(),
                    });
                }
                return Err(e);
            }

            self.log(transfer_id, TransferEvent::ChunkAcked {
                offset: start,
                length: len as u32,
                acknowledged: start + len as u64,
            });
            start += len as u64;
            chunks += 1;
        }

        let report = UploadReport {
            chunks,
            bytes_sent: file_size,
            bytes_acknowledged: file_size,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        self.log(transfer_id, TransferEvent::TransferComplete {
            total_bytes: file_size,
            chunks,
            duration_ms: report.duration_ms,
        });
        Ok(report)
    }

    async fn upload_slice(&self, req: &FlashTransferUploadReq, start: u64) -> Result<(), UploadError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "*/*")
            .header(CONNECTION, "Keep-Alive")
            .body(req.encode_to_vec())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::HttpStatus { status, offset: start });
        }

        let resp = FlashTransferUploadResp::decode(response.bytes().await?)?;
        if !resp.is_success() {
            return Err(UploadError::Rejected {
                status: resp.status,
                start,
            });
        }
        Ok(())
    }
}

/// Cumulative SHA-1 vector for `path`, one entry per `chunk_size` slice.
///
/// Every non-final entry re-reads the file prefix from offset 0 into a
/// fresh `Sha1Stream` through a bounded buffer, so memory stays flat at
/// the cost of O(n^2) reads. The final entry is the plain whole-file SHA-1.
pub async fn build_digest_vector(
    path: impl AsRef<Path>,
    file_size: u64,
    chunk_size: u64,
) -> Result<Vec<[u8; 20]>, UploadError> {
    if chunk_size == 0 {
        return Err(DigestError::ZeroChunkSize.into());
    }
    let path = path.as_ref();
    let count = chunk_count(file_size, chunk_size);
    let mut vector = Vec::with_capacity(count as usize);
    if count == 0 {
        return Ok(vector);
    }

    let mut file = File::open(path).await?;
    let mut buf = vec![0u8; READ_BUF_SIZE];

    for i in 0..count - 1 {
        let prefix_len = (i + 1) * chunk_size;
        file.seek(std::io::SeekFrom::Start(0)).await?;

        let mut stream = Sha1Stream::new();
        let mut prefix = (&mut file).take(prefix_len);
        loop {
            let n = read_chunk(&mut prefix, &mut buf).await?;
            if n == 0 {
                break;
            }
            stream.update(&buf[..n]);
        }
        if stream.len() != prefix_len {
            return Err(UploadError::SizeMismatch {
                declared: prefix_len,
                actual: stream.len(),
            });
        }
        vector.push(stream.digest(Endian::Little));
    }

    vector.push(sha1_file(path).await?);
    Ok(vector)
}
