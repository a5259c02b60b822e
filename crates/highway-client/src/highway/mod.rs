/// Highway chunked upload.
///
/// A file goes up as a sequence of framed chunks. Each chunk carries a
/// `ReqDataHighwayHead` naming its offset, length, and MD5; the server
/// answers with a `RespDataHighwayHead` whose segment head acknowledges
/// a byte range. Two transports carry the same frames:
///
/// - `TcpSession`: one persistent connection, chunks pipelined
/// - `HttpSession`: one POST per chunk over a keep-alive client

pub mod http;
pub mod tcp;

use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;

use bytes::Bytes;
use highway_wire::{DataHighwayHead, LoginSigHead, Message, ReqDataHighwayHead, SegHead};
use tokio::io::AsyncRead;

use crate::chunk::{ChunkDescriptor, UploadReport};
use crate::error::UploadError;

pub use http::HttpSession;
pub use tcp::TcpSession;

/// Fixed values every request head carries.
pub const HEAD_VERSION: u32 = 1;
pub const HEAD_COMMAND: &str = "PicUp.DataUp";
pub const HEAD_APP_ID: u32 = 1_600_001_604;
pub const HEAD_DATA_FLAG: u32 = 16;
pub const LOGIN_SIG_TYPE: u32 = 8;

/// Parameters of one Highway transfer.
#[derive(Debug, Clone)]
pub struct HighwayTrans {
    pub uin: String,
    pub command_id: u32,
    pub file_size: u64,
    /// Whole-file MD5, sent in every segment head.
    pub file_md5: Bytes,
    pub ticket: Bytes,
    pub ext: Bytes,
    pub host: String,
    pub port: u16,
}

impl HighwayTrans {
    /// Label used in transfer logs.
    pub fn transfer_id(&self) -> String {
        hex::encode(&self.file_md5)
    }
}

/// Build the encoded request head for one chunk.
pub fn build_request_head(trans: &HighwayTrans, chunk: &ChunkDescriptor) -> Vec<u8> {
    ReqDataHighwayHead {
        base: Some(DataHighwayHead {
            version: HEAD_VERSION,
            uin: Some(trans.uin.clone()),
            command: Some(HEAD_COMMAND.to_owned()),
            seq: 0,
            retry_times: 0,
            app_id: HEAD_APP_ID,
            data_flag: HEAD_DATA_FLAG,
            command_id: trans.command_id,
            build_ver: None,
        }),
        seg: Some(SegHead {
            service_id: 0,
            filesize: trans.file_size,
            data_offset: chunk.offset,
            data_length: chunk.length,
            ret_code: None,
            service_ticket: trans.ticket.clone(),
            md5: Bytes::copy_from_slice(&chunk.md5),
            file_md5: trans.file_md5.clone(),
            cache_addr: 0,
            cache_port: 0,
        }),
        extend_info: trans.ext.clone(),
        timestamp: 0,
        login_sig: Some(LoginSigHead {
            login_sig_type: LOGIN_SIG_TYPE,
            login_sig: None,
            app_id: HEAD_APP_ID,
        }),
    }
    .encode_to_vec()
}

/// What a TCP session does when the server closes before acknowledging
/// the whole file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClosePolicy {
    /// Close ends the upload successfully.
    #[default]
    TreatAsSuccess,
    /// Close before full acknowledgement is `UploadError::Unacknowledged`.
    RequireAck,
}

impl FromStr for ClosePolicy {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" | "treat-as-success" => Ok(Self::TreatAsSuccess),
            "require-ack" | "strict" => Ok(Self::RequireAck),
            other => Err(UploadError::Config(format!("unknown close policy {:?}", other))),
        }
    }
}

/// Acknowledgement bookkeeping for one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub total_size: u64,
    pub acknowledged: u64,
}

impl SessionState {
    pub fn new(total_size: u64) -> Self {
        Self {
            total_size,
            acknowledged: 0,
        }
    }

    /// Record an acknowledged range end. The counter never moves backwards.
    pub fn acknowledge(&mut self, end: u64) {
        self.acknowledged = self.acknowledged.max(end);
    }

    pub fn is_complete(&self) -> bool {
        self.acknowledged >= self.total_size
    }
}

/// A transport that uploads one file's bytes as Highway chunks.
pub trait HighwaySession {
    /// Upload everything `source` yields. `source` must produce exactly the
    /// declared file size.
    fn upload<R>(&mut self, source: R) -> impl Future<Output = Result<UploadReport, UploadError>> + Send
    where
        R: AsyncRead + Unpin + Send;

    fn upload_file(&mut self, path: PathBuf) -> impl Future<Output = Result<UploadReport, UploadError>> + Send
    where
        Self: Send,
    {
        async move {
            let file = tokio::fs::File::open(&path).await?;
            self.upload(file).await
        }
    }
}
