//! Flash Transfer slice-upload request and response.

use bytes::Bytes;

/// Status string the service returns for an accepted slice.
pub const STATUS_SUCCESS: &str = "success";

/// Cumulative SHA-1 states, one per chunk.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Sha1StateV {
    #[prost(bytes = "bytes", repeated, tag = "1")]
    pub state: Vec<Bytes>,
}

/// Body of one slice upload.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct FlashUploadBody {
    #[prost(bytes = "bytes", tag = "1")]
    pub reserved: Bytes,
    #[prost(string, tag = "2")]
    pub ukey: String,
    #[prost(uint64, tag = "3")]
    pub start: u64,
    /// Inclusive end offset.
    #[prost(uint64, tag = "4")]
    pub end: u64,
    #[prost(bytes = "bytes", tag = "5")]
    pub sha1: Bytes,
    #[prost(message, optional, tag = "6")]
    pub sha1_state: Option<Sha1StateV>,
    #[prost(bytes = "bytes", tag = "7")]
    pub body: Bytes,
}

/// Outer slice-upload request. `tag1`/`tag3` are fixed by the service (0 and 2).
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct FlashTransferUploadReq {
    #[prost(uint32, tag = "1")]
    pub tag1: u32,
    #[prost(uint32, tag = "2")]
    pub app_id: u32,
    #[prost(uint32, tag = "3")]
    pub tag3: u32,
    #[prost(message, optional, tag = "107")]
    pub body: Option<FlashUploadBody>,
}

impl FlashTransferUploadReq {
    pub const TAG1: u32 = 0;
    pub const TAG3: u32 = 2;
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct FlashTransferUploadResp {
    #[prost(string, tag = "5")]
    pub status: String,
}

impl FlashTransferUploadResp {
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}
