//! Highway request/response heads.
//!
//! Sizes and offsets are u64 here; on the wire they are varints, so values
//! below 4 GiB are identical to a uint32 field.

use bytes::Bytes;

use crate::error::DecodeError;

/// Base head shared by requests and responses.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct DataHighwayHead {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(string, optional, tag = "2")]
    pub uin: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub command: Option<String>,
    #[prost(uint32, tag = "4")]
    pub seq: u32,
    #[prost(uint32, tag = "5")]
    pub retry_times: u32,
    #[prost(uint32, tag = "6")]
    pub app_id: u32,
    #[prost(uint32, tag = "7")]
    pub data_flag: u32,
    #[prost(uint32, tag = "8")]
    pub command_id: u32,
    #[prost(bytes = "bytes", optional, tag = "9")]
    pub build_ver: Option<Bytes>,
}

/// Segment head: where this chunk sits in the file and what it hashes to.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct SegHead {
    #[prost(uint32, tag = "1")]
    pub service_id: u32,
    #[prost(uint64, tag = "2")]
    pub filesize: u64,
    #[prost(uint64, tag = "3")]
    pub data_offset: u64,
    #[prost(uint32, tag = "4")]
    pub data_length: u32,
    #[prost(uint32, optional, tag = "5")]
    pub ret_code: Option<u32>,
    #[prost(bytes = "bytes", tag = "6")]
    pub service_ticket: Bytes,
    #[prost(bytes = "bytes", tag = "8")]
    pub md5: Bytes,
    #[prost(bytes = "bytes", tag = "9")]
    pub file_md5: Bytes,
    #[prost(uint32, tag = "10")]
    pub cache_addr: u32,
    #[prost(uint32, tag = "13")]
    pub cache_port: u32,
}

impl SegHead {
    /// End of the acknowledged range (`data_offset + data_length`).
    ///
    /// Both values come from the server; a sum past `u64::MAX` is a
    /// malformed head.
    pub fn end(&self) -> Result<u64, DecodeError> {
        self.data_offset
            .checked_add(self.data_length as u64)
            .ok_or(DecodeError::RangeOverflow {
                offset: self.data_offset,
                length: self.data_length,
            })
    }
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct LoginSigHead {
    #[prost(uint32, tag = "1")]
    pub login_sig_type: u32,
    #[prost(bytes = "bytes", optional, tag = "2")]
    pub login_sig: Option<Bytes>,
    #[prost(uint32, tag = "3")]
    pub app_id: u32,
}

/// Head of every upload frame.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ReqDataHighwayHead {
    #[prost(message, optional, tag = "1")]
    pub base: Option<DataHighwayHead>,
    #[prost(message, optional, tag = "2")]
    pub seg: Option<SegHead>,
    #[prost(bytes = "bytes", tag = "3")]
    pub extend_info: Bytes,
    #[prost(uint32, tag = "4")]
    pub timestamp: u32,
    #[prost(message, optional, tag = "5")]
    pub login_sig: Option<LoginSigHead>,
}

/// Head of every server response frame.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct RespDataHighwayHead {
    #[prost(message, optional, tag = "1")]
    pub base: Option<DataHighwayHead>,
    #[prost(message, optional, tag = "2")]
    pub seg: Option<SegHead>,
    #[prost(uint32, tag = "3")]
    pub error_code: u32,
    #[prost(uint32, tag = "4")]
    pub allow_retry: u32,
    #[prost(uint32, tag = "5")]
    pub cache_cost: u32,
    #[prost(uint32, tag = "6")]
    pub ht_cost: u32,
    #[prost(bytes = "bytes", tag = "7")]
    pub extend_info: Bytes,
    #[prost(uint32, tag = "8")]
    pub timestamp: u32,
    #[prost(uint32, tag = "9")]
    pub range: u32,
    #[prost(uint32, tag = "10")]
    pub is_reset: u32,
}
