/// Upload clients for Highway (TCP and HTTP) and Flash Transfer.
///
/// - `highway::TcpSession` / `highway::HttpSession`: framed chunk upload
/// - `flash::FlashTransferUploader`: slice upload with a cumulative digest vector
/// - `logging`: structured upload events

pub mod chunk;
pub mod config;
pub mod error;
pub mod flash;
pub mod highway;
pub mod logging;

pub use chunk::{chunk_count, ChunkDescriptor, UploadReport, CHUNK_SIZE};
pub use config::UploadConfig;
pub use error::UploadError;
pub use flash::{build_digest_vector, FlashTransferUploader, FLASH_ENDPOINT};
pub use highway::{
    build_request_head, ClosePolicy, HighwaySession, HighwayTrans, HttpSession, SessionState, TcpSession,
};
pub use logging::{MemoryLogger, NullLogger, TracingLogger, TransferEvent, TransferLog, TransferLogger};
