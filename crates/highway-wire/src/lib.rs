/// Highway wire formats.
///
/// - Frame envelope (`0x28 | head len | body len | head | body | 0x29`) plus
///   a `tokio_util` codec for stream transports
/// - Highway request/response heads and Flash Transfer messages, as
///   `prost` messages

pub mod error;
pub mod flash;
pub mod frame;
pub mod highway;

pub use error::{DecodeError, FrameError};
pub use flash::{FlashTransferUploadReq, FlashTransferUploadResp, FlashUploadBody, Sha1StateV};
pub use frame::{
    decode_frame, encode_frame, encode_frame_into, Frame, HighwayCodec, FRAME_END, FRAME_OVERHEAD,
    FRAME_START, MAX_FRAME_SIZE,
};
pub use highway::{DataHighwayHead, LoginSigHead, ReqDataHighwayHead, RespDataHighwayHead, SegHead};
pub use prost::Message;
