//! Length-prefixed framing for the Quassel core protocol.
//!
//! Every frame on the wire is a 4-byte big-endian payload length followed by
//! exactly that many payload bytes. Each payload carries one encoded variant.
//!
//! Callers only ever see complete payloads; partial reads are buffered here.

pub mod codec;
pub mod error;
#[cfg(feature = "async")]
pub mod framed;
pub mod reader;

pub use codec::{decode_frame, encode_frame, FrameConfig, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
pub use error::{FrameError, Result};
#[cfg(feature = "async")]
pub use framed::FrameCodec;
pub use reader::FrameReader;
