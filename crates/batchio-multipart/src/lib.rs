//! Continuation-framed multipart wire codec over batched streams.
//!
//! Every frame on the wire is a variable-width length prefix, one flags
//! byte, and a body. The length counts the flags byte: values below 0xFF use
//! a single prefix byte, anything larger is escaped to an eight-byte
//! big-endian field. Bit 0 of the flags is the continuation marker that
//! groups frames into multi-part [`Message`]s.
//!
//! Sending goes through the batching writer, so frames queued from many
//! threads leave in single stream writes; reading pulls complete frames or
//! whole messages regardless of how the bytes arrive.

pub mod codec;
pub mod error;
pub mod message;
pub mod reader;
pub mod stream;

pub use codec::{
    decode_frame, encode_frame, frame_wire_size, WireFrame, DEFAULT_MAX_BODY, ESCAPE, MORE,
};
pub use error::{MultipartError, Result};
pub use message::Message;
pub use reader::MultipartReader;
pub use stream::MultipartStream;
