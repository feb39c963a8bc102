use batchio_frame::Frame;
use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{MultipartError, Result};

/// Continuation bit: the message carries on with another frame.
pub const MORE: u8 = 0x01;

/// Length-prefix escape byte selecting the eight-byte form.
pub const ESCAPE: u8 = 0xFF;

/// Default maximum body size accepted by the decoder: 16 MiB.
pub const DEFAULT_MAX_BODY: usize = 16 * 1024 * 1024;

const SHORT_HEADER: usize = 2;
const ESCAPED_HEADER: usize = 10;

/// One wire frame: a flags byte and a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame {
    /// Flag bits; only [`MORE`] is assigned, the rest travel untouched.
    pub flags: u8,
    /// The frame body.
    pub body: Bytes,
}

impl WireFrame {
    /// Create a frame, setting the continuation bit from `more`.
    pub fn new(body: impl Into<Bytes>, more: bool) -> Self {
        Self {
            flags: if more { MORE } else { 0 },
            body: body.into(),
        }
    }

    /// Whether the message this frame belongs to continues after it.
    pub fn more(&self) -> bool {
        self.flags & MORE != 0
    }

    /// The exact number of bytes [`encode_frame`] emits for this frame.
    pub fn wire_size(&self) -> usize {
        frame_wire_size(self.body.len())
    }
}

impl Frame for WireFrame {
    fn len(&self) -> usize {
        self.wire_size()
    }

    fn encode(&self, dst: &mut BytesMut) -> batchio_frame::Result<()> {
        encode_frame(self, dst);
        Ok(())
    }
}

/// The encoded size of a frame carrying `body_len` body bytes.
///
/// The length field counts the flags byte, so bodies up to 253 bytes fit the
/// one-byte prefix; longer ones take the escaped nine-byte prefix.
pub fn frame_wire_size(body_len: usize) -> usize {
    if body_len < ESCAPE as usize - 1 {
        SHORT_HEADER + body_len
    } else {
        ESCAPED_HEADER + body_len
    }
}

/// Append `frame` to `dst` in wire form.
///
/// Wire format, with the length field counting the flags byte:
/// ```text
/// short:   [ length (1B, < 0xFF) ][ flags (1B) ][ body ]
/// escaped: [ 0xFF ][ length (8B big-endian) ][ flags (1B) ][ body ]
/// ```
pub fn encode_frame(frame: &WireFrame, dst: &mut BytesMut) {
    let length = frame.body.len() as u64 + 1;
    dst.reserve(frame.wire_size());
    if length < ESCAPE as u64 {
        dst.put_u8(length as u8);
    } else {
        dst.put_u8(ESCAPE);
        dst.put_u64(length);
    }
    dst.put_u8(frame.flags);
    dst.put_slice(&frame.body);
}

/// Decode one frame from `src`.
///
/// Returns `Ok(None)` until a complete frame is buffered; on success,
/// consumes exactly the frame's bytes. `max_body` bounds the declared body
/// size and is enforced before anything is allocated.
pub fn decode_frame(src: &mut BytesMut, max_body: usize) -> Result<Option<WireFrame>> {
    if src.is_empty() {
        return Ok(None);
    }

    let (prefix_len, length) = if src[0] == ESCAPE {
        if src.len() < 9 {
            return Ok(None); // Need more data
        }
        (9, u64::from_be_bytes(src[1..9].try_into().unwrap()))
    } else {
        (1, u64::from(src[0]))
    };

    if length == 0 {
        return Err(MultipartError::InvalidLength);
    }
    if length - 1 > max_body as u64 {
        return Err(MultipartError::FrameTooLarge {
            len: length - 1,
            max: max_body,
        });
    }
    let body_len = (length - 1) as usize;

    let total = prefix_len + 1 + body_len;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    src.advance(prefix_len);
    let flags = src[0];
    src.advance(1);
    let body = src.split_to(body_len).freeze();

    Ok(Some(WireFrame { flags, body }))
}
