use bytes::{Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// A finite sequence of bytes whose length is known before the bytes are
/// produced.
///
/// Implementations may hold their bytes in memory ([`BytesFrame`]) or produce
/// them on demand, directly into a batch buffer shared with other frames.
pub trait Frame {
    /// The exact number of bytes [`encode`](Frame::encode) appends.
    ///
    /// Zero is valid. Batch buffers rely on this value for per-frame write
    /// accounting and treat a mismatch with the produced byte count as a
    /// programming error.
    fn len(&self) -> usize;

    /// Whether the frame encodes to zero bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append exactly [`len`](Frame::len) bytes to `dst`.
    fn encode(&self, dst: &mut BytesMut) -> Result<()>;

    /// Write the frame into the start of `buf`, returning the byte count.
    ///
    /// Fails with [`FrameError::BufferTooSmall`] when `buf` cannot hold the
    /// whole frame; `buf` is left untouched in that case.
    fn read_into(&self, buf: &mut [u8]) -> Result<usize> {
        let needed = self.len();
        if buf.len() < needed {
            return Err(FrameError::BufferTooSmall {
                needed,
                available: buf.len(),
            });
        }
        let mut staged = BytesMut::with_capacity(needed);
        self.encode(&mut staged)?;
        buf[..needed].copy_from_slice(&staged);
        Ok(needed)
    }
}

/// A frame backed by an in-memory byte buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BytesFrame(Bytes);

impl BytesFrame {
    /// Create a frame from anything convertible to [`Bytes`].
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// The underlying bytes.
    pub fn as_bytes(&self) -> &Bytes {
        &self.0
    }

    /// Consume the frame, returning the underlying bytes.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl Frame for BytesFrame {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        dst.extend_from_slice(&self.0);
        Ok(())
    }

    fn read_into(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < self.0.len() {
            return Err(FrameError::BufferTooSmall {
                needed: self.0.len(),
                available: buf.len(),
            });
        }
        buf[..self.0.len()].copy_from_slice(&self.0);
        Ok(self.0.len())
    }
}
