use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};

use crate::codec::{decode_frame, WireFrame, DEFAULT_MAX_BODY};
use crate::error::{MultipartError, Result};
use crate::message::Message;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames and messages from any `Read` stream.
///
/// Partial reads are handled internally; callers always get whole frames.
pub struct MultipartReader<R> {
    inner: R,
    buf: BytesMut,
    max_body: usize,
}

impl<R: Read> MultipartReader<R> {
    /// Create a reader with the default body-size cap.
    pub fn new(inner: R) -> Self {
        Self::with_max_body(inner, DEFAULT_MAX_BODY)
    }

    /// Create a reader with an explicit body-size cap.
    pub fn with_max_body(inner: R, max_body: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_body,
        }
    }

    /// Read the next frame (blocking).
    ///
    /// A stream ending on a frame boundary yields
    /// [`MultipartError::ConnectionClosed`]; one ending inside a frame
    /// yields [`MultipartError::UnexpectedEnd`].
    pub fn read_frame(&mut self) -> Result<WireFrame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, self.max_body)? {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(MultipartError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    return Err(MultipartError::ConnectionClosed);
                }
                return Err(MultipartError::UnexpectedEnd);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read frames until one without the continuation bit and return the
    /// collected message (blocking).
    ///
    /// A clean end of stream before the first frame is
    /// [`MultipartError::ConnectionClosed`]; the stream ending anywhere
    /// inside an unfinished message is [`MultipartError::UnexpectedEnd`].
    pub fn read_message(&mut self) -> Result<Message> {
        let mut parts: Vec<Bytes> = Vec::new();
        loop {
            let frame = match self.read_frame() {
                Ok(frame) => frame,
                Err(MultipartError::ConnectionClosed) if !parts.is_empty() => {
                    return Err(MultipartError::UnexpectedEnd);
                }
                Err(err) => return Err(err),
            };
            let more = frame.more();
            parts.push(frame.body);
            if !more {
                return Message::from_parts(parts);
            }
        }
    }

    /// Update the body-size cap for subsequent frames.
    pub fn set_max_body(&mut self, max_body: usize) {
        self.max_body = max_body;
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    ///
    /// Bytes already pulled into the frame buffer stay there; reading from
    /// the stream directly skips past them.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}
