use batchio_frame::Frame;
use bytes::{Bytes, BytesMut};

use crate::codec::{encode_frame, frame_wire_size, WireFrame};
use crate::error::{MultipartError, Result};

/// An ordered, non-empty sequence of body parts forming one logical message.
///
/// On the wire every part becomes one frame, with the continuation bit set
/// on all but the last. Emptiness has no wire form, so it cannot be
/// constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    parts: Vec<Bytes>,
}

impl Message {
    /// Create a single-part message.
    pub fn new(part: impl Into<Bytes>) -> Self {
        Self {
            parts: vec![part.into()],
        }
    }

    /// Build a message from a collection of parts.
    ///
    /// Fails with [`MultipartError::EmptyMessage`] when the collection is
    /// empty.
    pub fn from_parts<I, T>(parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        let parts: Vec<Bytes> = parts.into_iter().map(Into::into).collect();
        if parts.is_empty() {
            return Err(MultipartError::EmptyMessage);
        }
        Ok(Self { parts })
    }

    /// Append a part.
    pub fn push(&mut self, part: impl Into<Bytes>) {
        self.parts.push(part.into());
    }

    /// The body parts in order.
    pub fn parts(&self) -> &[Bytes] {
        &self.parts
    }

    /// Number of parts, always at least one.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Consume the message, returning its parts.
    pub fn into_parts(self) -> Vec<Bytes> {
        self.parts
    }

    /// Total bytes the message occupies on the wire.
    pub fn wire_size(&self) -> usize {
        self.parts.iter().map(|part| frame_wire_size(part.len())).sum()
    }
}

impl Frame for Message {
    fn len(&self) -> usize {
        self.wire_size()
    }

    fn encode(&self, dst: &mut BytesMut) -> batchio_frame::Result<()> {
        let last = self.parts.len() - 1;
        for (i, part) in self.parts.iter().enumerate() {
            encode_frame(&WireFrame::new(part.clone(), i < last), dst);
        }
        Ok(())
    }
}
