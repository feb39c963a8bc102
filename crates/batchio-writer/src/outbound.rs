use std::fmt;
use std::sync::mpsc;

use batchio_frame::Frame;

use crate::error::{Result, WriteError};

/// Outcome of writing one frame, delivered at most once per frame.
#[derive(Debug, Clone)]
pub struct Wrote {
    /// Bytes of this frame that reached the underlying stream.
    pub written: usize,
    /// The batch error in effect when accounting reached this frame, if any.
    pub error: Option<WriteError>,
}

impl Wrote {
    /// A fully written frame.
    pub fn complete(written: usize) -> Self {
        Self {
            written,
            error: None,
        }
    }

    /// A frame cut off by a batch error after `written` bytes.
    pub fn failed(written: usize, error: WriteError) -> Self {
        Self {
            written,
            error: Some(error),
        }
    }

    /// Whether the frame was written in full.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Convert into a `Result`, keeping the byte count on success.
    pub fn into_result(self) -> Result<usize> {
        match self.error {
            None => Ok(self.written),
            Some(err) => Err(err),
        }
    }
}

/// A frame queued for batched writing, with an optional completion sink.
///
/// Frames without a sink are fire-and-forget: serialized and counted like
/// any other, but nobody is told how they fared.
pub struct OutboundFrame {
    pub(crate) frame: Box<dyn Frame + Send>,
    pub(crate) notify: Option<mpsc::Sender<Wrote>>,
}

impl OutboundFrame {
    /// Queue a frame without completion notification.
    pub fn new(frame: impl Frame + Send + 'static) -> Self {
        Self {
            frame: Box::new(frame),
            notify: None,
        }
    }

    /// Queue a frame whose outcome is reported to `notify`.
    pub fn with_notify(frame: impl Frame + Send + 'static, notify: mpsc::Sender<Wrote>) -> Self {
        Self {
            frame: Box::new(frame),
            notify: Some(notify),
        }
    }

    pub(crate) fn send_outcome(&self, wrote: Wrote) {
        if let Some(notify) = &self.notify {
            // The receiver may be gone; delivery is best-effort.
            let _ = notify.send(wrote);
        }
    }
}

impl fmt::Debug for OutboundFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundFrame")
            .field("len", &self.frame.len())
            .field("notify", &self.notify.is_some())
            .finish()
    }
}
