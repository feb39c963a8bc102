use batchio_writer::WriteError;

/// Errors raised while framing, deframing, or relaying multipart data.
#[derive(Debug, thiserror::Error)]
pub enum MultipartError {
    /// The stream ended cleanly on a frame boundary with no message open.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream ended inside a frame or an unfinished message.
    #[error("unexpected end of stream (incomplete frame or message)")]
    UnexpectedEnd,

    /// A zero length prefix; the flags byte makes one the minimum.
    #[error("invalid frame length 0")]
    InvalidLength,

    /// A frame declares a body larger than the configured cap.
    #[error("frame too large ({len} bytes, max {max})")]
    FrameTooLarge { len: u64, max: usize },

    /// Messages carry at least one part; an empty one has no wire form.
    #[error("message has no parts")]
    EmptyMessage,

    /// An I/O error occurred while reading framed data.
    #[error("multipart I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The batched writer refused or failed a send.
    #[error("write error: {0}")]
    Write(#[from] WriteError),
}

pub type Result<T> = std::result::Result<T, MultipartError>;
