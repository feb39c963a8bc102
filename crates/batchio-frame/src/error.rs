/// Errors raised while producing frame bytes.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The destination buffer cannot hold the whole frame.
    #[error("buffer too small ({available} bytes, frame needs {needed})")]
    BufferTooSmall { needed: usize, available: usize },

    /// The frame's producer failed to generate its bytes.
    #[error("frame production failed: {0}")]
    Produce(Box<dyn std::error::Error + Send + Sync>),
}

impl FrameError {
    /// Wrap an arbitrary producer failure.
    pub fn produce(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        FrameError::Produce(err.into())
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
