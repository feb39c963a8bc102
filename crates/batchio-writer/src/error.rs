use std::sync::Arc;

use batchio_frame::FrameError;

/// Errors raised by the batching engine and the batched writer.
///
/// Cloneable so one batch failure can fan out to every notification sink it
/// affected.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WriteError {
    /// The stream accepted only part of a batch without reporting an error.
    #[error("short write ({written} of {expected} bytes)")]
    Short { written: usize, expected: usize },

    /// The stream failed while a batch was being written.
    #[error("stream write failed: {0}")]
    Io(Arc<std::io::Error>),

    /// A frame failed to produce its bytes while being buffered.
    #[error("frame could not be buffered: {0}")]
    Frame(Arc<FrameError>),

    /// The writer no longer accepts frames.
    #[error("batched writer is closed")]
    Closed,

    /// The worker thread could not be spawned.
    #[error("failed to spawn writer worker: {0}")]
    Spawn(Arc<std::io::Error>),

    /// The worker thread panicked.
    #[error("writer worker panicked")]
    WorkerPanicked,
}

impl From<std::io::Error> for WriteError {
    fn from(err: std::io::Error) -> Self {
        WriteError::Io(Arc::new(err))
    }
}

impl From<FrameError> for WriteError {
    fn from(err: FrameError) -> Self {
        WriteError::Frame(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, WriteError>;
