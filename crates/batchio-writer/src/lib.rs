//! Batching write engine with per-frame completion accounting.
//!
//! Many producers hand frames to one worker; the worker coalesces everything
//! already queued into a single write on the underlying stream, then reports
//! back, frame by frame, how many bytes made it out and which error cut the
//! batch short.
//!
//! The pieces compose bottom-up:
//! - [`Batcher`] owns the serialize-then-write-once cycle.
//! - [`Batcher::consume`] drains a channel into one batch per wakeup.
//! - [`BatchedWriter`] runs that loop on a dedicated thread behind a
//!   cloneable handle.

pub mod batch;
pub mod error;
pub mod outbound;
pub mod writer;

pub use batch::{Batcher, DrainStatus};
pub use error::{Result, WriteError};
pub use outbound::{OutboundFrame, Wrote};
pub use writer::{BatchedWriter, DEFAULT_CHANNEL_CAPACITY};
