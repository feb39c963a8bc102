//! Batched frame writing and multipart framing for byte streams.
//!
//! batchio coalesces frames submitted by any number of threads into as few
//! underlying stream writes as possible, reports back a per-frame byte
//! accounting even when a write lands short or fails mid-batch, and speaks a
//! continuation-framed wire format for multi-part messages on top.
//!
//! # Crate Structure
//!
//! - [`frame`] — The length-declared [`frame::Frame`] abstraction
//! - [`writer`] — Batch buffer, drain loop, and the threaded batched writer
//! - [`multipart`] — Wire frame codec, messages, and the duplex stream

/// Re-export frame types.
pub mod frame {
    pub use batchio_frame::*;
}

/// Re-export batching writer types.
pub mod writer {
    pub use batchio_writer::*;
}

/// Re-export multipart framing types.
pub mod multipart {
    pub use batchio_multipart::*;
}
