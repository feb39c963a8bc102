//! Frame abstraction for length-declared, lazily encoded byte sequences.
//!
//! A [`Frame`] knows how many bytes it will produce before producing them.
//! That one property is what lets a batch buffer lay many frames into a
//! single contiguous write and still attribute the outcome byte-for-byte to
//! each frame afterwards.

pub mod error;
pub mod frame;

pub use error::{FrameError, Result};
pub use frame::{BytesFrame, Frame};
