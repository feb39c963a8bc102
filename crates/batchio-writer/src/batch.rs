use std::io::{ErrorKind, Write};
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tracing::debug;

use crate::error::{Result, WriteError};
use crate::outbound::{OutboundFrame, Wrote};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Whether a drain cycle's input channel can still yield frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    /// Senders remain; further cycles may yield frames.
    Open,
    /// All senders are gone; the owning loop must stop.
    Disconnected,
}

/// Accumulates frames into one contiguous buffer and writes them out with a
/// single call, attributing the outcome byte-for-byte back to each frame.
///
/// The batcher is single-owner state: `&mut self` on every operation is what
/// keeps concurrent drains of one stream unrepresentable.
pub struct Batcher<W> {
    writer: W,
    pending: Vec<OutboundFrame>,
    offsets: Vec<usize>,
    raw: BytesMut,
}

impl<W: Write> Batcher<W> {
    /// Create an empty batcher over `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pending: Vec::new(),
            offsets: Vec::new(),
            raw: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Number of frames buffered for the next flush.
    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }

    /// Number of serialized bytes buffered for the next flush.
    pub fn buffered_bytes(&self) -> usize {
        self.raw.len()
    }

    /// Serialize `frame` into the batch without writing anything.
    ///
    /// The produced byte count must equal the frame's declared length; a
    /// mismatch panics. When the frame fails to produce its bytes, the
    /// partial bytes are rolled back, the frame's sink (if any) is told
    /// `Wrote::failed(0, ..)`, and the error is returned; frames delayed
    /// earlier stay buffered and the batcher remains usable.
    pub fn delay(&mut self, frame: OutboundFrame) -> Result<()> {
        let start = self.raw.len();
        let declared = frame.frame.len();
        match frame.frame.encode(&mut self.raw) {
            Ok(()) => {
                let produced = self.raw.len() - start;
                assert_eq!(
                    produced, declared,
                    "frame declared {declared} bytes but encoded {produced}"
                );
                self.offsets.push(self.raw.len());
                self.pending.push(frame);
                Ok(())
            }
            Err(err) => {
                self.raw.truncate(start);
                let err = WriteError::Frame(Arc::new(err));
                frame.send_outcome(Wrote::failed(0, err.clone()));
                Err(err)
            }
        }
    }

    /// Write the whole batch with one call on the underlying stream and
    /// deliver per-frame outcomes.
    ///
    /// A short count with no stream error is normalized to
    /// [`WriteError::Short`]. Against the accepted count `n`, a frame ending
    /// at cumulative offset `end` is complete when `end <= n` (zero-length
    /// frames at the cut line count as complete), the frame straddling `n`
    /// gets its prefix length plus the error, and frames past it get zero.
    /// Pending state is cleared before returning, success or not.
    pub fn flush(&mut self) -> Result<()> {
        let expected = self.raw.len();
        let (accepted, error) = loop {
            match self.writer.write(&self.raw) {
                Ok(n) if n >= expected => break (expected, None),
                Ok(n) => break (n, Some(WriteError::Short { written: n, expected })),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => break (0, Some(WriteError::Io(Arc::new(err)))),
            }
        };

        match &error {
            None => {
                let mut prev = 0usize;
                for (frame, &end) in self.pending.iter().zip(&self.offsets) {
                    frame.send_outcome(Wrote::complete(end - prev));
                    prev = end;
                }
            }
            Some(err) => {
                debug!(
                    error = %err,
                    accepted,
                    expected,
                    frames = self.pending.len(),
                    "batch write failed"
                );
                let mut prev = 0usize;
                for (frame, &end) in self.pending.iter().zip(&self.offsets) {
                    let outcome = if end <= accepted {
                        Wrote::complete(end - prev)
                    } else if prev <= accepted {
                        Wrote::failed(accepted - prev, err.clone())
                    } else {
                        Wrote::failed(0, err.clone())
                    };
                    frame.send_outcome(outcome);
                    prev = end;
                }
            }
        }

        self.pending.clear();
        self.offsets.clear();
        self.raw.clear();

        match error {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Run one accept-drain-flush cycle against `frames`.
    ///
    /// The first receive honors `initial_wait`: `None` blocks until a frame
    /// arrives or the channel disconnects, `Some(Duration::ZERO)` polls, any
    /// other duration waits at most that long. When nothing arrives in time
    /// the cycle is a no-op and nothing is flushed. Once a frame arrives,
    /// everything already queued is drained without further waiting, then
    /// the whole batch is flushed.
    ///
    /// A frame that fails to produce its bytes is reported only to its own
    /// sink and stops the drain early; the batch still flushes. A
    /// disconnected channel flushes whatever is buffered and reports
    /// [`DrainStatus::Disconnected`]; flush errors take precedence over the
    /// disconnect signal.
    pub fn consume(
        &mut self,
        frames: &Receiver<OutboundFrame>,
        initial_wait: Option<Duration>,
    ) -> Result<DrainStatus> {
        let mut status = DrainStatus::Open;

        let first = match initial_wait {
            None => match frames.recv() {
                Ok(frame) => Some(frame),
                Err(_) => {
                    status = DrainStatus::Disconnected;
                    None
                }
            },
            Some(wait) if wait.is_zero() => match frames.try_recv() {
                Ok(frame) => Some(frame),
                Err(TryRecvError::Empty) => return Ok(DrainStatus::Open),
                Err(TryRecvError::Disconnected) => {
                    status = DrainStatus::Disconnected;
                    None
                }
            },
            Some(wait) => match frames.recv_timeout(wait) {
                Ok(frame) => Some(frame),
                Err(RecvTimeoutError::Timeout) => return Ok(DrainStatus::Open),
                Err(RecvTimeoutError::Disconnected) => {
                    status = DrainStatus::Disconnected;
                    None
                }
            },
        };

        if let Some(first) = first {
            let mut delayed = self.delay(first);
            while delayed.is_ok() {
                match frames.try_recv() {
                    Ok(frame) => delayed = self.delay(frame),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        status = DrainStatus::Disconnected;
                        break;
                    }
                }
            }
        }

        self.flush()?;
        Ok(status)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consume the batcher and return the underlying stream.
    ///
    /// Frames delayed but not yet flushed are dropped.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
