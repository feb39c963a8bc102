use std::io::Write;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use batchio_frame::BytesFrame;
use bytes::Bytes;
use tracing::{debug, warn};

use crate::batch::{Batcher, DrainStatus};
use crate::error::{Result, WriteError};
use crate::outbound::{OutboundFrame, Wrote};

/// Default capacity of the submission channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// A cloneable handle feeding frames to a dedicated writer thread.
///
/// All handles share one bounded submission channel and one worker. The
/// worker blocks until at least one frame is queued, drains everything
/// already waiting, and puts the whole batch on the underlying stream with a
/// single write call. Frames go out in acceptance order; a flush boundary
/// never reorders them.
///
/// Dropping the last handle closes the channel; the worker flushes what it
/// accepted and exits in the background. [`close`](BatchedWriter::close)
/// does the same but blocks until the final flush happened and reports the
/// worker's terminal state.
#[derive(Clone)]
pub struct BatchedWriter {
    shared: Arc<Shared>,
}

struct Shared {
    frames: Mutex<Option<SyncSender<OutboundFrame>>>,
    worker: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl BatchedWriter {
    /// Spawn a worker over `writer` with the default channel capacity.
    pub fn spawn<W>(writer: W) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        Self::spawn_with_capacity(writer, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Spawn a worker with an explicit submission channel capacity.
    ///
    /// Capacity zero gives a rendezvous channel: every submission waits for
    /// the worker to take its frame.
    pub fn spawn_with_capacity<W>(writer: W, capacity: usize) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(capacity);
        let handle = thread::Builder::new()
            .name("batchio-writer".into())
            .spawn(move || run_worker(writer, rx))
            .map_err(|err| WriteError::Spawn(Arc::new(err)))?;
        Ok(Self {
            shared: Arc::new(Shared {
                frames: Mutex::new(Some(tx)),
                worker: Mutex::new(Some(handle)),
            }),
        })
    }

    /// Queue a frame for the next batch.
    ///
    /// Blocks while the submission channel is full. Fails with
    /// [`WriteError::Closed`] once the writer is closed or its worker has
    /// stopped.
    pub fn submit(&self, frame: OutboundFrame) -> Result<()> {
        let sender = {
            let guard = lock(&self.shared.frames);
            match guard.as_ref() {
                Some(sender) => sender.clone(),
                None => return Err(WriteError::Closed),
            }
        };
        // Send outside the lock so a full channel cannot stall `close`.
        sender.send(frame).map_err(|_| WriteError::Closed)
    }

    /// Write `bytes` as one frame and wait for its outcome.
    ///
    /// Suspends the caller until the batch containing the frame has been
    /// written or has failed. Every failure mode, including a closed writer
    /// and a worker that died mid-flight, is reported inside the returned
    /// [`Wrote`].
    pub fn write(&self, bytes: impl Into<Bytes>) -> Wrote {
        let (tx, rx) = mpsc::channel();
        let frame = OutboundFrame::with_notify(BytesFrame::new(bytes), tx);
        if let Err(err) = self.submit(frame) {
            return Wrote::failed(0, err);
        }
        // A dying worker drops our sender along with the queued frame.
        rx.recv()
            .unwrap_or_else(|_| Wrote::failed(0, WriteError::Closed))
    }

    /// Whether the writer has stopped accepting frames.
    ///
    /// True after [`close`](BatchedWriter::close) and also once the worker
    /// has stopped on its own after a stream error.
    pub fn is_closed(&self) -> bool {
        if lock(&self.shared.frames).is_none() {
            return true;
        }
        match lock(&self.shared.worker).as_ref() {
            Some(handle) => handle.is_finished(),
            None => true,
        }
    }

    /// Stop accepting frames, wait for the final flush, and return the
    /// worker's terminal state.
    ///
    /// Frames accepted before the close are still written. Closing again,
    /// from this or any cloned handle, returns `Ok` without further effect.
    pub fn close(&self) -> Result<()> {
        drop(lock(&self.shared.frames).take());
        let handle = lock(&self.shared.worker).take();
        match handle {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => Err(WriteError::WorkerPanicked),
            },
            None => Ok(()),
        }
    }
}

impl Write for BatchedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let wrote = BatchedWriter::write(self, Bytes::copy_from_slice(buf));
        match wrote.error {
            None => Ok(wrote.written),
            // Partial progress must surface as a count per the trait
            // contract; the error resurfaces on the next call.
            Some(_) if wrote.written > 0 => Ok(wrote.written),
            Some(err) => Err(std::io::Error::other(err)),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        // A zero-length frame acts as a barrier: once its outcome arrives,
        // everything submitted before it has been written.
        let wrote = BatchedWriter::write(self, Bytes::new());
        match wrote.error {
            None => Ok(()),
            Some(err) => Err(std::io::Error::other(err)),
        }
    }
}

fn run_worker<W: Write>(writer: W, frames: Receiver<OutboundFrame>) -> Result<()> {
    let mut batcher = Batcher::new(writer);
    loop {
        match batcher.consume(&frames, None) {
            Ok(DrainStatus::Open) => {}
            Ok(DrainStatus::Disconnected) => {
                debug!("submission channel closed, writer worker done");
                return Ok(());
            }
            Err(err) => {
                warn!(error = %err, "writer worker stopping after failed flush");
                return Err(err);
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[derive(Clone, Default)]
    struct SharedWriter {
        state: Arc<Mutex<SharedState>>,
        delay: Option<Duration>,
        cap: Option<usize>,
    }

    #[derive(Default)]
    struct SharedState {
        data: Vec<u8>,
        writes: usize,
    }

    impl SharedWriter {
        fn new() -> Self {
            Self::default()
        }

        fn with_cap(cap: usize) -> Self {
            Self {
                cap: Some(cap),
                ..Self::default()
            }
        }

        fn with_delay(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }

        fn snapshot(&self) -> (Vec<u8>, usize) {
            let state = self.state.lock().unwrap();
            (state.data.clone(), state.writes)
        }
    }

    impl Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Some(delay) = self.delay {
                thread::sleep(delay);
            }
            let mut state = self.state.lock().unwrap();
            state.writes += 1;
            let room = match self.cap {
                Some(cap) => cap.saturating_sub(state.data.len()),
                None => buf.len(),
            };
            let n = buf.len().min(room);
            state.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_roundtrip() {
        let shared = SharedWriter::new();
        let writer = BatchedWriter::spawn(shared.clone()).unwrap();

        let wrote = writer.write("hello");
        assert!(wrote.is_complete());
        assert_eq!(wrote.written, 5);

        writer.close().unwrap();
        assert_eq!(shared.snapshot().0, b"hello");
    }

    #[test]
    fn write_after_close_fails_fast() {
        let writer = BatchedWriter::spawn(SharedWriter::new()).unwrap();
        writer.close().unwrap();

        let wrote = writer.write("x");
        assert_eq!(wrote.written, 0);
        assert!(matches!(wrote.error, Some(WriteError::Closed)));

        assert!(matches!(
            writer.submit(OutboundFrame::new(BytesFrame::new("x"))),
            Err(WriteError::Closed)
        ));
    }

    #[test]
    fn close_is_idempotent_across_handles() {
        let writer = BatchedWriter::spawn(SharedWriter::new()).unwrap();
        let clone = writer.clone();

        writer.close().unwrap();
        writer.close().unwrap();
        clone.close().unwrap();

        assert!(writer.is_closed());
        assert!(clone.is_closed());
    }

    #[test]
    fn worker_error_surfaces_on_close() {
        let writer = BatchedWriter::spawn(SharedWriter::with_cap(2)).unwrap();

        let wrote = writer.write("test");
        assert_eq!(wrote.written, 2);
        assert!(matches!(
            wrote.error,
            Some(WriteError::Short {
                written: 2,
                expected: 4
            })
        ));

        // The stream error killed the worker; later writes fail fast.
        let after = writer.write("more");
        assert_eq!(after.written, 0);
        assert!(matches!(after.error, Some(WriteError::Closed)));

        // The dead worker shows up as closed once its thread has wound down.
        for _ in 0..100 {
            if writer.is_closed() {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert!(writer.is_closed());

        assert!(matches!(writer.close(), Err(WriteError::Short { .. })));
    }

    #[test]
    fn submit_is_fire_and_forget() {
        let shared = SharedWriter::new();
        let writer = BatchedWriter::spawn(shared.clone()).unwrap();

        writer
            .submit(OutboundFrame::new(BytesFrame::new("quiet")))
            .unwrap();
        writer.close().unwrap();

        assert_eq!(shared.snapshot().0, b"quiet");
    }

    #[test]
    fn dropped_handles_still_flush() {
        let shared = SharedWriter::new();
        let writer = BatchedWriter::spawn(shared.clone()).unwrap();

        let (tx, rx) = mpsc::channel();
        writer
            .submit(OutboundFrame::with_notify(BytesFrame::new("tail"), tx))
            .unwrap();
        drop(writer);

        let wrote = rx.recv().unwrap();
        assert!(wrote.is_complete());
        assert_eq!(wrote.written, 4);
        assert_eq!(shared.snapshot().0, b"tail");
    }

    #[test]
    fn concurrent_writes_coalesce_into_fewer_stream_writes() {
        let shared = SharedWriter::with_delay(Duration::from_millis(20));
        let writer = BatchedWriter::spawn(shared.clone()).unwrap();

        let threads: Vec<_> = (0..16u8)
            .map(|i| {
                let writer = writer.clone();
                thread::spawn(move || writer.write(vec![i; 4]))
            })
            .collect();

        for handle in threads {
            let wrote = handle.join().unwrap();
            assert!(wrote.is_complete());
            assert_eq!(wrote.written, 4);
        }
        writer.close().unwrap();

        let (data, writes) = shared.snapshot();
        assert_eq!(data.len(), 64);
        assert!(writes < 16, "expected coalescing, got {writes} stream writes");

        // Each frame lands contiguously, whatever the interleaving was.
        for i in 0..16u8 {
            let pos = data.iter().position(|&b| b == i).unwrap();
            assert_eq!(&data[pos..pos + 4], &[i; 4]);
        }
    }

    #[test]
    fn rendezvous_channel_works() {
        let shared = SharedWriter::new();
        let writer = BatchedWriter::spawn_with_capacity(shared.clone(), 0).unwrap();

        let wrote = writer.write("ping");
        assert!(wrote.is_complete());

        writer.close().unwrap();
        assert_eq!(shared.snapshot().0, b"ping");
    }

    #[test]
    fn io_write_flush_is_a_barrier() {
        let shared = SharedWriter::new();
        let mut writer = BatchedWriter::spawn(shared.clone()).unwrap();

        writer
            .submit(OutboundFrame::new(BytesFrame::new("one")))
            .unwrap();
        writer
            .submit(OutboundFrame::new(BytesFrame::new("two")))
            .unwrap();
        Write::flush(&mut writer).unwrap();

        // The barrier outcome proves everything before it hit the stream.
        assert_eq!(shared.snapshot().0, b"onetwo");

        writer.write_all(b"three").unwrap();
        writer.close().unwrap();
        assert_eq!(shared.snapshot().0, b"onetwothree");
    }

    #[test]
    fn io_flush_after_close_errors() {
        let mut writer = BatchedWriter::spawn(SharedWriter::new()).unwrap();
        writer.close().unwrap();

        assert!(Write::flush(&mut writer).is_err());
        assert!(Write::write(&mut writer, b"x").is_err());
    }
}
