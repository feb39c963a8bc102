//! Coalescing demo — many producer threads, few underlying writes.
//!
//! Run with:
//!   cargo run -p batchio --example coalescing

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use batchio::writer::BatchedWriter;

/// Counts write calls and bytes while pretending to be a slow device.
struct SlowSink {
    writes: Arc<AtomicUsize>,
    bytes: Arc<AtomicUsize>,
}

impl Write for SlowSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        thread::sleep(Duration::from_millis(2));
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.bytes.fetch_add(buf.len(), Ordering::SeqCst);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    const PRODUCERS: usize = 8;
    const FRAMES_EACH: usize = 200;

    let writes = Arc::new(AtomicUsize::new(0));
    let bytes = Arc::new(AtomicUsize::new(0));
    let writer = BatchedWriter::spawn(SlowSink {
        writes: Arc::clone(&writes),
        bytes: Arc::clone(&bytes),
    })?;

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|id| {
            let writer = writer.clone();
            thread::spawn(move || {
                for seq in 0..FRAMES_EACH {
                    let wrote = writer.write(format!("producer {id} frame {seq}\n"));
                    assert!(wrote.is_complete());
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer should not panic");
    }
    writer.close()?;

    eprintln!(
        "{} frames from {PRODUCERS} threads reached the sink in {} writes ({} bytes)",
        PRODUCERS * FRAMES_EACH,
        writes.load(Ordering::SeqCst),
        bytes.load(Ordering::SeqCst),
    );
    Ok(())
}
