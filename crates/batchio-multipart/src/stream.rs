use std::io::{Read, Write};

use batchio_writer::{BatchedWriter, OutboundFrame, Wrote};
use bytes::Bytes;
use tracing::debug;

use crate::codec::WireFrame;
use crate::error::Result;
use crate::message::Message;
use crate::reader::MultipartReader;

/// A duplex frame stream: batched writes on one half, framed reads on the
/// other.
///
/// Sends go through a [`BatchedWriter`], so frames queued from any number of
/// threads share single stream writes. A frame or message is serialized as
/// one unit and never interleaves with other senders' bytes.
pub struct MultipartStream<R> {
    reader: MultipartReader<R>,
    writer: BatchedWriter,
}

impl<R: Read> MultipartStream<R> {
    /// Wrap the two halves of a stream.
    pub fn new<W>(read_half: R, write_half: W) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        Ok(Self {
            reader: MultipartReader::new(read_half),
            writer: BatchedWriter::spawn(write_half)?,
        })
    }

    /// Wrap the two halves with an explicit inbound body-size cap.
    pub fn with_max_body<W>(read_half: R, write_half: W, max_body: usize) -> Result<Self>
    where
        W: Write + Send + 'static,
    {
        Ok(Self {
            reader: MultipartReader::with_max_body(read_half, max_body),
            writer: BatchedWriter::spawn(write_half)?,
        })
    }

    /// Queue one frame for sending.
    pub fn send_frame(&self, frame: WireFrame) -> Result<()> {
        self.writer.submit(OutboundFrame::new(frame))?;
        Ok(())
    }

    /// Queue a whole message for sending.
    pub fn send_message(&self, message: Message) -> Result<()> {
        self.writer.submit(OutboundFrame::new(message))?;
        Ok(())
    }

    /// Write raw bytes through the batching writer, outside any framing,
    /// and wait for their outcome.
    pub fn write(&self, bytes: impl Into<Bytes>) -> Wrote {
        self.writer.write(bytes)
    }

    /// Read the next frame.
    pub fn read_frame(&mut self) -> Result<WireFrame> {
        self.reader.read_frame()
    }

    /// Read the next whole message.
    pub fn read_message(&mut self) -> Result<Message> {
        self.reader.read_message()
    }

    /// The sending handle; clone it to feed this stream from other threads.
    pub fn writer(&self) -> &BatchedWriter {
        &self.writer
    }

    /// The reading half.
    pub fn reader(&self) -> &MultipartReader<R> {
        &self.reader
    }

    /// Mutable access to the reading half.
    pub fn reader_mut(&mut self) -> &mut MultipartReader<R> {
        &mut self.reader
    }

    /// Close the sending half and return the reading half.
    ///
    /// Everything queued before the close is flushed to the stream first.
    /// The reader stays usable for draining whatever the peer still sends.
    pub fn close(self) -> Result<MultipartReader<R>> {
        self.writer.close()?;
        debug!("multipart stream write half closed");
        Ok(self.reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    mod unix {
        use std::io::Read;
        use std::os::unix::net::UnixStream;

        use super::super::*;
        use crate::error::MultipartError;

        fn pair() -> (MultipartStream<UnixStream>, UnixStream) {
            let (left, right) = UnixStream::pair().unwrap();
            let read_half = left.try_clone().unwrap();
            (MultipartStream::new(read_half, left).unwrap(), right)
        }

        #[test]
        fn frame_roundtrip() {
            let (stream, peer) = pair();
            let mut peer = MultipartReader::new(peer);

            stream.send_frame(WireFrame::new("hello", false)).unwrap();

            let frame = peer.read_frame().unwrap();
            assert_eq!(frame.body.as_ref(), b"hello");
            assert!(!frame.more());

            stream.close().unwrap();
        }

        #[test]
        fn message_roundtrip() {
            let (stream, peer) = pair();
            let mut peer = MultipartReader::new(peer);

            let message = Message::from_parts(["a", "bb", "ccc"]).unwrap();
            stream.send_message(message.clone()).unwrap();

            let received = peer.read_message().unwrap();
            assert_eq!(received, message);

            stream.close().unwrap();
        }

        #[test]
        fn raw_write_bypasses_framing() {
            let (stream, mut peer) = pair();

            let wrote = stream.write("raw-bytes");
            assert!(wrote.is_complete());
            assert_eq!(wrote.written, 9);

            let mut buf = [0u8; 9];
            peer.read_exact(&mut buf).unwrap();
            assert_eq!(&buf, b"raw-bytes");

            stream.close().unwrap();
        }

        #[test]
        fn close_flushes_queued_sends() {
            let (stream, peer) = pair();
            let mut peer = MultipartReader::new(peer);

            for i in 0..8u8 {
                stream
                    .send_frame(WireFrame::new(vec![i; 4], false))
                    .unwrap();
            }
            stream.close().unwrap();

            for i in 0..8u8 {
                let frame = peer.read_frame().unwrap();
                assert_eq!(frame.body.as_ref(), &[i; 4]);
            }

            // Closing the write half also ended the stream for the peer.
            assert!(matches!(
                peer.read_frame().unwrap_err(),
                MultipartError::ConnectionClosed
            ));
        }

        #[test]
        fn concurrent_senders_share_the_stream() {
            let (stream, peer) = pair();
            let mut peer = MultipartReader::new(peer);

            let threads: Vec<_> = (0..8u8)
                .map(|i| {
                    let writer = stream.writer().clone();
                    std::thread::spawn(move || {
                        writer
                            .submit(OutboundFrame::new(WireFrame::new(vec![i; 32], false)))
                            .unwrap();
                    })
                })
                .collect();
            for handle in threads {
                handle.join().unwrap();
            }
            stream.close().unwrap();

            let mut seen = Vec::new();
            for _ in 0..8 {
                let frame = peer.read_frame().unwrap();
                assert_eq!(frame.body.len(), 32);
                // Bodies arrive whole, never interleaved.
                assert!(frame.body.iter().all(|&b| b == frame.body[0]));
                seen.push(frame.body[0]);
            }
            seen.sort_unstable();
            assert_eq!(seen, (0..8u8).collect::<Vec<_>>());
        }

        #[test]
        fn reader_survives_close() {
            let (stream, peer) = pair();
            let peer_writer = BatchedWriter::spawn(peer.try_clone().unwrap()).unwrap();
            let mut peer_reader = MultipartReader::new(peer);

            stream.send_frame(WireFrame::new("ping", false)).unwrap();
            let mut reader = stream.close().unwrap();
            assert_eq!(peer_reader.read_frame().unwrap().body.as_ref(), b"ping");

            // The peer can still talk to our read half.
            peer_writer
                .submit(OutboundFrame::new(WireFrame::new("pong", false)))
                .unwrap();
            peer_writer.close().unwrap();
            assert_eq!(reader.read_frame().unwrap().body.as_ref(), b"pong");
        }
    }

    #[test]
    fn stream_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<MultipartStream<std::io::Empty>>();
    }
}
