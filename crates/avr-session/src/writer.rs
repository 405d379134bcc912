//! Command writer: serialized access to the shared write half.
//!
//! The lock is held for exactly one frame write. The protocol has no
//! correlated responses, so nothing else needs to be serialized.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::debug;

use avr_protocol::Command;

use crate::error::{Result, SessionError};

/// Type-erased write half of the transport.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Cheap-to-clone handle to the session's write half.
#[derive(Clone, Default)]
pub struct CommandWriter {
    transport: Arc<Mutex<Option<BoxedWriter>>>,
}

impl CommandWriter {
    /// Creates a writer with no transport attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a new write half, returning the previous one.
    pub async fn attach(&self, writer: BoxedWriter) -> Option<BoxedWriter> {
        self.transport.lock().await.replace(writer)
    }

    /// Removes the write half, returning it for closing.
    pub async fn detach(&self) -> Option<BoxedWriter> {
        self.transport.lock().await.take()
    }

    /// Returns true if a write half is installed.
    pub async fn is_attached(&self) -> bool {
        self.transport.lock().await.is_some()
    }

    /// Writes one command frame.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotConnected` if no transport is attached
    /// - `SessionError::Io` if the write fails; the session is left as is
    pub async fn send(&self, command: &Command) -> Result<()> {
        let frame = command.to_frame();

        let mut transport = self.transport.lock().await;
        let writer = transport.as_mut().ok_or(SessionError::NotConnected)?;

        debug!(
            code = command.code(),
            parameter = command.parameter(),
            "Sending command"
        );

        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{duplex, AsyncReadExt};

    /// Accepts at most two bytes per write and yields between writes,
    /// so unsynchronized writers would interleave.
    struct TrickleWriter {
        wire: Arc<parking_lot::Mutex<Vec<u8>>>,
        yield_next: bool,
    }

    impl AsyncWrite for TrickleWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            this.yield_next = !this.yield_next;
            if this.yield_next {
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
            let n = buf.len().min(2);
            this.wire.lock().extend_from_slice(&buf[..n]);
            Poll::Ready(Ok(n))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// Fails every write.
    struct BrokenWriter;

    impl AsyncWrite for BrokenWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "reset")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_send_without_transport_fails_fast() {
        let writer = CommandWriter::new();
        let result = writer.send(&Command::main_zone_on()).await;
        assert!(matches!(result, Err(SessionError::NotConnected)));
    }

    #[tokio::test]
    async fn test_send_writes_terminated_frame() {
        let (client, mut device) = duplex(64);
        let writer = CommandWriter::new();
        writer.attach(Box::new(client)).await;

        writer.send(&Command::mute(true)).await.unwrap();

        let mut buf = [0u8; 5];
        device.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"MUON\r");
    }

    #[tokio::test]
    async fn test_transport_error_is_returned_unwrapped() {
        let writer = CommandWriter::new();
        writer.attach(Box::new(BrokenWriter)).await;

        let result = writer.send(&Command::volume_up()).await;

        match result {
            Err(SessionError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
            other => panic!("Expected Io error, got {other:?}"),
        }
        // A failed write does not detach the transport
        assert!(writer.is_attached().await);
    }

    #[tokio::test]
    async fn test_detach_returns_transport() {
        let (client, _device) = duplex(64);
        let writer = CommandWriter::new();
        assert!(writer.attach(Box::new(client)).await.is_none());
        assert!(writer.detach().await.is_some());
        assert!(!writer.is_attached().await);
        assert!(writer.detach().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sends_never_interleave() {
        let wire = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let writer = CommandWriter::new();
        writer
            .attach(Box::new(TrickleWriter {
                wire: Arc::clone(&wire),
                yield_next: false,
            }))
            .await;

        let commands = [
            Command::main_zone_on(),
            Command::volume_down(),
            Command::cursor(avr_protocol::CursorControl::Menu),
            Command::sound_mode("DOLBY DIGITAL").unwrap(),
        ];

        let mut tasks = Vec::new();
        for command in commands.iter().cloned() {
            let writer = writer.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..25 {
                    writer.send(&command).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let wire = wire.lock().clone();
        let text = String::from_utf8(wire).unwrap();
        let frames: Vec<&str> = text.split_terminator('\r').collect();
        let expected: Vec<String> = commands.iter().map(ToString::to_string).collect();

        assert_eq!(frames.len(), 100);
        for frame in &frames {
            assert!(
                expected.iter().any(|e| e == frame),
                "interleaved frame on the wire: {frame:?}"
            );
        }
        for command in &expected {
            assert_eq!(frames.iter().filter(|f| *f == command).count(), 25);
        }
    }
}
