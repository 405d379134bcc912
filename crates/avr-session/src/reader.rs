//! Line reader: one carriage-return terminated frame per call.
//!
//! `read_frame` reads one frame and returns. The connection manager calls
//! it once per iteration inside `tokio::select!` so every read races the
//! shutdown token.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use avr_protocol::{FRAME_TERMINATOR, MAX_FRAME_LEN};

use crate::error::{LossReason, Result, SessionError};

/// Buffered frame reader over the receive half of the transport.
pub struct FrameReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
    limit: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Creates a reader with the default frame size limit.
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, MAX_FRAME_LEN)
    }

    /// Creates a reader that rejects frames longer than `limit` bytes.
    pub fn with_limit(reader: R, limit: usize) -> Self {
        Self {
            inner: BufReader::new(reader),
            buf: Vec::with_capacity(128),
            limit,
        }
    }

    /// Reads the next frame, trimmed of surrounding whitespace.
    ///
    /// Returned frames are never empty.
    ///
    /// # Errors
    ///
    /// Always `SessionError::ConnectionLost`, with reason:
    /// - `EndOfStream` if the receiver closed the connection
    /// - `EmptyFrame` if the frame was blank after trimming
    /// - `FrameTooLong` if no terminator arrived within the limit
    /// - `Read` for transport errors
    pub async fn read_frame(&mut self) -> Result<String> {
        self.buf.clear();

        // Bound the read so a missing terminator cannot grow the buffer forever
        let limit = u64::try_from(self.limit.saturating_add(1)).unwrap_or(u64::MAX);
        let read = (&mut self.inner)
            .take(limit)
            .read_until(FRAME_TERMINATOR, &mut self.buf)
            .await
            .map_err(|e| SessionError::lost(LossReason::Read(e)))?;

        if read == 0 {
            return Err(SessionError::lost(LossReason::EndOfStream));
        }

        if read > self.limit && self.buf.last() != Some(&FRAME_TERMINATOR) {
            return Err(SessionError::lost(LossReason::FrameTooLong { limit: self.limit }));
        }

        let frame = String::from_utf8_lossy(&self.buf);
        let frame = frame.trim();

        if frame.is_empty() {
            return Err(SessionError::lost(LossReason::EmptyFrame));
        }

        Ok(frame.to_string())
    }
}
