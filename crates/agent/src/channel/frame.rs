//! Stream-frame codec for the daemon's multiplexed exec output.
//!
//! Every frame is an 8-byte header followed by its payload: byte 0 is the
//! originating stream (0 = stdin, 1 = stdout, 2 = stderr), bytes 1–3 are
//! reserved, bytes 4–7 carry the payload length as a big-endian u32.
//! This module is the only place that knows the header layout.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

pub const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(StreamKind::Stdin),
            1 => Some(StreamKind::Stdout),
            2 => Some(StreamKind::Stderr),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            StreamKind::Stdin => 0,
            StreamKind::Stdout => 1,
            StreamKind::Stderr => 2,
        }
    }
}

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("unknown stream discriminant {0:#04x}")]
    UnknownStream(u8),
    #[error("stream ended with {0} undelivered trailing byte(s)")]
    Truncated(usize),
}

/// Encode one payload as a wire frame.
pub fn encode(kind: StreamKind, payload: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(HEADER_LEN + payload.len());
    frame.put_u8(kind.as_byte());
    frame.put_bytes(0, 3);
    frame.put_u32(payload.len() as u32);
    frame.put_slice(payload);
    frame.freeze()
}

/// Incremental demultiplexer that keeps stdout payloads only.
///
/// Frames may arrive split across chunks or several to a chunk; `push`
/// consumes whatever is complete and buffers the rest.
#[derive(Debug, Default)]
pub struct StdoutCollector {
    buf: BytesMut,
    stdout: Vec<u8>,
}

impl StdoutCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<(), FrameError> {
        self.buf.extend_from_slice(chunk);

        loop {
            if self.buf.len() < HEADER_LEN {
                return Ok(());
            }

            let kind = StreamKind::from_byte(self.buf[0])
                .ok_or(FrameError::UnknownStream(self.buf[0]))?;
            let len = u32::from_be_bytes([self.buf[4], self.buf[5], self.buf[6], self.buf[7]])
                as usize;

            if self.buf.len() < HEADER_LEN + len {
                return Ok(());
            }

            let frame = self.buf.split_to(HEADER_LEN + len);
            if kind == StreamKind::Stdout {
                self.stdout.extend_from_slice(&frame[HEADER_LEN..]);
            }
        }
    }

    /// Finish the stream and hand back the concatenated stdout payloads.
    pub fn finish(self) -> Result<Vec<u8>, FrameError> {
        if !self.buf.is_empty() {
            return Err(FrameError::Truncated(self.buf.len()));
        }
        Ok(self.stdout)
    }
}
