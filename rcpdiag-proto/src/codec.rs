//! Transport framing for the Unix-socket link.
//!
//! Each frame is: `[u32 big-endian length][frame bytes]`. The command
//! catalog itself has no length prefix; this layer only restores the frame
//! boundaries a stream socket does not preserve.

use std::io::{self, Read, Write};

use bytes::{Buf, BytesMut};

/// Largest frame a transport read returns.
pub const MAX_FRAME: usize = 4087;

/// Length of the frame header.
const HEADER: usize = 4;

/// Writes `frame` with its length header and flushes `w`.
pub fn write_frame<W: Write>(w: &mut W, frame: &[u8]) -> io::Result<()> {
    if frame.len() > MAX_FRAME {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "frame exceeds transport limit",
        ));
    }
    let len = u32::try_from(frame.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame exceeds u32::MAX"))?;
    let mut buf = Vec::with_capacity(HEADER + frame.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(frame);
    w.write_all(&buf)?;
    w.flush()
}

/// Reads one length-prefixed frame from a blocking reader.
pub fn read_frame(r: &mut impl Read) -> io::Result<Vec<u8>> {
    let mut header = [0u8; HEADER];
    r.read_exact(&mut header)?;
    let len = checked_len(header)?;
    let mut frame = vec![0u8; len];
    r.read_exact(&mut frame)?;
    Ok(frame)
}

/// Validates a frame header against [`MAX_FRAME`].
fn checked_len(header: [u8; HEADER]) -> io::Result<usize> {
    let len = u32::from_be_bytes(header) as usize;
    if len > MAX_FRAME {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "frame exceeds transport limit",
        ));
    }
    Ok(len)
}

/// Accumulates bytes from non-blocking reads and yields whole frames.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    /// Bytes received but not yet consumed as a frame.
    buf: BytesMut,
}

impl FrameBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(HEADER + MAX_FRAME),
        }
    }

    /// Appends received bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Pops the next complete frame, or `None` if more bytes are needed.
    pub fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        if self.buf.len() < HEADER {
            return Ok(None);
        }
        let len = checked_len([self.buf[0], self.buf[1], self.buf[2], self.buf[3]])?;
        if self.buf.len() < HEADER + len {
            return Ok(None);
        }
        self.buf.advance(HEADER);
        Ok(Some(self.buf.split_to(len).to_vec()))
    }

    /// Bytes buffered but not yet returned.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Discards buffered bytes.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Reads whatever `r` has ready into `frames`.
///
/// Returns `Ok(0)` on end of stream and propagates `WouldBlock` untouched so
/// callers can distinguish "nothing yet" from a closed peer.
pub fn fill_from<R: Read>(r: &mut R, frames: &mut FrameBuffer) -> io::Result<usize> {
    let mut chunk = [0u8; 512];
    let n = r.read(&mut chunk)?;
    frames.push(&chunk[..n]);
    Ok(n)
}
