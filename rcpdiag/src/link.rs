//! Host transport contract and its Unix-socket implementation.

use std::io::{self, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};

use rcpdiag_proto::codec::{self, FrameBuffer};
use rcpdiag_proto::{EndpointId, EndpointState};
use tracing::debug;

/// The host-side link library an endpoint is opened through.
pub trait Link {
    /// Initializes the library (reaches the link daemon).
    fn init(&mut self) -> io::Result<()>;

    /// Opens `id` with a transmit window of `tx_window` frames.
    fn open_endpoint(&mut self, id: EndpointId, tx_window: u8) -> io::Result<()>;

    /// Writes one frame, blocking until it is handed to the link.
    fn write(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Copies the next whole frame into `buf` without blocking.
    ///
    /// Fails with [`io::ErrorKind::WouldBlock`] when nothing has arrived.
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Requests the endpoint be closed.
    fn close_endpoint(&mut self) -> io::Result<()>;

    /// Reports the state of endpoint `id`.
    fn endpoint_state(&mut self, id: EndpointId) -> io::Result<EndpointState>;
}

/// A [`Link`] to an `rcpdiag-agent` listening on a Unix socket.
#[derive(Debug)]
pub struct SocketLink {
    /// Agent socket path.
    path: PathBuf,
    /// Open endpoint connection.
    stream: Option<UnixStream>,
    /// Partial frames received so far.
    rx: FrameBuffer,
}

impl SocketLink {
    /// Creates a link to the agent socket at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            stream: None,
            rx: FrameBuffer::new(),
        }
    }

    fn stream(&mut self) -> io::Result<&mut UnixStream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "endpoint not open"))
    }
}

impl Link for SocketLink {
    fn init(&mut self) -> io::Result<()> {
        std::fs::metadata(&self.path).map(drop)
    }

    fn open_endpoint(&mut self, id: EndpointId, _tx_window: u8) -> io::Result<()> {
        let stream = UnixStream::connect(&self.path)?;
        debug!(%id, path = %self.path.display(), "endpoint open");
        self.stream = Some(stream);
        self.rx.clear();
        Ok(())
    }

    fn write(&mut self, frame: &[u8]) -> io::Result<()> {
        let stream = self.stream()?;
        stream.set_nonblocking(false)?;
        codec::write_frame(stream, frame)?;
        stream.flush()
    }

    fn read_nonblocking(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(frame) = self.rx.next_frame()? {
            return copy_frame(&frame, buf);
        }
        let stream = self.stream.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "endpoint not open")
        })?;
        stream.set_nonblocking(true)?;
        loop {
            match codec::fill_from(stream, &mut self.rx) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "agent closed the endpoint",
                    ));
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        match self.rx.next_frame()? {
            Some(frame) => copy_frame(&frame, buf),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    fn close_endpoint(&mut self) -> io::Result<()> {
        let Some(stream) = self.stream.take() else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "endpoint not open"));
        };
        self.rx.clear();
        match stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }

    fn endpoint_state(&mut self, _id: EndpointId) -> io::Result<EndpointState> {
        Ok(if self.stream.is_some() {
            EndpointState::Connected
        } else {
            EndpointState::Closed
        })
    }
}

/// Copies a received frame into the caller's buffer.
fn copy_frame(frame: &[u8], buf: &mut [u8]) -> io::Result<usize> {
    let dst = buf.get_mut(..frame.len()).ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "read buffer smaller than frame")
    })?;
    dst.copy_from_slice(frame);
    Ok(frame.len())
}
