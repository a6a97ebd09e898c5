//! Unix-socket transport: the link is a listening socket, the peer is the
//! single accepted host connection.

use std::collections::VecDeque;
use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use rcpdiag_proto::codec::{self, FrameBuffer};
use rcpdiag_proto::{EndpointId, EndpointState, Status};
use tracing::{debug, trace, warn};

use super::{Event, Notification, Transport};
use crate::TransportError;

/// Agent-side endpoint backed by a Unix stream socket.
///
/// The socket stays bound across endpoint open/close cycles; only an open
/// endpoint accepts a host. All socket I/O is non-blocking:
/// [`Transport::poll_event`] accepts the peer, reads what has arrived and
/// queues at most `window` received frames at a time.
#[derive(Debug)]
pub struct SocketTransport {
    /// Filesystem path of the listening socket.
    path: PathBuf,
    /// Listening socket, bound at first open and kept for the transport's
    /// lifetime so hosts arriving while the endpoint is recycled queue up.
    listener: Option<UnixListener>,
    /// Whether the endpoint is currently open.
    endpoint_open: bool,
    /// Attached host connection.
    peer: Option<UnixStream>,
    /// Partial frames read from the peer.
    rx: FrameBuffer,
    /// Identity given at open time.
    id: EndpointId,
    /// Receive window given at open time.
    window: usize,
    state: EndpointState,
    /// Notification kinds the agent asked for.
    registered: Vec<Notification>,
    /// Pending notifications, oldest first.
    events: VecDeque<Event>,
}

impl SocketTransport {
    /// Creates a closed transport that will listen on `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            listener: None,
            endpoint_open: false,
            peer: None,
            rx: FrameBuffer::new(),
            id: rcpdiag_proto::USER_ENDPOINT,
            window: 1,
            state: EndpointState::Freed,
            registered: Vec::new(),
            events: VecDeque::new(),
        }
    }

    /// Socket path hosts connect to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queues `event` if its kind is registered.
    fn emit(&mut self, event: Event) {
        if self.registered.contains(&event.kind()) {
            self.events.push_back(event);
        } else {
            trace!(?event, "dropping unregistered notification");
        }
    }

    /// Marks the endpoint faulted with `state` and raises an error event.
    fn fault(&mut self, state: EndpointState) {
        self.state = state;
        self.peer = None;
        self.rx.clear();
        self.emit(Event::Error(self.id));
    }

    /// Accepts a waiting peer, if any.
    fn accept(&mut self) {
        let Some(listener) = &self.listener else {
            return;
        };
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(e) = stream.set_nonblocking(true) {
                    warn!("peer socket setup failed: {e}");
                    return;
                }
                debug!(path = %self.path.display(), "peer attached");
                self.peer = Some(stream);
                self.state = EndpointState::Connected;
                self.emit(Event::Connected(self.id));
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            // Retried on the next poll.
            Err(e) => warn!("accept failed: {e}"),
        }
    }

    /// Reads everything the peer has sent and queues whole frames.
    ///
    /// A hang-up is reported only once every whole frame read before it has
    /// been queued.
    fn receive(&mut self) {
        let Some(peer) = self.peer.as_mut() else {
            return;
        };
        let mut hung_up = false;
        loop {
            match codec::fill_from(peer, &mut self.rx) {
                Ok(0) => {
                    debug!(buffered = self.rx.buffered_len(), "peer hung up");
                    hung_up = true;
                    break;
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!("read failed: {e}");
                    hung_up = true;
                    break;
                }
            }
        }
        let mut drained = false;
        while self.events.len() < self.window {
            match self.rx.next_frame() {
                Ok(Some(frame)) => self.emit(Event::Received(frame)),
                Ok(None) => {
                    drained = true;
                    break;
                }
                Err(e) => {
                    // The peer is dropped, so the agent must recycle.
                    warn!("malformed frame from peer: {e}");
                    return self.fault(EndpointState::DestinationUnreachable);
                }
            }
        }
        // EOF repeats, so frames left behind by the window are picked up on
        // the next poll before the fault.
        if hung_up && drained {
            self.fault(EndpointState::DestinationUnreachable);
        }
    }
}

impl Transport for SocketTransport {
    fn open_endpoint(
        &mut self,
        id: EndpointId,
        _flags: u8,
        window: u8,
    ) -> Result<(), TransportError> {
        if self.endpoint_open {
            return Err(TransportError::AlreadyExists);
        }
        if self.listener.is_none() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => debug!(path = %self.path.display(), "removed stale socket"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            let listener = UnixListener::bind(&self.path)?;
            listener.set_nonblocking(true)?;
            self.listener = Some(listener);
        }
        self.endpoint_open = true;
        self.id = id;
        self.window = usize::from(window.max(1));
        self.state = EndpointState::Open;
        Ok(())
    }

    fn register(&mut self, notification: Notification) -> Result<(), TransportError> {
        if !self.endpoint_open {
            return Err(TransportError::NotOpen);
        }
        if !self.registered.contains(&notification) {
            self.registered.push(notification);
        }
        Ok(())
    }

    fn write(&mut self, frame: &[u8], _flags: u8) -> Result<(), TransportError> {
        let peer = self.peer.as_mut().ok_or(TransportError::NotConnected)?;
        let status = match codec::write_frame(peer, frame) {
            Ok(()) => Status::OK,
            Err(e) => {
                warn!("reply write failed: {e}");
                Status::FAIL
            }
        };
        // Completion is synchronous here; it must reach the agent before
        // the next received frame.
        if self.registered.contains(&Notification::WriteCompleted) {
            self.events.push_front(Event::WriteCompleted(status));
        }
        Ok(())
    }

    fn close_endpoint(&mut self) -> Result<(), TransportError> {
        if !self.endpoint_open {
            return Err(TransportError::NotOpen);
        }
        self.endpoint_open = false;
        self.peer = None;
        self.rx.clear();
        self.events.clear();
        self.registered.clear();
        self.state = EndpointState::Freed;
        Ok(())
    }

    fn endpoint_state(&self) -> EndpointState {
        self.state
    }

    fn poll_event(&mut self) -> Option<Event> {
        if self.events.is_empty() {
            match self.state {
                EndpointState::Open => self.accept(),
                EndpointState::Connected => self.receive(),
                _ => {}
            }
        }
        self.events.pop_front()
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        if self.listener.is_some() {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
