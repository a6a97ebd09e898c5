//! Transport contract consumed by the agent, plus the bundled Unix-socket
//! implementation.
//!
//! Notifications are not callbacks: a transport queues [`Event`]s and the
//! agent drains them from the same task that runs the lifecycle poll, so
//! no two handlers ever run at once.

#[cfg(test)]
pub(crate) mod fake;
mod socket;

use rcpdiag_proto::{EndpointId, EndpointState, Status};

use crate::TransportError;

pub use socket::SocketTransport;

/// Notification kinds an agent registers on an open endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Notification {
    /// A submitted write finished.
    WriteCompleted,
    /// A frame was received.
    Receive,
    /// The endpoint faulted.
    Error,
    /// The peer attached.
    Connect,
}

impl Notification {
    /// Every kind, in registration order.
    pub const ALL: [Self; 4] = [Self::WriteCompleted, Self::Receive, Self::Error, Self::Connect];
}

/// A queued transport notification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Event {
    /// The peer attached to the endpoint.
    Connected(EndpointId),
    /// A whole frame arrived.
    Received(Vec<u8>),
    /// The last submitted write finished with `status`.
    WriteCompleted(Status),
    /// The endpoint faulted; query [`Transport::endpoint_state`] for the class.
    Error(EndpointId),
}

impl Event {
    /// The notification kind that must be registered for this event.
    pub const fn kind(&self) -> Notification {
        match self {
            Self::Connected(_) => Notification::Connect,
            Self::Received(_) => Notification::Receive,
            Self::WriteCompleted(_) => Notification::WriteCompleted,
            Self::Error(_) => Notification::Error,
        }
    }
}

/// The link the agent runs its endpoint on.
pub trait Transport {
    /// Opens `id` with a receive window of `window` frames.
    ///
    /// Returns [`TransportError::AlreadyExists`] if the endpoint is open.
    fn open_endpoint(&mut self, id: EndpointId, flags: u8, window: u8)
    -> Result<(), TransportError>;

    /// Enables delivery of one notification kind.
    fn register(&mut self, notification: Notification) -> Result<(), TransportError>;

    /// Submits one frame; completion arrives as [`Event::WriteCompleted`].
    fn write(&mut self, frame: &[u8], flags: u8) -> Result<(), TransportError>;

    /// Closes the endpoint. Resources are released once the state is
    /// [`EndpointState::Freed`].
    fn close_endpoint(&mut self) -> Result<(), TransportError>;

    /// Current endpoint state.
    fn endpoint_state(&self) -> EndpointState;

    /// Pops the next queued notification, if any.
    fn poll_event(&mut self) -> Option<Event>;
}
