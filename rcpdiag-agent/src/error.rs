//! Error types for the RCP agent.

use rcpdiag_proto::Opcode;

/// Alias for `Result<T, rcpdiag_agent::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that stop the agent.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A command arrived while the previous reply was still in flight.
    ///
    /// The transport window of 1 rules this out, so it is an invariant
    /// breach rather than a retryable condition.
    #[error("reply to {0:?} still outstanding when a new command arrived")]
    ReplyPending(Option<Opcode>),

    /// Transport failure outside the recoverable lifecycle paths.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The device profile could not be parsed.
    #[error("invalid device profile: {0}")]
    Profile(#[from] serde_json::Error),

    /// An I/O error from the profile loader.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors reported by a [`Transport`](crate::Transport) call.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The endpoint is already open.
    #[error("endpoint already exists")]
    AlreadyExists,

    /// The endpoint is not open.
    #[error("endpoint not open")]
    NotOpen,

    /// No peer is attached to the endpoint.
    #[error("endpoint not connected")]
    NotConnected,

    /// The transport refused the call.
    #[error("{op} rejected by transport")]
    Rejected {
        /// The rejected operation.
        op: &'static str,
    },

    /// Socket-level failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
