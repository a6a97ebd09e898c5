//! Error types for host operations.

use rcpdiag_proto::ProtocolError;

/// Alias for `Result<T, rcpdiag::Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`Client`](crate::Client) operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Link initialization did not succeed within the retry budget.
    #[error("link init failed after {attempts} attempts: {source}")]
    Init {
        /// Attempts made.
        attempts: u32,
        /// Error from the last attempt.
        source: std::io::Error,
    },

    /// The endpoint could not be opened after a successful init.
    #[error("open endpoint failed: {0}")]
    Open(#[source] std::io::Error),

    /// The command frame could not be written.
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    /// No reply arrived within the retry budget.
    #[error("no reply after {attempts} attempts: {last}")]
    ReplyTimeout {
        /// Attempts made.
        attempts: u32,
        /// Error from the last read.
        last: std::io::Error,
    },

    /// The reply did not fit the command catalog.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
