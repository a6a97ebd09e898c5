//! Protocol error types.

/// Alias for `Result<T, rcpdiag_proto::ProtocolError>`.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding frames.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The frame carried no opcode byte.
    #[error("empty frame")]
    Empty,

    /// The opcode is not part of the command catalog.
    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    /// The frame is shorter than the opcode's fixed argument.
    #[error("{opcode:?}: expected {expected} argument bytes, got {actual}")]
    Truncated {
        /// Opcode whose argument was short.
        opcode: crate::Opcode,
        /// Fixed argument size for the opcode.
        expected: usize,
        /// Argument bytes actually present.
        actual: usize,
    },

    /// A reply did not match the catalog's fixed reply length.
    #[error("{opcode:?}: expected {expected}-byte reply, got {actual}")]
    ReplyLength {
        /// Opcode the reply belongs to.
        opcode: crate::Opcode,
        /// Fixed reply length for the opcode.
        expected: usize,
        /// Length actually received.
        actual: usize,
    },
}
