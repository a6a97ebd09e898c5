//! Wire protocol for rcpdiag host↔RCP diagnostics.
//!
//! A command frame is one opcode byte followed by a fixed-size argument
//! (0–2 bytes). The reply is a single little-endian word truncated to the
//! opcode's fixed reply length. There is no length prefix and no checksum:
//! frame boundaries come from the transport, see [`codec`] for the framing
//! used by the bundled Unix-socket transports.

pub mod codec;
mod error;
mod message;
mod status;

pub use codec::{FrameBuffer, MAX_FRAME};
pub use error::{ProtocolError, Result};
pub use message::{Command, Opcode, Reply, TUNING_TOKEN_UNSET};
pub use status::{EndpointId, EndpointState, RadioStatus, Status, TX_WINDOW, USER_ENDPOINT};
