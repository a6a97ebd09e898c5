//! Endpoint identity, endpoint states and status codes shared by both sides.

use std::fmt;

/// Identifier of a logical endpoint on the multiplexed link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointId(pub u8);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ep{}", self.0)
    }
}

/// The single user endpoint carrying diagnostic commands.
pub const USER_ENDPOINT: EndpointId = EndpointId(90);

/// Frames in flight per direction. The dispatcher relies on this being 1.
pub const TX_WINDOW: u8 = 1;

/// Endpoint state as reported by a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum EndpointState {
    /// Opened locally, peer not yet attached.
    Open,
    /// Peer attached; frames flow.
    Connected,
    /// Close requested, not yet confirmed.
    Closing,
    /// Closed by the peer or locally.
    Closed,
    /// Closed and all transport resources released.
    Freed,
    /// Peer is gone; raised on disconnect.
    DestinationUnreachable,
    /// Any other transport fault.
    Faulted,
}

/// Platform status code (`0` is success).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Status(pub u32);

impl Status {
    /// Success.
    pub const OK: Self = Self(0x0000);
    /// Generic failure.
    pub const FAIL: Self = Self(0x0001);
    /// Operation not allowed in the current state.
    pub const INVALID_STATE: Self = Self(0x0002);
    /// Module not ready.
    pub const NOT_READY: Self = Self(0x0003);
    /// Resource busy.
    pub const BUSY: Self = Self(0x0004);
    /// Operation timed out.
    pub const TIMEOUT: Self = Self(0x0007);

    /// Returns `true` for [`Status::OK`].
    pub const fn is_ok(self) -> bool {
        self.0 == Self::OK.0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::OK => "ok",
            Self::FAIL => "fail",
            Self::INVALID_STATE => "invalid state",
            Self::NOT_READY => "not ready",
            Self::BUSY => "busy",
            Self::TIMEOUT => "timeout",
            _ => return write!(f, "status 0x{:04x}", self.0),
        };
        write!(f, "{name} (0x{:04x})", self.0)
    }
}

/// Radio-layer status code (`0` is success).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RadioStatus(pub u32);

impl RadioStatus {
    /// Success.
    pub const NO_ERROR: Self = Self(0);
    /// An argument was out of range.
    pub const INVALID_PARAMETER: Self = Self(1);
    /// The radio is not in a state that allows the call.
    pub const INVALID_STATE: Self = Self(2);
    /// The call is not supported in this configuration.
    pub const INVALID_CALL: Self = Self(3);

    /// Returns `true` for [`RadioStatus::NO_ERROR`].
    pub const fn is_ok(self) -> bool {
        self.0 == Self::NO_ERROR.0
    }
}

impl fmt::Display for RadioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Self::NO_ERROR => "no error",
            Self::INVALID_PARAMETER => "invalid parameter",
            Self::INVALID_STATE => "invalid state",
            Self::INVALID_CALL => "invalid call",
            _ => return write!(f, "radio status {}", self.0),
        };
        write!(f, "{name} ({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display_names_known_codes() {
        assert_eq!(Status::OK.to_string(), "ok (0x0000)");
        assert_eq!(Status(0x42).to_string(), "status 0x0042");
        assert_eq!(RadioStatus::INVALID_STATE.to_string(), "invalid state (2)");
    }

    #[test]
    fn user_endpoint_display() {
        assert_eq!(USER_ENDPOINT.to_string(), "ep90");
    }
}
