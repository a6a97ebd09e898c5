//! Command catalog: opcodes, command frames and fixed-shape replies.

use std::fmt;

use crate::{ProtocolError, RadioStatus, Result, Status};

/// Tuning token value read back from a blank manufacturing page.
pub const TUNING_TOKEN_UNSET: u16 = 0xFFFF;

/// Command opcode, the first byte of every command frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(clippy::exhaustive_enums)]
pub enum Opcode {
    /// Read the 32-bit firmware version constant.
    FirmwareVersion = 1,
    /// Read the secure-element version.
    SeVersion = 2,
    /// Read the persisted tuning token.
    GetTuningToken = 3,
    /// Write the persisted tuning token (page must be blank).
    SetTuningToken = 4,
    /// Read the runtime tuning register.
    GetTuningValue = 5,
    /// Write the runtime tuning register (radio must be idle).
    SetTuningValue = 6,
    /// Start the continuous-wave test tone.
    ToneStart = 7,
    /// Stop the continuous-wave test tone.
    ToneStop = 8,
    /// Drive the diagnostic GPIO.
    GpioWrite = 9,
    /// Erase the manufacturing (user data) page.
    EraseUserData = 10,
}

impl Opcode {
    /// Every opcode, in catalog order.
    pub const ALL: [Self; 10] = [
        Self::FirmwareVersion,
        Self::SeVersion,
        Self::GetTuningToken,
        Self::SetTuningToken,
        Self::GetTuningValue,
        Self::SetTuningValue,
        Self::ToneStart,
        Self::ToneStop,
        Self::GpioWrite,
        Self::EraseUserData,
    ];

    /// Size of the fixed argument following the opcode byte.
    pub const fn arg_len(self) -> usize {
        match self {
            Self::SetTuningToken | Self::SetTuningValue => 2,
            Self::GpioWrite => 1,
            _ => 0,
        }
    }

    /// Exact length of the reply to this opcode.
    pub const fn reply_len(self) -> usize {
        match self {
            Self::FirmwareVersion
            | Self::SeVersion
            | Self::SetTuningValue
            | Self::ToneStart
            | Self::ToneStop => 4,
            Self::GetTuningToken
            | Self::SetTuningToken
            | Self::GetTuningValue
            | Self::GpioWrite
            | Self::EraseUserData => 2,
        }
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        op as Self
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| *op as u8 == byte)
            .ok_or(ProtocolError::UnknownOpcode(byte))
    }
}

/// A command sent from host to RCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::exhaustive_enums)]
pub enum Command {
    /// Query the firmware version.
    FirmwareVersion,
    /// Query the secure-element version.
    SeVersion,
    /// Read the persisted tuning token.
    GetTuningToken,
    /// Persist a tuning token.
    SetTuningToken(u16),
    /// Read the runtime tuning value.
    GetTuningValue,
    /// Set the runtime tuning value.
    SetTuningValue(u16),
    /// Start the test tone.
    ToneStart,
    /// Stop the test tone.
    ToneStop,
    /// Write a value to the diagnostic GPIO.
    GpioWrite(u8),
    /// Erase the manufacturing page.
    EraseUserData,
}

impl Command {
    /// Opcode selecting this command.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::FirmwareVersion => Opcode::FirmwareVersion,
            Self::SeVersion => Opcode::SeVersion,
            Self::GetTuningToken => Opcode::GetTuningToken,
            Self::SetTuningToken(_) => Opcode::SetTuningToken,
            Self::GetTuningValue => Opcode::GetTuningValue,
            Self::SetTuningValue(_) => Opcode::SetTuningValue,
            Self::ToneStart => Opcode::ToneStart,
            Self::ToneStop => Opcode::ToneStop,
            Self::GpioWrite(_) => Opcode::GpioWrite,
            Self::EraseUserData => Opcode::EraseUserData,
        }
    }

    /// Encodes the command as `[opcode, args...]`.
    pub fn encode(&self) -> Vec<u8> {
        let op = self.opcode();
        let mut frame = Vec::with_capacity(1 + op.arg_len());
        frame.push(u8::from(op));
        match *self {
            Self::SetTuningToken(v) | Self::SetTuningValue(v) => {
                frame.extend_from_slice(&v.to_le_bytes());
            }
            Self::GpioWrite(v) => frame.push(v),
            _ => {}
        }
        frame
    }

    /// Decodes a command frame. Bytes past the fixed argument are ignored.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let (&first, args) = frame.split_first().ok_or(ProtocolError::Empty)?;
        let op = Opcode::try_from(first)?;
        if args.len() < op.arg_len() {
            return Err(ProtocolError::Truncated {
                opcode: op,
                expected: op.arg_len(),
                actual: args.len(),
            });
        }
        let le16 = || u16::from_le_bytes([args[0], args[1]]);
        Ok(match op {
            Opcode::FirmwareVersion => Self::FirmwareVersion,
            Opcode::SeVersion => Self::SeVersion,
            Opcode::GetTuningToken => Self::GetTuningToken,
            Opcode::SetTuningToken => Self::SetTuningToken(le16()),
            Opcode::GetTuningValue => Self::GetTuningValue,
            Opcode::SetTuningValue => Self::SetTuningValue(le16()),
            Opcode::ToneStart => Self::ToneStart,
            Opcode::ToneStop => Self::ToneStop,
            Opcode::GpioWrite => Self::GpioWrite(args[0]),
            Opcode::EraseUserData => Self::EraseUserData,
        })
    }
}

/// Reply sent from RCP to host.
///
/// Success and failure share a frame shape: status-returning commands carry
/// the status as the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::exhaustive_enums)]
pub enum Reply {
    /// Firmware version constant.
    FirmwareVersion(u32),
    /// Secure-element version.
    SeVersion(u32),
    /// Persisted tuning token ([`TUNING_TOKEN_UNSET`] when blank).
    TuningToken(u16),
    /// Status of a tuning-token write (low 16 bits on the wire).
    TuningTokenWritten(Status),
    /// Runtime tuning value.
    TuningValue(u16),
    /// Radio status of a tuning-value write.
    TuningValueWritten(RadioStatus),
    /// Radio status of a tone start.
    ToneStarted(RadioStatus),
    /// Radio status of a tone stop.
    ToneStopped(RadioStatus),
    /// Status of a GPIO write.
    GpioWritten(Status),
    /// Status of a manufacturing-page erase (low 16 bits on the wire).
    UserDataErased(Status),
}

impl Reply {
    /// Opcode this reply answers.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::FirmwareVersion(_) => Opcode::FirmwareVersion,
            Self::SeVersion(_) => Opcode::SeVersion,
            Self::TuningToken(_) => Opcode::GetTuningToken,
            Self::TuningTokenWritten(_) => Opcode::SetTuningToken,
            Self::TuningValue(_) => Opcode::GetTuningValue,
            Self::TuningValueWritten(_) => Opcode::SetTuningValue,
            Self::ToneStarted(_) => Opcode::ToneStart,
            Self::ToneStopped(_) => Opcode::ToneStop,
            Self::GpioWritten(_) => Opcode::GpioWrite,
            Self::UserDataErased(_) => Opcode::EraseUserData,
        }
    }

    /// The payload word before truncation.
    pub const fn word(&self) -> u32 {
        match *self {
            Self::FirmwareVersion(v) | Self::SeVersion(v) => v,
            Self::TuningToken(v) | Self::TuningValue(v) => v as u32,
            Self::TuningTokenWritten(s) | Self::GpioWritten(s) | Self::UserDataErased(s) => s.0,
            Self::TuningValueWritten(s) | Self::ToneStarted(s) | Self::ToneStopped(s) => s.0,
        }
    }

    /// Encodes the payload word little-endian, truncated to the reply length.
    pub fn encode(&self) -> Vec<u8> {
        self.word().to_le_bytes()[..self.opcode().reply_len()].to_vec()
    }

    /// Decodes the reply to `opcode`, checking its fixed length.
    pub fn decode(opcode: Opcode, bytes: &[u8]) -> Result<Self> {
        let expected = opcode.reply_len();
        if bytes.len() != expected {
            return Err(ProtocolError::ReplyLength {
                opcode,
                expected,
                actual: bytes.len(),
            });
        }
        let mut word = [0u8; 4];
        word[..expected].copy_from_slice(bytes);
        let word = u32::from_le_bytes(word);
        #[allow(clippy::cast_possible_truncation)]
        let half = word as u16;
        Ok(match opcode {
            Opcode::FirmwareVersion => Self::FirmwareVersion(word),
            Opcode::SeVersion => Self::SeVersion(word),
            Opcode::GetTuningToken => Self::TuningToken(half),
            Opcode::SetTuningToken => Self::TuningTokenWritten(Status(word)),
            Opcode::GetTuningValue => Self::TuningValue(half),
            Opcode::SetTuningValue => Self::TuningValueWritten(RadioStatus(word)),
            Opcode::ToneStart => Self::ToneStarted(RadioStatus(word)),
            Opcode::ToneStop => Self::ToneStopped(RadioStatus(word)),
            Opcode::GpioWrite => Self::GpioWritten(Status(word)),
            Opcode::EraseUserData => Self::UserDataErased(Status(word)),
        })
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirmwareVersion(v) => write!(f, "firmware version 0x{v:08x}"),
            Self::SeVersion(v) => write!(f, "secure element version 0x{v:08x}"),
            Self::TuningToken(TUNING_TOKEN_UNSET) => f.write_str("tuning token unset (0xffff)"),
            Self::TuningToken(v) => write!(f, "tuning token 0x{v:04x}"),
            Self::TuningTokenWritten(s) => write!(f, "tuning token write: {s}"),
            Self::TuningValue(v) => write!(f, "tuning value 0x{v:04x}"),
            Self::TuningValueWritten(s) => write!(f, "tuning value write: {s}"),
            Self::ToneStarted(s) => write!(f, "tone start: {s}"),
            Self::ToneStopped(s) => write!(f, "tone stop: {s}"),
            Self::GpioWritten(s) => write!(f, "gpio write: {s}"),
            Self::UserDataErased(s) => write!(f, "user data erase: {s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcodes_are_contiguous_from_one() {
        for (i, op) in Opcode::ALL.into_iter().enumerate() {
            assert_eq!(usize::from(u8::from(op)), i + 1);
            assert_eq!(Opcode::try_from(u8::from(op)), Ok(op));
        }
        assert_eq!(Opcode::try_from(0), Err(ProtocolError::UnknownOpcode(0)));
        assert_eq!(Opcode::try_from(11), Err(ProtocolError::UnknownOpcode(11)));
    }

    #[test]
    fn encode_argument_layout() {
        assert_eq!(Command::FirmwareVersion.encode(), vec![0x01]);
        assert_eq!(Command::SetTuningToken(0x1234).encode(), vec![0x04, 0x34, 0x12]);
        assert_eq!(Command::SetTuningValue(0x00ab).encode(), vec![0x06, 0xab, 0x00]);
        assert_eq!(Command::GpioWrite(1).encode(), vec![0x09, 0x01]);
    }

    #[test]
    fn encoded_length_matches_catalog() {
        let cmds = [
            Command::FirmwareVersion,
            Command::SeVersion,
            Command::GetTuningToken,
            Command::SetTuningToken(7),
            Command::GetTuningValue,
            Command::SetTuningValue(7),
            Command::ToneStart,
            Command::ToneStop,
            Command::GpioWrite(0),
            Command::EraseUserData,
        ];
        for cmd in cmds {
            assert_eq!(cmd.encode().len(), 1 + cmd.opcode().arg_len(), "{cmd:?}");
            assert_eq!(Command::decode(&cmd.encode()), Ok(cmd));
        }
    }

    #[test]
    fn decode_rejects_bad_frames() {
        assert_eq!(Command::decode(&[]), Err(ProtocolError::Empty));
        assert_eq!(Command::decode(&[0x7f]), Err(ProtocolError::UnknownOpcode(0x7f)));
        assert_eq!(
            Command::decode(&[0x04, 0x01]),
            Err(ProtocolError::Truncated {
                opcode: Opcode::SetTuningToken,
                expected: 2,
                actual: 1,
            })
        );
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        assert_eq!(Command::decode(&[0x09, 0x01, 0xee]), Ok(Command::GpioWrite(1)));
    }

    #[test]
    fn reply_truncates_status_to_reply_len() {
        let reply = Reply::TuningTokenWritten(Status(0xdead_0001));
        assert_eq!(reply.encode(), vec![0x01, 0x00]);
        assert_eq!(
            Reply::decode(Opcode::SetTuningToken, &reply.encode()),
            Ok(Reply::TuningTokenWritten(Status::FAIL))
        );
    }

    #[test]
    fn reply_firmware_version_is_little_endian() {
        let bytes = Reply::FirmwareVersion(0x1234_5678).encode();
        assert_eq!(bytes, vec![0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn reply_decode_checks_length() {
        assert_eq!(
            Reply::decode(Opcode::ToneStart, &[0, 0]),
            Err(ProtocolError::ReplyLength {
                opcode: Opcode::ToneStart,
                expected: 4,
                actual: 2,
            })
        );
        assert_eq!(
            Reply::decode(Opcode::GetTuningToken, &[0xff, 0xff]),
            Ok(Reply::TuningToken(TUNING_TOKEN_UNSET))
        );
    }

    #[test]
    fn reply_display() {
        assert_eq!(
            Reply::TuningToken(TUNING_TOKEN_UNSET).to_string(),
            "tuning token unset (0xffff)"
        );
        assert_eq!(
            Reply::ToneStarted(RadioStatus::NO_ERROR).to_string(),
            "tone start: no error (0)"
        );
    }
}
