//! Command dispatcher: one received frame in, at most one reply out.

use rcpdiag_proto::{Command, Opcode, Reply, Status, TUNING_TOKEN_UNSET};
use tracing::{debug, trace, warn};

use crate::capability::TUNING_TOKEN_OFFSET;
use crate::{Capabilities, DeviceProfile, Error, Result, Transport};

/// Upper half forced on the stored tuning token word.
const TOKEN_HIGH_BITS: u32 = 0xFFFF_0000;

/// A reply handed to the transport and not yet confirmed written.
#[derive(Debug)]
struct Outstanding {
    /// Opcode the reply answers.
    opcode: Opcode,
    /// The submitted bytes.
    buf: Box<[u8]>,
}

/// Decodes command frames, runs the bound action and submits the reply.
///
/// At most one reply is outstanding at any time. The transport's window of
/// one frame guarantees the next command only arrives after the previous
/// reply completed; if that ever breaks, [`Dispatcher::dispatch`] fails with
/// [`Error::ReplyPending`] rather than overwrite the buffer.
#[derive(Debug)]
pub struct Dispatcher<C> {
    device: C,
    /// Value answered to [`Command::FirmwareVersion`].
    firmware_version: u32,
    /// Channel used by [`Command::ToneStart`].
    tone_channel: u16,
    /// Reply awaiting its write-complete notification.
    pending: Option<Outstanding>,
}

impl<C: Capabilities> Dispatcher<C> {
    /// Creates a dispatcher over `device`, taking constants from `profile`.
    pub fn new(device: C, profile: &DeviceProfile) -> Self {
        Self {
            device,
            firmware_version: profile.firmware_version,
            tone_channel: profile.tone_channel,
            pending: None,
        }
    }

    /// The capability provider.
    pub const fn device(&self) -> &C {
        &self.device
    }

    /// Bytes of the reply still awaiting write completion.
    pub fn pending(&self) -> Option<&[u8]> {
        self.pending.as_ref().map(|p| &*p.buf)
    }

    /// Runs the action bound to `command` and returns its reply.
    pub fn execute(&mut self, command: Command) -> Reply {
        match command {
            Command::FirmwareVersion => Reply::FirmwareVersion(self.firmware_version),
            Command::SeVersion => {
                let (status, version) = self.device.se_version();
                debug!(%status, "secure element version query");
                Reply::SeVersion(version)
            }
            Command::GetTuningToken => {
                let mut raw = TUNING_TOKEN_UNSET.to_le_bytes();
                let status = self.device.read_user_data(TUNING_TOKEN_OFFSET, &mut raw);
                if !status.is_ok() {
                    warn!(%status, "tuning token read failed");
                }
                Reply::TuningToken(u16::from_le_bytes(raw))
            }
            Command::SetTuningToken(token) => {
                let word = TOKEN_HIGH_BITS | u32::from(token);
                debug!("writing tuning token 0x{word:08x}");
                let status = self
                    .device
                    .write_user_data(TUNING_TOKEN_OFFSET, &word.to_le_bytes());
                Reply::TuningTokenWritten(status)
            }
            Command::GetTuningValue => {
                #[allow(clippy::cast_possible_truncation)]
                let value = self.device.tuning() as u16;
                Reply::TuningValue(value)
            }
            Command::SetTuningValue(value) => {
                Reply::TuningValueWritten(self.device.set_tuning(u32::from(value)))
            }
            Command::ToneStart => Reply::ToneStarted(self.device.start_tone(self.tone_channel)),
            Command::ToneStop => Reply::ToneStopped(self.device.stop_tone()),
            Command::GpioWrite(value) => {
                self.device.gpio_write(value);
                Reply::GpioWritten(Status::OK)
            }
            Command::EraseUserData => Reply::UserDataErased(self.device.erase_user_data()),
        }
    }

    /// Handles one received frame and returns the number of reply bytes
    /// submitted (`0` when the frame produced no reply).
    pub fn dispatch<T: Transport>(&mut self, frame: &[u8], transport: &mut T) -> Result<usize> {
        if let Some(p) = &self.pending {
            return Err(Error::ReplyPending(Some(p.opcode)));
        }
        trace!(?frame, "command frame");

        let command = match Command::decode(frame) {
            Ok(c) => c,
            Err(e) => {
                warn!("no action for frame: {e}");
                return Ok(0);
            }
        };
        let reply = self.execute(command);
        debug!(?command, %reply, "command handled");

        let buf = reply.encode().into_boxed_slice();
        let len = buf.len();
        if len == 0 {
            return Ok(0);
        }
        if let Err(e) = transport.write(&buf, 0) {
            // Nothing was queued, so no completion will ever release it.
            warn!("reply to {:?} not submitted: {e}", command.opcode());
            return Ok(0);
        }
        self.pending = Some(Outstanding {
            opcode: command.opcode(),
            buf,
        });
        Ok(len)
    }

    /// Releases the outstanding reply once the transport reports completion.
    ///
    /// The buffer is released whatever the status: the transport is done
    /// with it either way, and keeping it would refuse every later command.
    pub fn write_completed(&mut self, status: Status) {
        match self.pending.take() {
            Some(p) if status.is_ok() => trace!(opcode = ?p.opcode, "reply written"),
            Some(p) => warn!(opcode = ?p.opcode, %status, "reply write failed"),
            None => debug!(%status, "write completion with no reply outstanding"),
        }
    }

    /// Drops the outstanding reply after the endpoint was torn down.
    pub fn abandon(&mut self) {
        if let Some(p) = self.pending.take() {
            debug!(opcode = ?p.opcode, "abandoning reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use rcpdiag_proto::{Opcode, RadioStatus};

    use super::*;
    use crate::SimulatedDevice;
    use crate::transport::fake::FakeTransport;

    fn dispatcher() -> Dispatcher<SimulatedDevice> {
        let profile = DeviceProfile::default();
        Dispatcher::new(SimulatedDevice::new(&profile), &profile)
    }

    /// Dispatches `frame` and acknowledges the write.
    fn roundtrip(d: &mut Dispatcher<SimulatedDevice>, t: &mut FakeTransport, frame: &[u8]) -> Vec<u8> {
        let n = d.dispatch(frame, t).unwrap();
        if n == 0 {
            return Vec::new();
        }
        d.write_completed(Status::OK);
        t.written.pop().unwrap()
    }

    fn frame_for(op: Opcode) -> Vec<u8> {
        let mut frame = vec![u8::from(op)];
        frame.resize(1 + op.arg_len(), 0x0b);
        frame
    }

    #[test]
    fn every_opcode_replies_with_catalog_length() {
        let mut d = dispatcher();
        let mut t = FakeTransport::connected();
        for op in Opcode::ALL {
            let reply = roundtrip(&mut d, &mut t, &frame_for(op));
            assert_eq!(reply.len(), op.reply_len(), "{op:?}");
        }
    }

    #[test]
    fn unknown_and_short_frames_send_nothing() {
        let mut d = dispatcher();
        let mut t = FakeTransport::connected();
        assert_eq!(d.dispatch(&[0x00], &mut t).unwrap(), 0);
        assert_eq!(d.dispatch(&[0xee, 1, 2], &mut t).unwrap(), 0);
        assert_eq!(d.dispatch(&[0x06, 1], &mut t).unwrap(), 0);
        assert_eq!(d.dispatch(&[], &mut t).unwrap(), 0);
        assert!(t.written.is_empty());
        assert!(d.pending().is_none());
    }

    #[test]
    fn firmware_version_bytes() {
        let mut d = dispatcher();
        let mut t = FakeTransport::connected();
        assert_eq!(roundtrip(&mut d, &mut t, &[0x01]), vec![0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn unset_tuning_token_reads_ffff() {
        let mut d = dispatcher();
        let mut t = FakeTransport::connected();
        assert_eq!(roundtrip(&mut d, &mut t, &[0x03]), vec![0xff, 0xff]);
    }

    #[test]
    fn tuning_token_is_write_once() {
        let mut d = dispatcher();
        let mut t = FakeTransport::connected();
        let set = Command::SetTuningToken(0x00a5).encode();

        assert_eq!(roundtrip(&mut d, &mut t, &set), vec![0x00, 0x00]);
        assert_eq!(roundtrip(&mut d, &mut t, &[0x03]), vec![0xa5, 0x00]);

        let mut stored = [0u8; 4];
        d.device().read_user_data(TUNING_TOKEN_OFFSET, &mut stored);
        assert_eq!(u32::from_le_bytes(stored), 0xFFFF_00a5);

        assert_eq!(roundtrip(&mut d, &mut t, &set), vec![0x01, 0x00]);
        assert_eq!(roundtrip(&mut d, &mut t, &[0x0a]), vec![0x00, 0x00]);
        assert_eq!(roundtrip(&mut d, &mut t, &[0x03]), vec![0xff, 0xff]);
    }

    #[test]
    fn tuning_value_roundtrip() {
        let mut d = dispatcher();
        let mut t = FakeTransport::connected();
        let set = Command::SetTuningValue(0x0123).encode();
        assert_eq!(roundtrip(&mut d, &mut t, &set), vec![0, 0, 0, 0]);
        assert_eq!(roundtrip(&mut d, &mut t, &[0x05]), vec![0x23, 0x01]);
    }

    #[test]
    fn tone_and_gpio() {
        let mut d = dispatcher();
        assert_eq!(d.execute(Command::ToneStart), Reply::ToneStarted(RadioStatus::NO_ERROR));
        assert_eq!(d.device().tone(), Some(11));
        assert_eq!(
            d.execute(Command::SetTuningValue(1)),
            Reply::TuningValueWritten(RadioStatus::INVALID_STATE)
        );
        assert_eq!(d.execute(Command::ToneStop), Reply::ToneStopped(RadioStatus::NO_ERROR));

        assert_eq!(d.execute(Command::GpioWrite(1)), Reply::GpioWritten(Status::OK));
        assert_eq!(d.device().gpio(), 1);
    }

    #[test]
    fn second_command_while_reply_outstanding_is_rejected() {
        let mut d = dispatcher();
        let mut t = FakeTransport::connected();
        assert_eq!(d.dispatch(&[0x01], &mut t).unwrap(), 4);

        let err = d.dispatch(&[0x03], &mut t).unwrap_err();
        assert!(matches!(err, Error::ReplyPending(Some(Opcode::FirmwareVersion))));
        assert_eq!(t.written.len(), 1);
        assert_eq!(d.pending(), Some(&[0x78, 0x56, 0x34, 0x12][..]));
    }

    #[test]
    fn failed_completion_still_releases() {
        let mut d = dispatcher();
        let mut t = FakeTransport::connected();
        d.dispatch(&[0x01], &mut t).unwrap();
        d.write_completed(Status::FAIL);
        assert!(d.pending().is_none());
        assert_eq!(d.dispatch(&[0x01], &mut t).unwrap(), 4);
    }

    #[test]
    fn rejected_write_leaves_nothing_outstanding() {
        let mut d = dispatcher();
        let mut t = FakeTransport::connected();
        t.fail_write = true;
        assert_eq!(d.dispatch(&[0x01], &mut t).unwrap(), 0);
        assert!(d.pending().is_none());
    }
}
