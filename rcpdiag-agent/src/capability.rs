//! Capability providers invoked by command actions.

use rcpdiag_proto::{RadioStatus, Status};

/// Byte offset of the tuning token inside the user data page.
pub const TUNING_TOKEN_OFFSET: usize = 0x100;

/// Hardware actions behind the command catalog.
///
/// Each action is called at most once per command and reports its outcome
/// as a status (and value, where there is one); the dispatcher folds that
/// into the reply payload.
pub trait Capabilities {
    /// Secure-element firmware version.
    fn se_version(&mut self) -> (Status, u32);

    /// Copies user data at `offset` into `out`.
    fn read_user_data(&self, offset: usize, out: &mut [u8]) -> Status;

    /// Programs user data at `offset`. Only blank bytes can be written.
    fn write_user_data(&mut self, offset: usize, data: &[u8]) -> Status;

    /// Erases the whole user data page.
    fn erase_user_data(&mut self) -> Status;

    /// Current runtime tuning register.
    fn tuning(&self) -> u32;

    /// Sets the runtime tuning register. Requires an idle radio.
    fn set_tuning(&mut self, value: u32) -> RadioStatus;

    /// Starts a continuous-wave tone on `channel`.
    fn start_tone(&mut self, channel: u16) -> RadioStatus;

    /// Stops the continuous-wave tone.
    fn stop_tone(&mut self) -> RadioStatus;

    /// Drives the diagnostic GPIO.
    fn gpio_write(&mut self, value: u8);
}
