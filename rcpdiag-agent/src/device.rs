//! In-memory RCP used when no hardware is attached.

use rcpdiag_proto::{RadioStatus, Status};
use tracing::{debug, info};

use crate::{Capabilities, DeviceProfile};

/// Size of the user data (manufacturing) page.
pub const USER_DATA_SIZE: usize = 1024;

/// Erased flash value.
const BLANK: u8 = 0xFF;

/// Valid 2.4 GHz 802.15.4 channels.
const TONE_CHANNELS: std::ops::RangeInclusive<u16> = 11..=26;

/// A faithful software model of the capability providers.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    /// Secure-element version reported.
    se_version: u32,
    /// User data page, initially erased.
    user_data: Vec<u8>,
    /// Runtime tuning register.
    tuning: u32,
    /// Channel of the active tone.
    tone: Option<u16>,
    /// Last GPIO value written.
    gpio: u8,
}

impl SimulatedDevice {
    /// Creates a device with a blank user data page.
    pub fn new(profile: &DeviceProfile) -> Self {
        Self {
            se_version: profile.se_version,
            user_data: vec![BLANK; USER_DATA_SIZE],
            tuning: profile.tuning,
            tone: None,
            gpio: 0,
        }
    }

    /// Channel of the running tone.
    pub const fn tone(&self) -> Option<u16> {
        self.tone
    }

    /// Last GPIO value written.
    pub const fn gpio(&self) -> u8 {
        self.gpio
    }

    /// Byte range for an access, if it fits the page.
    fn span(offset: usize, len: usize) -> Option<std::ops::Range<usize>> {
        let end = offset.checked_add(len)?;
        (end <= USER_DATA_SIZE).then_some(offset..end)
    }
}

impl Capabilities for SimulatedDevice {
    fn se_version(&mut self) -> (Status, u32) {
        (Status::OK, self.se_version)
    }

    fn read_user_data(&self, offset: usize, out: &mut [u8]) -> Status {
        let Some(span) = Self::span(offset, out.len()) else {
            return Status::FAIL;
        };
        out.copy_from_slice(&self.user_data[span]);
        Status::OK
    }

    fn write_user_data(&mut self, offset: usize, data: &[u8]) -> Status {
        let Some(span) = Self::span(offset, data.len()) else {
            return Status::FAIL;
        };
        if self.user_data[span.clone()].iter().any(|&b| b != BLANK) {
            debug!(offset, "user data not blank");
            return Status::FAIL;
        }
        self.user_data[span].copy_from_slice(data);
        Status::OK
    }

    fn erase_user_data(&mut self) -> Status {
        self.user_data.fill(BLANK);
        info!("user data page erased");
        Status::OK
    }

    fn tuning(&self) -> u32 {
        self.tuning
    }

    fn set_tuning(&mut self, value: u32) -> RadioStatus {
        if self.tone.is_some() {
            return RadioStatus::INVALID_STATE;
        }
        self.tuning = value;
        RadioStatus::NO_ERROR
    }

    fn start_tone(&mut self, channel: u16) -> RadioStatus {
        if !TONE_CHANNELS.contains(&channel) {
            return RadioStatus::INVALID_PARAMETER;
        }
        if self.tone.is_some() {
            return RadioStatus::INVALID_STATE;
        }
        self.tone = Some(channel);
        info!(channel, "tone started");
        RadioStatus::NO_ERROR
    }

    fn stop_tone(&mut self) -> RadioStatus {
        match self.tone.take() {
            Some(channel) => {
                info!(channel, "tone stopped");
                RadioStatus::NO_ERROR
            }
            None => RadioStatus::INVALID_STATE,
        }
    }

    fn gpio_write(&mut self, value: u8) {
        self.gpio = value;
    }
}
