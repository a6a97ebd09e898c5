//! Device profile: the constants a simulated RCP reports, loaded from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Firmware version reported when the profile does not set one.
const DEFAULT_FIRMWARE_VERSION: u32 = 0x1234_5678;

/// 802.15.4 channel the test tone is transmitted on by default.
const DEFAULT_TONE_CHANNEL: u16 = 11;

/// Static configuration of the agent's device.
///
/// Every field is optional in the JSON file:
///
/// ```json
/// { "firmware_version": 305419896, "tone_channel": 15 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct DeviceProfile {
    /// Value answered to the firmware-version command.
    pub firmware_version: u32,
    /// Secure-element version.
    pub se_version: u32,
    /// Tuning register value at boot.
    pub tuning: u32,
    /// Channel used by the test tone.
    pub tone_channel: u16,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            firmware_version: DEFAULT_FIRMWARE_VERSION,
            se_version: 0x0001_0203,
            tuning: 0x0079,
            tone_channel: DEFAULT_TONE_CHANNEL,
        }
    }
}

impl DeviceProfile {
    /// Loads a profile from a JSON file.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
