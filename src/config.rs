//! System configuration parameters
//!
//! All tunable parameters for the Smart Garden controller.  The serde
//! field names are the wire keys used by the persisted blob and by the
//! `get_config` / `set_config` commands, so a stored or remote document
//! can omit any key and fall back to the built-in default.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Number of valve/sensor zones wired to the I/O expander.
pub const ZONE_COUNT: usize = 5;

/// Maximum number of scheduled start times.
pub const MAX_WATERING_TIMES: usize = 16;

/// Fixed-capacity string for credentials and identifiers.
pub type Text = String<64>;

/// Scheduled start times, minutes since midnight.
pub type WateringTimes = Vec<u16, MAX_WATERING_TIMES>;

// Built-in defaults (first boot, or keys absent from a stored document).
const DEFAULT_WATERING_DURATION_SECS: u32 = 5 * 60;
const DEFAULT_WATERING_INTERVAL_SECS: u32 = 30;
const DEFAULT_WATERING_TIMES: [u16; 2] = [7 * 60, 17 * 60];
const DEFAULT_WIFI_SSID: &str = "Flamingo";
const DEFAULT_WIFI_PASSWORD: &str = "123456789";
const DEFAULT_MQTT_SERVER: &str = "broker.hivemq.com";
const DEFAULT_MQTT_PORT: u16 = 1883;
const DEFAULT_MQTT_CLIENT_NAME: &str = "SmartGarden-82FA";
/// GMT+5:30.
const DEFAULT_UTC_OFFSET_SECS: i32 = 19_800;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Watering ---
    /// Maximum seconds a single valve stays open.
    #[serde(rename = "watering_duration")]
    pub watering_duration_secs: u32,
    /// Spacing allowance used to size the watering window.
    #[serde(rename = "watering_interval")]
    pub watering_interval_secs: u32,
    pub watering_enabled: bool,
    /// Start times in minutes since midnight; evaluated in array order.
    pub watering_times: WateringTimes,

    // --- Network (passthrough) ---
    #[serde(rename = "ssid")]
    pub wifi_ssid: Text,
    #[serde(rename = "password")]
    pub wifi_password: Text,
    pub mqtt_server: Text,
    pub mqtt_port: u16,
    pub mqtt_username: Text,
    pub mqtt_password: Text,
    /// Client identifier; also namespaces every topic.
    pub mqtt_client_name: Text,

    // --- Time ---
    /// Local-time offset applied to the synced UTC clock.
    pub utc_offset_secs: i32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            watering_duration_secs: DEFAULT_WATERING_DURATION_SECS,
            watering_interval_secs: DEFAULT_WATERING_INTERVAL_SECS,
            watering_enabled: true,
            watering_times: DEFAULT_WATERING_TIMES.iter().copied().collect(),
            wifi_ssid: text(DEFAULT_WIFI_SSID),
            wifi_password: text(DEFAULT_WIFI_PASSWORD),
            mqtt_server: text(DEFAULT_MQTT_SERVER),
            mqtt_port: DEFAULT_MQTT_PORT,
            mqtt_username: Text::new(),
            mqtt_password: Text::new(),
            mqtt_client_name: text(DEFAULT_MQTT_CLIENT_NAME),
            utc_offset_secs: DEFAULT_UTC_OFFSET_SECS,
        }
    }
}

impl SystemConfig {
    /// Reject values that would break the controller's invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watering_duration_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "watering_duration must be > 0",
            ));
        }
        if self.watering_times.iter().any(|&t| t >= 24 * 60) {
            return Err(ConfigError::ValidationFailed(
                "watering_times entries must be < 1440",
            ));
        }
        if self.mqtt_client_name.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "mqtt_client_name must not be empty",
            ));
        }
        Ok(())
    }

    /// Merge every key present in `patch` over this configuration.
    pub fn apply(&mut self, patch: ConfigPatch) {
        let ConfigPatch {
            watering_duration_secs,
            watering_interval_secs,
            watering_enabled,
            watering_times,
            wifi_ssid,
            wifi_password,
            mqtt_server,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_client_name,
            utc_offset_secs,
        } = patch;

        overwrite(&mut self.watering_duration_secs, watering_duration_secs);
        overwrite(&mut self.watering_interval_secs, watering_interval_secs);
        overwrite(&mut self.watering_enabled, watering_enabled);
        overwrite(&mut self.watering_times, watering_times);
        overwrite(&mut self.wifi_ssid, wifi_ssid);
        overwrite(&mut self.wifi_password, wifi_password);
        overwrite(&mut self.mqtt_server, mqtt_server);
        overwrite(&mut self.mqtt_port, mqtt_port);
        overwrite(&mut self.mqtt_username, mqtt_username);
        overwrite(&mut self.mqtt_password, mqtt_password);
        overwrite(&mut self.mqtt_client_name, mqtt_client_name);
        overwrite(&mut self.utc_offset_secs, utc_offset_secs);
    }
}

/// A partial configuration update: only the keys present are applied.
///
/// Unknown keys (including `command` itself when decoded straight from a
/// `set_config` message) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigPatch {
    #[serde(rename = "watering_duration")]
    pub watering_duration_secs: Option<u32>,
    #[serde(rename = "watering_interval")]
    pub watering_interval_secs: Option<u32>,
    pub watering_enabled: Option<bool>,
    pub watering_times: Option<WateringTimes>,
    #[serde(rename = "ssid")]
    pub wifi_ssid: Option<Text>,
    #[serde(rename = "password")]
    pub wifi_password: Option<Text>,
    pub mqtt_server: Option<Text>,
    pub mqtt_port: Option<u16>,
    pub mqtt_username: Option<Text>,
    pub mqtt_password: Option<Text>,
    pub mqtt_client_name: Option<Text>,
    pub utc_offset_secs: Option<i32>,
}

impl ConfigPatch {
    /// True when the patch carries no recognised key.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn overwrite<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

/// Build a [`Text`] from a literal, truncating at capacity.
fn text(s: &str) -> Text {
    let mut out = Text::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
