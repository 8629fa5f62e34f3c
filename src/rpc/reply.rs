//! Outbound replies on the feedback topic.
//!
//! Each reply is a flat JSON object whose `command` key names the reply
//! kind, e.g. `{"command":"valve_status","valve":3,"status":true}`.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::Serialize as DeriveSerialize;

use crate::config::{SystemConfig, ZONE_COUNT};

/// Maximum size of an encoded reply.
pub const MAX_REPLY_LEN: usize = 1024;

#[derive(Debug, Clone, PartialEq, DeriveSerialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Reply<'a> {
    MoistureSensor { sensor: usize, moisture: bool },
    ValveStatus { valve: usize, status: bool },
    /// Full configuration, credentials included.
    Config(&'a SystemConfig),
    Uptime { uptime: u64 },
    Status(StatusReport),
    /// A request named a zone outside `0..ZONE_COUNT`.
    Error {
        request: &'static str,
        error: &'static str,
        index: i64,
    },
}

/// Snapshot for `get_status`.
///
/// Serialised with one key per zone: `moisture0..`, `valve0..`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub uptime: u64,
    pub moisture: [bool; ZONE_COUNT],
    pub valve: [bool; ZONE_COUNT],
}

const MOISTURE_KEYS: [&str; ZONE_COUNT] =
    ["moisture0", "moisture1", "moisture2", "moisture3", "moisture4"];
const VALVE_KEYS: [&str; ZONE_COUNT] = ["valve0", "valve1", "valve2", "valve3", "valve4"];

impl Serialize for StatusReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + 2 * ZONE_COUNT))?;
        map.serialize_entry("uptime", &self.uptime)?;
        for (key, wet) in MOISTURE_KEYS.iter().zip(self.moisture) {
            map.serialize_entry(key, &wet)?;
        }
        for (key, open) in VALVE_KEYS.iter().zip(self.valve) {
            map.serialize_entry(key, &open)?;
        }
        map.end()
    }
}

impl Reply<'_> {
    /// Encode as JSON.  `None` if the reply does not fit the outbound buffer.
    pub fn encode(&self) -> Option<heapless::Vec<u8, MAX_REPLY_LEN>> {
        let bytes = serde_json::to_vec(self).ok()?;
        heapless::Vec::from_slice(&bytes).ok()
    }
}
