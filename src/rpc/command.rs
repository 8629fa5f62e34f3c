//! Inbound remote commands.
//!
//! Wire form is a flat JSON object tagged by its `command` key:
//!
//! ```json
//! {"command": "get_valve_status", "valve": 3}
//! ```
//!
//! Zone indices are kept as signed integers here and range-checked by the
//! dispatcher, so a bad index gets an explicit error reply instead of a
//! silent drop.

use serde::Deserialize;

use crate::config::ConfigPatch;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    OpenValve { valve: i64 },
    CloseValve { valve: i64 },
    GetMoistureSensor { sensor: i64 },
    GetValveStatus { valve: i64 },
    GetConfig,
    /// Any subset of configuration keys.
    SetConfig(ConfigPatch),
    GetUptime,
    GetStatus,
    /// Deep sleep for `time` seconds.
    Shutdown { time: u32 },
    Restart,
}

impl Command {
    /// Every `command` value the device understands.
    pub const NAMES: [&'static str; 10] = [
        "open_valve",
        "close_valve",
        "get_moisture_sensor",
        "get_valve_status",
        "get_config",
        "set_config",
        "get_uptime",
        "get_status",
        "shutdown",
        "restart",
    ];

    /// The wire name of this command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenValve { .. } => "open_valve",
            Self::CloseValve { .. } => "close_valve",
            Self::GetMoistureSensor { .. } => "get_moisture_sensor",
            Self::GetValveStatus { .. } => "get_valve_status",
            Self::GetConfig => "get_config",
            Self::SetConfig(_) => "set_config",
            Self::GetUptime => "get_uptime",
            Self::GetStatus => "get_status",
            Self::Shutdown { .. } => "shutdown",
            Self::Restart => "restart",
        }
    }
}
