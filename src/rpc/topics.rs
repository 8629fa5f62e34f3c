//! Topic namespace.
//!
//! Every topic is namespaced by the MQTT client identifier:
//! `/{client_name}/{suffix}`.

use core::fmt::Write;

use heapless::String;

/// Longest topic path: `/` + 64-byte client name + `/sensor-data`.
pub const MAX_TOPIC_LEN: usize = 96;

pub type TopicPath = String<MAX_TOPIC_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// Inbound command messages.
    Commands,
    /// Replies to commands.
    Feedback,
    /// Liveness ping.
    Status,
    /// Periodic telemetry.
    SensorData,
}

impl Topic {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Commands => "commands",
            Self::Feedback => "feedback",
            Self::Status => "status",
            Self::SensorData => "sensor-data",
        }
    }

    /// Full topic path for `client_name`.
    pub fn path(self, client_name: &str) -> TopicPath {
        let mut out = TopicPath::new();
        // Capacity covers the longest client name the config can hold.
        let _ = write!(out, "/{}/{}", client_name, self.suffix());
        out
    }
}
