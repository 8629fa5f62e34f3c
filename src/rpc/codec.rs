//! Validating command decoder.
//!
//! Decoding runs in three gates, each with its own rejection:
//!
//! ```text
//! bytes ──▶ JSON object? ──▶ "command" string? ──▶ known name? ──▶ typed fields?
//!             Malformed        MissingCommand        Unknown        InvalidFields
//! ```
//!
//! Nothing is dispatched unless every gate passes.

use core::fmt;

use heapless::String;
use serde_json::Value;

use super::command::Command;

/// Longest unknown command name kept for the log.
const NAME_CAP: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Not UTF-8 JSON, or not a JSON object.
    Malformed,
    /// No `command` key, or it is not a string.
    MissingCommand,
    /// A `command` the device does not implement (name truncated).
    Unknown(String<NAME_CAP>),
    /// A known command whose fields are missing or ill-typed.
    InvalidFields(&'static str),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed payload"),
            Self::MissingCommand => write!(f, "missing command key"),
            Self::Unknown(name) => write!(f, "unknown command '{}'", name),
            Self::InvalidFields(cmd) => write!(f, "invalid fields for '{}'", cmd),
        }
    }
}

/// Decode one inbound payload.
pub fn decode_command(payload: &[u8]) -> Result<Command, DecodeError> {
    let value: Value = serde_json::from_slice(payload).map_err(|_| DecodeError::Malformed)?;
    if !value.is_object() {
        return Err(DecodeError::Malformed);
    }

    let name = value
        .get("command")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingCommand)?;

    let Some(&known) = Command::NAMES.iter().find(|&&n| n == name) else {
        return Err(DecodeError::Unknown(truncated(name)));
    };

    serde_json::from_value(value).map_err(|_| DecodeError::InvalidFields(known))
}

fn truncated(name: &str) -> String<NAME_CAP> {
    let mut out = String::new();
    for c in name.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
