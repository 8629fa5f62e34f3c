//! Unified error types for the Smart Garden firmware.
//!
//! A single `Error` enum that every subsystem converts into, so the boot
//! path and the control loop handle failures uniformly.  Leaf error types
//! live next to the port that produces them (`app::ports`, `rpc::codec`,
//! `adapters::expander`).

use core::fmt;

use crate::adapters::expander::ExpanderError;
use crate::app::ports::{CommsError, ConfigError, IndexError, StorageError};
use crate::rpc::codec::DecodeError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Non-volatile byte region could not be read or written.
    Storage(StorageError),
    /// Configuration was rejected, missing, or corrupted.
    Config(ConfigError),
    /// Publishing on the messaging channel failed.
    Comms(CommsError),
    /// An inbound command could not be decoded.
    Decode(DecodeError),
    /// A valve or sensor index was outside `0..VALVE_COUNT`.
    Index(IndexError),
    /// The I/O expander bus failed or the chip is absent.
    Expander(ExpanderError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Decode(e) => write!(f, "decode: {e}"),
            Self::Index(e) => write!(f, "index: {e}"),
            Self::Expander(e) => write!(f, "expander: {e}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

impl From<IndexError> for Error {
    fn from(e: IndexError) -> Self {
        Self::Index(e)
    }
}

impl From<ExpanderError> for Error {
    fn from(e: ExpanderError) -> Self {
        Self::Expander(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
