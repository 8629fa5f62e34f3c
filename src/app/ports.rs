//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService / CommandDispatcher (domain)
//! ```
//!
//! Driven adapters (expander I/O, non-volatile region, MQTT, clock, device
//! lifecycle) implement these traits.  The domain consumes them via
//! generics, so nothing in `app`, `fsm`, `rpc` or `telemetry` touches
//! hardware directly.

use core::fmt;

use crate::config::{ConfigPatch, SystemConfig};
use crate::rpc::topics::Topic;
use crate::schedule::WallClock;

// ───────────────────────────────────────────────────────────────
// Valve / moisture ports (driven adapter: domain ↔ expander pins)
// ───────────────────────────────────────────────────────────────

/// Solenoid valve bank.
///
/// Status is always read back from the driver.  Implementations must not
/// answer `is_open` from a cached command, so a valve left open by a
/// remote command or a power glitch is seen as it really is.
pub trait ValvePort {
    /// Number of valves in the bank.
    fn valve_count(&self) -> usize;

    /// Energise valve `index`.  Out-of-range indices are ignored.
    fn open(&mut self, index: usize);

    /// De-energise valve `index`.  Out-of-range indices are ignored.
    fn close(&mut self, index: usize);

    /// Read back whether valve `index` is open.
    fn is_open(&mut self, index: usize) -> bool;

    /// Close every valve in the bank.
    fn close_all(&mut self) {
        for i in 0..self.valve_count() {
            self.close(i);
        }
    }
}

/// Digital soil-moisture sensors (thresholded in hardware).
pub trait MoisturePort {
    /// Number of sensors; paired one-to-one with valves.
    fn sensor_count(&self) -> usize;

    /// `true` when sensor `index` reports wet soil.
    fn is_wet(&mut self, index: usize) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Non-volatile byte region (driven adapter: domain ↔ flash)
// ───────────────────────────────────────────────────────────────

/// Raw, address-based non-volatile storage (EEPROM-style).
///
/// Writes land in a RAM shadow and only become durable on [`commit`].
///
/// [`commit`]: StoragePort::commit
pub trait StoragePort {
    /// Total size of the region in bytes.
    fn capacity(&self) -> usize;

    /// Fill `buf` from `offset`.
    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Write `data` at `offset` into the shadow.
    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError>;

    /// Persist the shadow.
    fn commit(&mut self) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Result of a configuration load.  Loading never fails outward: every
/// failure path keeps the current in-memory configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A stored document was applied.
    Loaded,
    /// The length prefix was 0 or out of range; nothing stored.
    Absent,
    /// Bytes were present but unreadable or invalid; nothing applied.
    Corrupted,
}

/// Loads and persists system configuration.
pub trait ConfigPort {
    /// Overlay the stored configuration onto `cfg`, or leave it untouched.
    fn load_into(&self, cfg: &mut SystemConfig) -> LoadOutcome;

    /// Validate and persist configuration.
    fn save(&mut self, cfg: &SystemConfig) -> Result<(), ConfigError>;

    /// Merge a remote partial update into the live configuration, persist
    /// it, and reload.
    ///
    /// A patch that would leave the configuration invalid is rejected and
    /// `cfg` is not touched.  A failed save keeps the merged values live.
    fn apply_remote_update(
        &mut self,
        cfg: &mut SystemConfig,
        patch: ConfigPatch,
    ) -> Result<(), ConfigError> {
        if patch.is_empty() {
            log::info!("ConfigStore: empty update ignored");
            return Ok(());
        }
        let mut merged = cfg.clone();
        merged.apply(patch);
        if let Err(e) = merged.validate() {
            log::warn!("ConfigStore: remote update rejected: {}", e);
            return Err(e);
        }
        *cfg = merged;
        self.save(cfg)?;
        self.load_into(cfg);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Messaging port (domain → broker)
// ───────────────────────────────────────────────────────────────

/// Outbound publish channel.  Best-effort, at-most-once.
pub trait PublishPort {
    fn publish(&mut self, topic: Topic, payload: &[u8]) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Monotonic milliseconds since boot.
    fn uptime_ms(&self) -> u64;

    /// Local wall-clock time, `None` until the network clock has synced.
    fn wall_clock(&self) -> Option<WallClock>;
}

// ───────────────────────────────────────────────────────────────
// Device lifecycle port
// ───────────────────────────────────────────────────────────────

/// Whole-device lifecycle actions requested by remote commands.
///
/// On hardware `restart` and `deep_sleep` do not return.
pub trait DevicePort {
    fn restart(&mut self);

    fn deep_sleep(&mut self, secs: u32);

    /// Feed the task watchdog.  Called once per loop iteration.
    fn feed_watchdog(&mut self) {}
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed validation.
    ValidationFailed(&'static str),
    /// The serialized document does not fit the region.
    TooLarge(usize),
    /// Serialization failed.
    Encode,
    /// Underlying storage failed.
    Storage(StorageError),
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Access past the end of the region.
    OutOfBounds,
    /// Reading the backing store failed.
    ReadFailed,
    /// Committing the shadow failed.
    CommitFailed,
}

/// Errors from [`PublishPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// Not connected to the broker.
    NotConnected,
    /// The transport refused the message.
    PublishFailed,
    /// The payload did not fit the outbound buffer.
    PayloadTooLarge,
}

/// A zone index taken from a remote message was out of range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexError {
    pub index: i64,
    pub count: usize,
}

/// Validate a remote index against a bank of `count` zones.
pub fn checked_index(index: i64, count: usize) -> Result<usize, IndexError> {
    usize::try_from(index)
        .ok()
        .filter(|&i| i < count)
        .ok_or(IndexError { index, count })
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::TooLarge(len) => write!(f, "document too large ({} bytes)", len),
            Self::Encode => write!(f, "encode failed"),
            Self::Storage(e) => write!(f, "storage: {}", e),
        }
    }
}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds => write!(f, "out of bounds"),
            Self::ReadFailed => write!(f, "read failed"),
            Self::CommitFailed => write!(f, "commit failed"),
        }
    }
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::PayloadTooLarge => write!(f, "payload too large"),
        }
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index {} out of range (0..{})", self.index, self.count)
    }
}
