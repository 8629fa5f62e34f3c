//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService), the command dispatcher
//! and the telemetry reporter emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them; on the device they go to the log.

use crate::config::ZONE_COUNT;
use crate::fsm::StateId;
use crate::fsm::context::SessionEvent;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The application service has started (carries initial state).
    Started(StateId),

    /// The sequencer moved between states.
    StateChanged { from: StateId, to: StateId },

    /// A sequencer milestone (start, advance, completion, abort).
    Session(SessionEvent),

    /// The safety sweep closed the valves in this bitmask.
    SafetyClosed(u8),

    /// A remote command drove a valve directly.
    ValveForced { valve: usize, open: bool },

    /// A remote update changed the live configuration.
    ConfigUpdated,

    /// All valves closed ahead of a restart or deep sleep.
    ShuttingDown,

    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),
}

/// A point-in-time zone snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryData {
    pub state: StateId,
    pub moisture: [bool; ZONE_COUNT],
    pub valve: [bool; ZONE_COUNT],
}
