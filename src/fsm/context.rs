//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the blackboard the state handlers read from and write
//! to: the latest moisture snapshot, the wall clock, the live session, the
//! windows served today and the valve actions queued for the service to
//! apply after the tick.

use heapless::Vec;

use crate::config::{SystemConfig, ZONE_COUNT};
use crate::schedule::{LastWatered, ServedWindows, WallClock};

/// A valve operation requested by a state handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveAction {
    Open(usize),
    Close(usize),
    CloseAll,
}

/// Sequencer milestones, drained by the service and emitted as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Started { window: u16 },
    Advanced { from: usize, to: usize, wet: bool },
    Completed { window: u16 },
    /// Watering was disabled mid-session.
    Abandoned { valve: usize },
    /// Fail-safe ceiling exceeded.
    Aborted { window: u16, valve: usize, elapsed_secs: u64 },
}

/// The live watering session.  Only meaningful while `Active`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WateringSession {
    /// Index of the valve currently open.
    pub valve: usize,
    pub started_ms: u64,
    pub valve_started_ms: u64,
    /// Matched `watering_times` entry.
    pub window: u16,
    /// Day of month the window matched on.
    pub day: u8,
}

const ACTION_QUEUE: usize = 8;
const EVENT_QUEUE: usize = 4;

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Timing --
    pub ticks_in_state: u64,
    pub total_ticks: u64,
    /// Monotonic milliseconds at this tick.
    pub now_ms: u64,
    /// Local wall clock, `None` until synced.
    pub clock: Option<WallClock>,

    // -- Inputs --
    /// Wet/dry per sensor, read before each tick.
    pub moisture_wet: [bool; ZONE_COUNT],

    // -- Configuration --
    pub config: SystemConfig,

    // -- Session --
    pub session: WateringSession,
    /// Windows served today, plus the most recent one.
    pub served: ServedWindows,

    // -- Outputs --
    /// Valve operations to apply, in order.
    pub actions: Vec<ValveAction, ACTION_QUEUE>,
    pub events: Vec<SessionEvent, EVENT_QUEUE>,
}

impl FsmContext {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            ticks_in_state: 0,
            total_ticks: 0,
            now_ms: 0,
            clock: None,
            moisture_wet: [false; ZONE_COUNT],
            config,
            session: WateringSession::default(),
            served: ServedWindows::new(),
            actions: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Queue a valve operation.
    ///
    /// A full queue collapses to a single `CloseAll`, which is always safe.
    pub fn push_action(&mut self, action: ValveAction) {
        if self.actions.push(action).is_err() {
            log::warn!("FSM: valve action queue full, closing all");
            self.actions.clear();
            let _ = self.actions.push(ValveAction::CloseAll);
        }
    }

    pub fn push_event(&mut self, event: SessionEvent) {
        if self.events.push(event).is_err() {
            log::warn!("FSM: event queue full, dropping {:?}", event);
        }
    }

    /// Per-valve watering limit in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        u64::from(self.config.watering_duration_secs) * 1000
    }

    /// Milliseconds the current valve has been open.
    pub fn valve_elapsed_ms(&self) -> u64 {
        self.now_ms.saturating_sub(self.session.valve_started_ms)
    }

    /// Milliseconds since the session opened its first valve.
    pub fn session_elapsed_ms(&self) -> u64 {
        self.now_ms.saturating_sub(self.session.started_ms)
    }

    /// Record the current session's window as served.
    pub fn mark_watered(&mut self) {
        self.served.mark(LastWatered {
            day: self.session.day,
            slot: self.session.window,
        });
    }
}
