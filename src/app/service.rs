//! Application service, the hexagonal core.
//!
//! [`AppService`] owns the sequencer FSM, the safety supervisor and the
//! live configuration.  All I/O flows through port traits injected at call
//! sites, so the whole service runs against mock adapters in tests.
//!
//! ```text
//!  MoisturePort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                   │       AppService        │
//!    ValvePort ◀────│  Safety · FSM · Config  │◀── ClockPort
//!                   └────────────────────────┘
//! ```

use log::{info, warn};

use crate::config::{SystemConfig, ZONE_COUNT};
use crate::fsm::context::{FsmContext, ValveAction, WateringSession};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::safety::SafetySupervisor;
use crate::schedule::LastWatered;

use super::events::{AppEvent, TelemetryData};
use super::ports::{ClockPort, EventSink, MoisturePort, ValvePort};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    fsm: Fsm,
    ctx: FsmContext,
    safety: SafetySupervisor,
    tick_count: u64,
}

impl AppService {
    /// Construct the service from configuration.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: SystemConfig) -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), StateId::Idle),
            ctx: FsmContext::new(config),
            safety: SafetySupervisor::new(),
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!("AppService started in {:?}", self.fsm.current_state());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control tick: safety sweep → read sensors → FSM → valves.
    ///
    /// The `hw` parameter satisfies **both** [`ValvePort`] and
    /// [`MoisturePort`], so one expander handle serves both sides.
    pub fn tick<H, K, E>(&mut self, hw: &mut H, clock: &K, sink: &mut E)
    where
        H: ValvePort + MoisturePort,
        K: ClockPort,
        E: EventSink,
    {
        self.tick_count += 1;
        let prev_state = self.fsm.current_state();

        // 1. Safety sweep, independent of session state.
        let closed = self.safety.sweep(hw);
        if closed != 0 {
            sink.emit(&AppEvent::SafetyClosed(closed));
        }

        // 2. Inputs
        self.ctx.now_ms = clock.uptime_ms();
        self.ctx.clock = clock.wall_clock();
        for (i, wet) in self.ctx.moisture_wet.iter_mut().enumerate() {
            *wet = hw.is_wet(i);
        }

        // 3. FSM tick (pure state logic)
        self.fsm.tick(&mut self.ctx);

        // 4. Apply valve actions via ValvePort
        self.apply_actions(hw);

        // 5. Events
        self.flush_events(sink);
        let new_state = self.fsm.current_state();
        if new_state != prev_state {
            sink.emit(&AppEvent::StateChanged {
                from: prev_state,
                to: new_state,
            });
        }
    }

    /// Close every valve and drop any running session.
    ///
    /// Used before restart and deep sleep.  The window is not marked as
    /// served.
    pub fn stop_all(&mut self, hw: &mut impl ValvePort, sink: &mut impl EventSink) {
        let prev = self.fsm.current_state();
        if prev != StateId::Idle {
            warn!("AppService: stopping session at valve {}", self.ctx.session.valve);
            self.fsm.force_transition(StateId::Idle, &mut self.ctx);
        }
        self.ctx.actions.clear();
        self.ctx.events.clear();
        hw.close_all();
        if prev != StateId::Idle {
            sink.emit(&AppEvent::StateChanged {
                from: prev,
                to: StateId::Idle,
            });
        }
        sink.emit(&AppEvent::ShuttingDown);
    }

    // ── Queries ───────────────────────────────────────────────

    /// Read every sensor and valve now.
    pub fn snapshot<H: ValvePort + MoisturePort>(&self, hw: &mut H) -> TelemetryData {
        let mut data = TelemetryData {
            state: self.fsm.current_state(),
            moisture: [false; ZONE_COUNT],
            valve: [false; ZONE_COUNT],
        };
        for i in 0..ZONE_COUNT {
            data.moisture[i] = hw.is_wet(i);
            data.valve[i] = hw.is_open(i);
        }
        data
    }

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    /// Live session; only meaningful while [`StateId::Active`].
    pub fn session(&self) -> Option<&WateringSession> {
        (self.fsm.current_state() == StateId::Active).then_some(&self.ctx.session)
    }

    pub fn last_watered(&self) -> Option<LastWatered> {
        self.ctx.served.last()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Valves closed by the safety sweep since boot.
    pub fn safety_closures(&self) -> u32 {
        self.safety.total_closed()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.ctx.config
    }

    /// Mutable access for remote configuration updates.  Changes take
    /// effect on the next control tick.
    pub fn config_mut(&mut self) -> &mut SystemConfig {
        &mut self.ctx.config
    }

    // ── Internal ──────────────────────────────────────────────

    fn apply_actions(&mut self, hw: &mut impl ValvePort) {
        for action in self.ctx.actions.iter() {
            match *action {
                ValveAction::Open(i) => hw.open(i),
                ValveAction::Close(i) => hw.close(i),
                ValveAction::CloseAll => hw.close_all(),
            }
        }
        self.ctx.actions.clear();
    }

    fn flush_events(&mut self, sink: &mut impl EventSink) {
        for event in self.ctx.events.iter() {
            sink.emit(&AppEvent::Session(*event));
        }
        self.ctx.events.clear();
    }
}
