//! Loop cadence scheduler.
//!
//! The main loop polls the scheduler once per iteration with the
//! monotonic clock.  Each cadence compares `now` against its own
//! last-fired timestamp, so a slow command handler only delays the next
//! tick and never shifts later ones.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Main loop iteration                  │
//! │                                                          │
//! │  drain inbox ──▶ Scheduler::poll(now) ──▶ Due {          │
//! │                                           control,       │
//! │                                           telemetry,     │
//! │                                           online_ping }  │
//! │                                                          │
//! │   control    every CONTROL_PERIOD_MS    (safety + FSM)   │
//! │   telemetry  every TELEMETRY_PERIOD_MS  (sensor-data)    │
//! │   online     once, ONLINE_DELAY_MS after connect         │
//! └──────────────────────────────────────────────────────────┘
//! ```

use log::debug;

pub const CONTROL_PERIOD_MS: u64 = 10_000;
pub const TELEMETRY_PERIOD_MS: u64 = 5 * 60 * 1000;
pub const ONLINE_DELAY_MS: u64 = 2_000;

// ═══════════════════════════════════════════════════════════════
//  Cadence
// ═══════════════════════════════════════════════════════════════

/// A fixed-period timer driven by monotonic timestamps.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    period_ms: u64,
    last_fired_ms: u64,
}

impl Cadence {
    /// First fires one full period after `now_ms`.
    pub fn new(period_ms: u64, now_ms: u64) -> Self {
        Self {
            period_ms,
            last_fired_ms: now_ms,
        }
    }

    /// Returns `true` and re-arms when a full period has elapsed.
    pub fn due(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_fired_ms) >= self.period_ms {
            self.last_fired_ms = now_ms;
            true
        } else {
            false
        }
    }
}

/// A timer that fires once, `delay_ms` after being armed.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneShot {
    fire_at_ms: Option<u64>,
}

impl OneShot {
    pub fn arm(&mut self, now_ms: u64, delay_ms: u64) {
        self.fire_at_ms = Some(now_ms.saturating_add(delay_ms));
    }

    pub fn due(&mut self, now_ms: u64) -> bool {
        match self.fire_at_ms {
            Some(at) if now_ms >= at => {
                self.fire_at_ms = None;
                true
            }
            _ => false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

/// Which loop tasks are due this iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Due {
    pub control: bool,
    pub telemetry: bool,
    pub online_ping: bool,
}

/// The loop's cadence timers.
pub struct Scheduler {
    control: Cadence,
    telemetry: Cadence,
    online: OneShot,
}

impl Scheduler {
    pub fn new(now_ms: u64) -> Self {
        Self::with_periods(now_ms, CONTROL_PERIOD_MS, TELEMETRY_PERIOD_MS)
    }

    pub fn with_periods(now_ms: u64, control_ms: u64, telemetry_ms: u64) -> Self {
        Self {
            control: Cadence::new(control_ms, now_ms),
            telemetry: Cadence::new(telemetry_ms, now_ms),
            online: OneShot::default(),
        }
    }

    /// Schedule the liveness ping after a (re)connect.
    pub fn on_connected(&mut self, now_ms: u64) {
        self.online.arm(now_ms, ONLINE_DELAY_MS);
    }

    /// Check every timer once.
    pub fn poll(&mut self, now_ms: u64) -> Due {
        let due = Due {
            control: self.control.due(now_ms),
            telemetry: self.telemetry.due(now_ms),
            online_ping: self.online.due(now_ms),
        };
        if due != Due::default() {
            debug!("Scheduler: {:?} at {}ms", due, now_ms);
        }
        due
    }
}
