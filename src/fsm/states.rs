//! Concrete state handler functions and table builder.
//!
//! ```text
//!  IDLE ──[window open, enabled]──▶ ACTIVE(0) ──▶ ACTIVE(1) ─ … ─▶ ACTIVE(N-1)
//!    ▲                                 │   [duration reached or sensor wet]   │
//!    │                                 │                                      │
//!    ├──────────[disabled]─────────────┤                                      │
//!    ├──────────[last valve done]──────┼──────────────────────────────────────┘
//!    │                                 │
//!    └────────── ABORTING ◀──[ceiling exceeded]
//! ```
//!
//! ABORTING is transient: it closes every valve on entry and hands back to
//! IDLE within the same tick.

use super::context::{FsmContext, SessionEvent, ValveAction, WateringSession};
use super::{StateDescriptor, StateId};
use crate::config::ZONE_COUNT;
use crate::schedule;
use log::{error, info};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: None,
            on_exit: None,
            on_update: idle_update,
            transient: false,
        },
        StateDescriptor {
            id: StateId::Active,
            name: "Active",
            on_enter: Some(active_enter),
            on_exit: Some(active_exit),
            on_update: active_update,
            transient: false,
        },
        StateDescriptor {
            id: StateId::Aborting,
            name: "Aborting",
            on_enter: Some(aborting_enter),
            on_exit: None,
            on_update: aborting_update,
            transient: true,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state
// ═══════════════════════════════════════════════════════════════════════════

fn idle_update(ctx: &mut FsmContext) -> Option<StateId> {
    if !ctx.config.watering_enabled {
        return None;
    }
    let clock = ctx.clock?;
    ctx.served.roll_over(clock.day);
    let window = schedule::should_trigger_window(
        clock.minute_of_day(),
        clock.day,
        &ctx.config,
        &ctx.served,
    )?;

    ctx.session = WateringSession {
        valve: 0,
        started_ms: ctx.now_ms,
        valve_started_ms: ctx.now_ms,
        window,
        day: clock.day,
    };
    Some(StateId::Active)
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACTIVE state: one valve open at a time
// ═══════════════════════════════════════════════════════════════════════════

fn active_enter(ctx: &mut FsmContext) {
    ctx.push_action(ValveAction::Open(ctx.session.valve));
    ctx.push_event(SessionEvent::Started {
        window: ctx.session.window,
    });
    info!(
        "Sequencer: window {} opened, valve {} on for up to {}s",
        ctx.session.window, ctx.session.valve, ctx.config.watering_duration_secs
    );
}

fn active_exit(ctx: &mut FsmContext) {
    ctx.push_action(ValveAction::Close(ctx.session.valve));
}

fn active_update(ctx: &mut FsmContext) -> Option<StateId> {
    let i = ctx.session.valve;

    if !ctx.config.watering_enabled {
        info!("Sequencer: watering disabled, abandoning session at valve {}", i);
        ctx.push_event(SessionEvent::Abandoned { valve: i });
        return Some(StateId::Idle);
    }

    let duration = ctx.duration_ms();
    let valve_ceiling = duration.saturating_mul(2);
    let session_ceiling = valve_ceiling.saturating_mul(ZONE_COUNT as u64);
    if ctx.valve_elapsed_ms() > valve_ceiling || ctx.session_elapsed_ms() > session_ceiling {
        return Some(StateId::Aborting);
    }

    let wet = ctx.moisture_wet.get(i).copied().unwrap_or(false);
    if ctx.valve_elapsed_ms() < duration && !wet {
        return None;
    }

    if i + 1 >= ZONE_COUNT {
        ctx.mark_watered();
        ctx.push_event(SessionEvent::Completed {
            window: ctx.session.window,
        });
        info!(
            "Sequencer: session for window {} complete after {}s",
            ctx.session.window,
            ctx.session_elapsed_ms() / 1000
        );
        return Some(StateId::Idle);
    }

    ctx.push_action(ValveAction::Close(i));
    ctx.push_action(ValveAction::Open(i + 1));
    ctx.session.valve = i + 1;
    ctx.session.valve_started_ms = ctx.now_ms;
    ctx.push_event(SessionEvent::Advanced {
        from: i,
        to: i + 1,
        wet,
    });
    info!(
        "Sequencer: valve {} -> {}{}",
        i,
        i + 1,
        if wet { " (soil wet)" } else { "" }
    );
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  ABORTING state: fail-safe, transient
// ═══════════════════════════════════════════════════════════════════════════

fn aborting_enter(ctx: &mut FsmContext) {
    ctx.push_action(ValveAction::CloseAll);
    ctx.mark_watered();
    let elapsed_secs = ctx.session_elapsed_ms() / 1000;
    ctx.push_event(SessionEvent::Aborted {
        window: ctx.session.window,
        valve: ctx.session.valve,
        elapsed_secs,
    });
    error!(
        "Sequencer: fail-safe abort at valve {} after {}s, all valves closed",
        ctx.session.valve, elapsed_secs
    );
}

fn aborting_update(_ctx: &mut FsmContext) -> Option<StateId> {
    Some(StateId::Idle)
}
