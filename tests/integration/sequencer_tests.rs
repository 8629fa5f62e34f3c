//! Watering sequencer scenarios: AppService → FSM → valves, driven by a
//! mock clock in 10 s control ticks.

use smartgarden::app::events::AppEvent;
use smartgarden::app::service::AppService;
use smartgarden::config::{SystemConfig, WateringTimes};
use smartgarden::fsm::StateId;
use smartgarden::fsm::context::SessionEvent;
use smartgarden::schedule::LastWatered;

use crate::mock_hw::{MockClock, MockZones, RecordingSink};

const TICK_SECS: u64 = 10;

/// Default configuration with a single 07:00 start time.
fn morning_only() -> SystemConfig {
    let mut cfg = SystemConfig::default();
    cfg.watering_times = WateringTimes::from_slice(&[420]).unwrap();
    cfg
}

fn setup(cfg: SystemConfig) -> (AppService, MockZones, MockClock, RecordingSink) {
    let mut app = AppService::new(cfg);
    let mut sink = RecordingSink::new();
    app.start(&mut sink);
    (app, MockZones::new(), MockClock::in_morning_window(), sink)
}

fn step(app: &mut AppService, zones: &mut MockZones, clock: &MockClock, sink: &mut RecordingSink) {
    clock.advance_secs(TICK_SECS);
    app.tick(zones, clock, sink);
}

// ── Full session ─────────────────────────────────────────────

#[test]
fn default_session_waters_each_zone_in_turn() {
    let (mut app, mut zones, clock, mut sink) = setup(morning_only());

    app.tick(&mut zones, &clock, &mut sink);
    assert_eq!(app.state(), StateId::Active);
    assert_eq!(zones.only_open(), Some(0));
    let start_ms = clock.now_ms();

    for n in 1..150 {
        step(&mut app, &mut zones, &clock, &mut sink);
        assert_eq!(app.state(), StateId::Active, "still watering at tick {}", n);
        let expected = (n * TICK_SECS / 300) as usize;
        assert_eq!(zones.only_open(), Some(expected), "tick {}", n);
    }

    step(&mut app, &mut zones, &clock, &mut sink);
    assert_eq!(clock.now_ms() - start_ms, 1_500_000);
    assert_eq!(app.state(), StateId::Idle);
    assert_eq!(zones.open_count(), 0);
    assert_eq!(zones.opens(), vec![0, 1, 2, 3, 4]);
    assert_eq!(zones.peak_open, 1);
    assert_eq!(
        app.last_watered(),
        Some(LastWatered {
            day: 12,
            slot: 420
        })
    );
    assert!(
        sink.events
            .contains(&AppEvent::Session(SessionEvent::Completed { window: 420 }))
    );
}

#[test]
fn served_window_is_not_repeated() {
    let (mut app, mut zones, clock, mut sink) = setup(morning_only());
    app.tick(&mut zones, &clock, &mut sink);
    for _ in 0..150 {
        step(&mut app, &mut zones, &clock, &mut sink);
    }
    assert_eq!(app.state(), StateId::Idle);

    for _ in 0..20 {
        step(&mut app, &mut zones, &clock, &mut sink);
        assert_eq!(app.state(), StateId::Idle);
    }
    assert_eq!(zones.opens().len(), 5);
}

#[test]
fn each_slot_waters_once_across_a_dry_day() {
    let mut app = AppService::new(SystemConfig::default());
    let mut sink = RecordingSink::new();
    app.start(&mut sink);
    let mut zones = MockZones::new();
    let mut clock = MockClock::at(0, 0, 12);

    for tick in 0..(24 * 3600 / TICK_SECS) {
        let secs = tick * TICK_SECS;
        clock.set_wall((secs / 3600) as u8, ((secs % 3600) / 60) as u8, 12);
        step(&mut app, &mut zones, &clock, &mut sink);
        assert!(zones.open_count() <= 1);
    }

    let started = |slot: u16| {
        sink.count(|e| *e == AppEvent::Session(SessionEvent::Started { window: slot }))
    };
    assert_eq!(started(420), 1);
    assert_eq!(started(1020), 1);
    assert_eq!(zones.opens().len(), 10);
}

// ── Early termination ────────────────────────────────────────

#[test]
fn wet_zone_advances_early() {
    let (mut app, mut zones, clock, mut sink) = setup(morning_only());
    app.tick(&mut zones, &clock, &mut sink);

    // Valve 2 opens at +600 s.
    for _ in 0..64 {
        step(&mut app, &mut zones, &clock, &mut sink);
    }
    assert_eq!(zones.only_open(), Some(2));

    zones.wet[2] = true;
    step(&mut app, &mut zones, &clock, &mut sink);
    assert_eq!(app.state(), StateId::Active);
    assert_eq!(zones.only_open(), Some(3));
    assert_eq!(app.session().map(|s| s.valve), Some(3));
    assert!(sink.events.contains(&AppEvent::Session(SessionEvent::Advanced {
        from: 2,
        to: 3,
        wet: true
    })));

    // Valve 3 runs its full duration from +650 s.
    for _ in 0..29 {
        step(&mut app, &mut zones, &clock, &mut sink);
    }
    assert_eq!(zones.only_open(), Some(3));
    step(&mut app, &mut zones, &clock, &mut sink);
    assert_eq!(zones.only_open(), Some(4));
}

#[test]
fn safety_sweep_closes_wet_open_valve_while_idle() {
    let (mut app, mut zones, _, mut sink) = setup(morning_only());
    let clock = MockClock::unsynced();

    zones.valves[1] = true;
    zones.wet[1] = true;
    app.tick(&mut zones, &clock, &mut sink);

    assert!(!zones.valves[1]);
    assert!(sink.events.contains(&AppEvent::SafetyClosed(0b0010)));
    assert_eq!(app.safety_closures(), 1);
}

// ── Fail-safe ────────────────────────────────────────────────

#[test]
fn stalled_valve_triggers_abort_and_closes_everything() {
    let (mut app, mut zones, clock, mut sink) = setup(morning_only());
    app.tick(&mut zones, &clock, &mut sink);
    assert_eq!(zones.only_open(), Some(0));

    // The loop stalls past twice the valve duration.
    clock.advance_secs(601);
    app.tick(&mut zones, &clock, &mut sink);

    assert_eq!(app.state(), StateId::Idle);
    assert_eq!(zones.open_count(), 0);
    assert_eq!(
        app.last_watered(),
        Some(LastWatered {
            day: 12,
            slot: 420
        })
    );
    assert!(sink.events.contains(&AppEvent::Session(SessionEvent::Aborted {
        window: 420,
        valve: 0,
        elapsed_secs: 601
    })));
    assert!(sink.events.contains(&AppEvent::StateChanged {
        from: StateId::Active,
        to: StateId::Idle
    }));
}

#[test]
fn exactly_twice_duration_still_advances() {
    let (mut app, mut zones, clock, mut sink) = setup(morning_only());
    app.tick(&mut zones, &clock, &mut sink);

    clock.advance_secs(600);
    app.tick(&mut zones, &clock, &mut sink);
    assert_eq!(app.state(), StateId::Active);
    assert_eq!(zones.only_open(), Some(1));
}

// ── Enable flag ──────────────────────────────────────────────

#[test]
fn disabling_mid_session_closes_valve_without_marking() {
    let (mut app, mut zones, clock, mut sink) = setup(morning_only());
    app.tick(&mut zones, &clock, &mut sink);
    for _ in 0..35 {
        step(&mut app, &mut zones, &clock, &mut sink);
    }
    assert_eq!(zones.only_open(), Some(1));

    app.config_mut().watering_enabled = false;
    step(&mut app, &mut zones, &clock, &mut sink);

    assert_eq!(app.state(), StateId::Idle);
    assert_eq!(zones.open_count(), 0);
    assert_eq!(app.last_watered(), None);
    assert!(
        sink.events
            .contains(&AppEvent::Session(SessionEvent::Abandoned { valve: 1 }))
    );
}

#[test]
fn disabled_controller_never_starts() {
    let mut cfg = morning_only();
    cfg.watering_enabled = false;
    let (mut app, mut zones, clock, mut sink) = setup(cfg);

    for _ in 0..10 {
        step(&mut app, &mut zones, &clock, &mut sink);
    }
    assert_eq!(app.state(), StateId::Idle);
    assert!(zones.calls.is_empty());
}

#[test]
fn unsynced_clock_never_starts() {
    let (mut app, mut zones, _, mut sink) = setup(morning_only());
    let clock = MockClock::unsynced();
    for _ in 0..10 {
        step(&mut app, &mut zones, &clock, &mut sink);
    }
    assert_eq!(app.state(), StateId::Idle);
    assert!(zones.calls.is_empty());
}

// ── Shutdown ─────────────────────────────────────────────────

#[test]
fn stop_all_closes_valves_and_leaves_window_unserved() {
    let (mut app, mut zones, clock, mut sink) = setup(morning_only());
    app.tick(&mut zones, &clock, &mut sink);
    assert_eq!(zones.open_count(), 1);

    app.stop_all(&mut zones, &mut sink);
    assert_eq!(app.state(), StateId::Idle);
    assert_eq!(zones.open_count(), 0);
    assert_eq!(app.last_watered(), None);
    assert_eq!(sink.events.last(), Some(&AppEvent::ShuttingDown));
}
