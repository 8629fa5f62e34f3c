//! Command dispatch: raw payload → decode → execute → feedback reply.

use serde_json::json;
use smartgarden::app::events::AppEvent;
use smartgarden::app::service::AppService;
use smartgarden::config::SystemConfig;
use smartgarden::error::Error;
use smartgarden::fsm::StateId;
use smartgarden::rpc::codec::DecodeError;
use smartgarden::rpc::engine::{CommandDispatcher, DispatchPorts};
use smartgarden::rpc::topics::Topic;

use crate::mock_hw::{
    MockClock, MockConfigStore, MockZones, RecordingDevice, RecordingPublisher, RecordingSink,
};

struct Rig {
    app: AppService,
    zones: MockZones,
    store: MockConfigStore,
    publisher: RecordingPublisher,
    device: RecordingDevice,
    clock: MockClock,
    sink: RecordingSink,
    dispatcher: CommandDispatcher,
}

impl Rig {
    fn new() -> Self {
        let mut sink = RecordingSink::new();
        let mut app = AppService::new(SystemConfig::default());
        app.start(&mut sink);
        Self {
            app,
            zones: MockZones::new(),
            store: MockConfigStore::default(),
            publisher: RecordingPublisher::new(),
            device: RecordingDevice::default(),
            clock: MockClock::unsynced(),
            sink,
            dispatcher: CommandDispatcher::new(),
        }
    }

    fn send(&mut self, payload: &str) -> smartgarden::error::Result<()> {
        let mut ports = DispatchPorts {
            hw: &mut self.zones,
            config: &mut self.store,
            publisher: &mut self.publisher,
            device: &mut self.device,
            clock: &self.clock,
        };
        self.dispatcher
            .handle(payload.as_bytes(), &mut self.app, &mut ports, &mut self.sink)
    }
}

// ── Queries ──────────────────────────────────────────────────

#[test]
fn get_valve_status_reports_live_valve() {
    let mut rig = Rig::new();
    rig.zones.valves[3] = true;

    rig.send(r#"{"command":"get_valve_status","valve":3}"#).unwrap();

    assert_eq!(
        rig.publisher.last_feedback().unwrap(),
        json!({"command": "valve_status", "valve": 3, "status": true})
    );
}

#[test]
fn get_moisture_sensor_reports_wet_flag() {
    let mut rig = Rig::new();
    rig.zones.wet[4] = true;

    rig.send(r#"{"command":"get_moisture_sensor","sensor":4}"#).unwrap();

    assert_eq!(
        rig.publisher.last_feedback().unwrap(),
        json!({"command": "moisture_sensor", "sensor": 4, "moisture": true})
    );
}

#[test]
fn get_uptime_reports_seconds() {
    let mut rig = Rig::new();
    rig.clock.advance_secs(42);

    rig.send(r#"{"command":"get_uptime"}"#).unwrap();

    assert_eq!(
        rig.publisher.last_feedback().unwrap(),
        json!({"command": "uptime", "uptime": 1042})
    );
}

#[test]
fn get_status_flattens_every_zone() {
    let mut rig = Rig::new();
    rig.zones.valves[0] = true;
    rig.zones.wet[2] = true;

    rig.send(r#"{"command":"get_status"}"#).unwrap();

    let reply = rig.publisher.last_feedback().unwrap();
    assert_eq!(reply["command"], "status");
    assert_eq!(reply["uptime"], 1000);
    assert_eq!(reply["valve0"], true);
    assert_eq!(reply["valve1"], false);
    assert_eq!(reply["moisture2"], true);
    assert_eq!(reply["moisture4"], false);
}

#[test]
fn get_config_includes_every_key() {
    let mut rig = Rig::new();

    rig.send(r#"{"command":"get_config"}"#).unwrap();

    let reply = rig.publisher.last_feedback().unwrap();
    assert_eq!(reply["command"], "config");
    assert_eq!(reply["watering_duration"], 300);
    assert_eq!(reply["watering_interval"], 30);
    assert_eq!(reply["watering_times"], json!([420, 1020]));
    assert_eq!(reply["ssid"], "Flamingo");
    assert_eq!(reply["mqtt_client_name"], "SmartGarden-82FA");
}

// ── Actuation ────────────────────────────────────────────────

#[test]
fn open_and_close_valve_drive_hardware_without_reply() {
    let mut rig = Rig::new();

    rig.send(r#"{"command":"open_valve","valve":2}"#).unwrap();
    assert!(rig.zones.valves[2]);
    rig.send(r#"{"command":"close_valve","valve":2}"#).unwrap();
    assert!(!rig.zones.valves[2]);

    assert!(rig.publisher.sent.is_empty());
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::ValveForced { valve: 2, open: true })
    );
}

#[test]
fn out_of_range_index_gets_error_reply() {
    let mut rig = Rig::new();

    let err = rig.send(r#"{"command":"open_valve","valve":7}"#).unwrap_err();
    assert!(matches!(err, Error::Index(_)));
    assert!(rig.zones.calls.is_empty());
    assert_eq!(
        rig.publisher.last_feedback().unwrap(),
        json!({
            "command": "error",
            "request": "open_valve",
            "error": "index out of range",
            "index": 7
        })
    );

    rig.send(r#"{"command":"get_moisture_sensor","sensor":-1}"#)
        .unwrap_err();
    assert_eq!(rig.publisher.last_feedback().unwrap()["index"], -1);
    assert_eq!(rig.dispatcher.stats().rejected, 2);
}

// ── Rejected input ───────────────────────────────────────────

#[test]
fn malformed_and_unknown_messages_are_dropped_silently() {
    let mut rig = Rig::new();

    assert_eq!(
        rig.send("not json").unwrap_err(),
        Error::Decode(DecodeError::Malformed)
    );
    assert_eq!(
        rig.send(r#"{"valve":1}"#).unwrap_err(),
        Error::Decode(DecodeError::MissingCommand)
    );
    assert!(matches!(
        rig.send(r#"{"command":"water_lawn"}"#).unwrap_err(),
        Error::Decode(DecodeError::Unknown(_))
    ));
    assert!(matches!(
        rig.send(r#"{"command":"open_valve","valve":"two"}"#).unwrap_err(),
        Error::Decode(DecodeError::InvalidFields(_))
    ));

    assert!(rig.publisher.sent.is_empty());
    assert!(rig.zones.calls.is_empty());
}

#[test]
fn publish_failure_does_not_fail_the_command() {
    let mut rig = Rig::new();
    rig.publisher.connected = false;

    rig.send(r#"{"command":"get_uptime"}"#).unwrap();
    assert_eq!(rig.dispatcher.stats().replies, 0);
    assert_eq!(rig.dispatcher.stats().handled, 1);
}

// ── Configuration ────────────────────────────────────────────

#[test]
fn set_config_merges_and_persists() {
    let mut rig = Rig::new();

    rig.send(r#"{"command":"set_config","watering_duration":120,"watering_times":[360]}"#)
        .unwrap();

    let cfg = rig.app.config();
    assert_eq!(cfg.watering_duration_secs, 120);
    assert_eq!(cfg.watering_times.as_slice(), &[360]);
    assert_eq!(cfg.watering_interval_secs, 30);
    assert_eq!(rig.store.saves, 1);
    assert_eq!(rig.store.stored.as_ref(), Some(cfg));
    assert!(rig.sink.events.contains(&AppEvent::ConfigUpdated));
    assert!(rig.publisher.sent.is_empty());
}

#[test]
fn set_config_rejecting_zero_duration_keeps_live_config() {
    let mut rig = Rig::new();

    let err = rig
        .send(r#"{"command":"set_config","watering_duration":0,"watering_enabled":false}"#)
        .unwrap_err();

    assert!(matches!(err, Error::Config(_)));
    assert_eq!(rig.app.config(), &SystemConfig::default());
    assert_eq!(rig.store.saves, 0);
}

#[test]
fn set_config_with_failed_save_keeps_merged_values() {
    let mut rig = Rig::new();
    rig.store.fail_saves = true;

    rig.send(r#"{"command":"set_config","watering_enabled":false}"#)
        .unwrap_err();
    assert!(!rig.app.config().watering_enabled);
}

// ── Lifecycle ────────────────────────────────────────────────

#[test]
fn shutdown_closes_valves_then_sleeps() {
    let mut rig = Rig::new();
    rig.zones.valves = [true, false, true, false, false];

    rig.send(r#"{"command":"shutdown","time":3600}"#).unwrap();

    assert_eq!(rig.zones.open_count(), 0);
    assert_eq!(rig.device.sleeps, vec![3600]);
    assert_eq!(rig.app.state(), StateId::Idle);
    assert!(rig.sink.events.contains(&AppEvent::ShuttingDown));
}

#[test]
fn restart_closes_valves_then_restarts() {
    let mut rig = Rig::new();
    rig.zones.valves[4] = true;

    rig.send(r#"{"command":"restart"}"#).unwrap();

    assert_eq!(rig.zones.open_count(), 0);
    assert_eq!(rig.device.restarts, 1);
}

#[test]
fn replies_go_to_feedback_topic_only() {
    let mut rig = Rig::new();
    rig.send(r#"{"command":"get_uptime"}"#).unwrap();
    rig.send(r#"{"command":"get_status"}"#).unwrap();
    assert!(rig.publisher.sent.iter().all(|(t, _)| *t == Topic::Feedback));
}
