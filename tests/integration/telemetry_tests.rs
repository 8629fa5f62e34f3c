//! Telemetry snapshots on the sensor-data topic.

use serde_json::json;
use smartgarden::adapters::mqtt::announce_online;
use smartgarden::app::events::AppEvent;
use smartgarden::app::ports::CommsError;
use smartgarden::app::service::AppService;
use smartgarden::config::SystemConfig;
use smartgarden::rpc::topics::Topic;
use smartgarden::telemetry::TelemetryReporter;

use crate::mock_hw::{MockZones, RecordingPublisher, RecordingSink};

#[test]
fn report_publishes_full_snapshot() {
    let app = AppService::new(SystemConfig::default());
    let mut zones = MockZones::new();
    zones.valves[0] = true;
    zones.wet[3] = true;
    let mut publisher = RecordingPublisher::new();
    let mut sink = RecordingSink::new();
    let mut reporter = TelemetryReporter::new();

    reporter
        .report(&app, &mut zones, &mut publisher, &mut sink)
        .unwrap();

    assert_eq!(
        publisher.json_on(Topic::SensorData),
        vec![json!({
            "moisture": [false, false, false, true, false],
            "valve": [true, false, false, false, false],
            "client_name": "SmartGarden-82FA"
        })]
    );
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Telemetry(_))), 1);
    assert_eq!(reporter.published(), 1);
}

#[test]
fn failed_report_is_counted_not_retried() {
    let app = AppService::new(SystemConfig::default());
    let mut zones = MockZones::new();
    let mut publisher = RecordingPublisher::new();
    publisher.connected = false;
    let mut sink = RecordingSink::new();
    let mut reporter = TelemetryReporter::new();

    assert_eq!(
        reporter.report(&app, &mut zones, &mut publisher, &mut sink),
        Err(CommsError::NotConnected)
    );
    assert_eq!(reporter.failed(), 1);
    assert!(publisher.sent.is_empty());
}

#[test]
fn online_marker_goes_to_status_topic() {
    let mut publisher = RecordingPublisher::new();
    announce_online(&mut publisher);
    assert_eq!(publisher.sent, vec![(Topic::Status, b"Online".to_vec())]);
}

#[test]
fn failed_report_still_logs_snapshot_and_next_tick_recovers() {
    let app = AppService::new(SystemConfig::default());
    let mut zones = MockZones::new();
    let mut publisher = RecordingPublisher::new();
    publisher.connected = false;
    let mut sink = RecordingSink::new();
    let mut reporter = TelemetryReporter::new();

    assert!(reporter.report(&app, &mut zones, &mut publisher, &mut sink).is_err());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Telemetry(_))), 1);

    publisher.connected = true;
    zones.wet[3] = true;
    reporter.report(&app, &mut zones, &mut publisher, &mut sink).unwrap();

    assert_eq!((reporter.published(), reporter.failed()), (1, 1));
    let sent = publisher.json_on(Topic::SensorData);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["moisture"][3], true);
}
