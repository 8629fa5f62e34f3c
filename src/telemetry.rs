//! Periodic telemetry reporter.
//!
//! Each telemetry tick publishes a full snapshot on `/{id}/sensor-data`:
//!
//! ```json
//! {"moisture":[false,false,true,false,false],
//!  "valve":[true,false,false,false,false],
//!  "client_name":"SmartGarden-82FA"}
//! ```
//!
//! No deltas: every report stands alone.

use serde::Serialize;

use crate::app::events::AppEvent;
use crate::app::ports::{CommsError, EventSink, MoisturePort, PublishPort, ValvePort};
use crate::app::service::AppService;
use crate::config::ZONE_COUNT;
use crate::rpc::topics::Topic;

#[derive(Debug, Serialize)]
struct SensorData<'a> {
    moisture: [bool; ZONE_COUNT],
    valve: [bool; ZONE_COUNT],
    client_name: &'a str,
}

/// Publishes the zone snapshot.
#[derive(Debug, Default)]
pub struct TelemetryReporter {
    published: u32,
    failed: u32,
}

impl TelemetryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every zone and publish the snapshot.
    ///
    /// A failed publish is counted and returned; the next tick sends a
    /// fresh snapshot rather than retrying this one.
    pub fn report<H, P, E>(
        &mut self,
        app: &AppService,
        hw: &mut H,
        publisher: &mut P,
        sink: &mut E,
    ) -> Result<(), CommsError>
    where
        H: ValvePort + MoisturePort,
        P: PublishPort,
        E: EventSink,
    {
        let snap = app.snapshot(hw);
        sink.emit(&AppEvent::Telemetry(snap));

        let body = SensorData {
            moisture: snap.moisture,
            valve: snap.valve,
            client_name: app.config().mqtt_client_name.as_str(),
        };
        let result = serde_json::to_vec(&body)
            .map_err(|_| CommsError::PayloadTooLarge)
            .and_then(|bytes| publisher.publish(Topic::SensorData, &bytes));

        match result {
            Ok(()) => self.published += 1,
            Err(_) => self.failed += 1,
        }
        result
    }

    pub fn published(&self) -> u32 {
        self.published
    }

    pub fn failed(&self) -> u32 {
        self.failed
    }
}
