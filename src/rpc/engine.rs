//! Command dispatcher: executes decoded commands against the AppService.
//!
//! **Transport-decoupled**: the dispatcher does not own the MQTT client.
//! The main loop drains raw payloads from the inbox and feeds them to
//! [`CommandDispatcher::handle`] one at a time, strictly between control
//! ticks.  Every message passes through three steps:
//!
//! 1. **Decode**: the validating codec rejects malformed, untagged and
//!    unknown messages without touching any state.
//! 2. **Bounds check**: zone indices are checked against the bank size
//!    before any valve or sensor access; out-of-range gets an error reply.
//! 3. **Execute**: the effect is applied and, for queries, a reply is
//!    published on the feedback topic (best effort).

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{
    ClockPort, ConfigPort, DevicePort, EventSink, MoisturePort, PublishPort, ValvePort,
    checked_index,
};
use crate::app::service::AppService;
use crate::error::{Error, Result};

use super::codec::{DecodeError, decode_command};
use super::command::Command;
use super::reply::{Reply, StatusReport};
use super::topics::Topic;

/// Everything a command may touch besides the service itself.
pub struct DispatchPorts<'a, H, C, P, D, K> {
    pub hw: &'a mut H,
    pub config: &'a mut C,
    pub publisher: &'a mut P,
    pub device: &'a mut D,
    pub clock: &'a K,
}

/// Counters kept across messages.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub handled: u32,
    pub rejected: u32,
    pub replies: u32,
}

/// Synchronous inbound command dispatcher.
#[derive(Debug, Default)]
pub struct CommandDispatcher {
    stats: DispatchStats,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Decode and execute one inbound payload.
    ///
    /// Rejections are logged here; the returned error is for callers that
    /// want to inspect it.  Publish failures are logged and do not fail the
    /// command.
    pub fn handle<H, C, P, D, K>(
        &mut self,
        payload: &[u8],
        app: &mut AppService,
        ports: &mut DispatchPorts<'_, H, C, P, D, K>,
        sink: &mut impl EventSink,
    ) -> Result<()>
    where
        H: ValvePort + MoisturePort,
        C: ConfigPort,
        P: PublishPort,
        D: DevicePort,
        K: ClockPort,
    {
        let result = decode_command(payload)
            .map_err(Error::from)
            .and_then(|cmd| self.execute(cmd, app, ports, sink));
        match &result {
            Ok(()) => self.stats.handled += 1,
            Err(e) => {
                self.stats.rejected += 1;
                match e {
                    Error::Decode(DecodeError::Unknown(_)) => info!("RPC: ignored: {}", e),
                    _ => warn!("RPC: rejected: {}", e),
                }
            }
        }
        result
    }

    fn execute<H, C, P, D, K>(
        &mut self,
        cmd: Command,
        app: &mut AppService,
        ports: &mut DispatchPorts<'_, H, C, P, D, K>,
        sink: &mut impl EventSink,
    ) -> Result<()>
    where
        H: ValvePort + MoisturePort,
        C: ConfigPort,
        P: PublishPort,
        D: DevicePort,
        K: ClockPort,
    {
        let request = cmd.name();
        debug!("RPC: {}", request);

        match cmd {
            Command::OpenValve { valve } | Command::CloseValve { valve } => {
                let open = request == "open_valve";
                let i = self.zone(request, valve, ports.hw.valve_count(), ports.publisher)?;
                if open {
                    ports.hw.open(i);
                } else {
                    ports.hw.close(i);
                }
                info!("RPC: valve {} forced {}", i, if open { "open" } else { "closed" });
                sink.emit(&AppEvent::ValveForced { valve: i, open });
            }
            Command::GetMoistureSensor { sensor } => {
                let i = self.zone(request, sensor, ports.hw.sensor_count(), ports.publisher)?;
                let moisture = ports.hw.is_wet(i);
                self.reply(ports.publisher, &Reply::MoistureSensor { sensor: i, moisture });
            }
            Command::GetValveStatus { valve } => {
                let i = self.zone(request, valve, ports.hw.valve_count(), ports.publisher)?;
                let status = ports.hw.is_open(i);
                self.reply(ports.publisher, &Reply::ValveStatus { valve: i, status });
            }
            Command::GetConfig => {
                self.reply(ports.publisher, &Reply::Config(app.config()));
            }
            Command::SetConfig(patch) => {
                ports.config.apply_remote_update(app.config_mut(), patch)?;
                sink.emit(&AppEvent::ConfigUpdated);
            }
            Command::GetUptime => {
                let uptime = ports.clock.uptime_ms() / 1000;
                self.reply(ports.publisher, &Reply::Uptime { uptime });
            }
            Command::GetStatus => {
                let snap = app.snapshot(ports.hw);
                let report = StatusReport {
                    uptime: ports.clock.uptime_ms() / 1000,
                    moisture: snap.moisture,
                    valve: snap.valve,
                };
                self.reply(ports.publisher, &Reply::Status(report));
            }
            Command::Shutdown { time } => {
                info!("RPC: shutting down for {}s", time);
                app.stop_all(ports.hw, sink);
                ports.device.deep_sleep(time);
            }
            Command::Restart => {
                info!("RPC: restarting");
                app.stop_all(ports.hw, sink);
                ports.device.restart();
            }
        }
        Ok(())
    }

    /// Validate a remote zone index, replying with an error when it is out
    /// of range.
    fn zone<P: PublishPort>(
        &mut self,
        request: &'static str,
        index: i64,
        count: usize,
        publisher: &mut P,
    ) -> Result<usize> {
        checked_index(index, count).map_err(|e| {
            self.reply(
                publisher,
                &Reply::Error {
                    request,
                    error: "index out of range",
                    index,
                },
            );
            Error::from(e)
        })
    }

    fn reply<P: PublishPort>(&mut self, publisher: &mut P, reply: &Reply<'_>) {
        let Some(bytes) = reply.encode() else {
            warn!("RPC: reply too large, dropped");
            return;
        };
        match publisher.publish(Topic::Feedback, &bytes) {
            Ok(()) => self.stats.replies += 1,
            Err(e) => warn!("RPC: feedback publish failed: {}", e),
        }
    }
}
