//! Mock adapters for integration tests.
//!
//! Records every valve call and every outbound message so tests can
//! assert on the full history without touching the I/O expander or the
//! broker.

use std::cell::Cell;

use serde_json::Value;
use smartgarden::app::events::AppEvent;
use smartgarden::app::ports::{
    ClockPort, CommsError, ConfigError, ConfigPort, DevicePort, EventSink, LoadOutcome,
    MoisturePort, PublishPort, ValvePort,
};
use smartgarden::config::{SystemConfig, ZONE_COUNT};
use smartgarden::rpc::topics::Topic;
use smartgarden::schedule::WallClock;

// ── Valve call record ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveCall {
    Open(usize),
    Close(usize),
}

// ── MockZones ─────────────────────────────────────────────────

/// Five valves and five sensors held in memory.
pub struct MockZones {
    pub valves: [bool; ZONE_COUNT],
    pub wet: [bool; ZONE_COUNT],
    pub calls: Vec<ValveCall>,
    /// Highest number of valves seen open at once.
    pub peak_open: usize,
}

#[allow(dead_code)]
impl MockZones {
    pub fn new() -> Self {
        Self {
            valves: [false; ZONE_COUNT],
            wet: [false; ZONE_COUNT],
            calls: Vec::new(),
            peak_open: 0,
        }
    }

    pub fn open_count(&self) -> usize {
        self.valves.iter().filter(|&&v| v).count()
    }

    /// Index of the only open valve, `None` if zero or several are open.
    pub fn only_open(&self) -> Option<usize> {
        let mut open = self.valves.iter().enumerate().filter(|(_, v)| **v);
        match (open.next(), open.next()) {
            (Some((i, _)), None) => Some(i),
            _ => None,
        }
    }

    pub fn opens(&self) -> Vec<usize> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ValveCall::Open(i) => Some(*i),
                ValveCall::Close(_) => None,
            })
            .collect()
    }
}

impl Default for MockZones {
    fn default() -> Self {
        Self::new()
    }
}

impl ValvePort for MockZones {
    fn valve_count(&self) -> usize {
        ZONE_COUNT
    }

    fn open(&mut self, index: usize) {
        self.calls.push(ValveCall::Open(index));
        self.valves[index] = true;
        self.peak_open = self.peak_open.max(self.open_count());
    }

    fn close(&mut self, index: usize) {
        self.calls.push(ValveCall::Close(index));
        self.valves[index] = false;
    }

    fn is_open(&mut self, index: usize) -> bool {
        self.valves[index]
    }
}

impl MoisturePort for MockZones {
    fn sensor_count(&self) -> usize {
        ZONE_COUNT
    }

    fn is_wet(&mut self, index: usize) -> bool {
        self.wet[index]
    }
}

// ── MockClock ─────────────────────────────────────────────────

/// Monotonic clock driven by the test, with a fixed wall-clock reading.
pub struct MockClock {
    now_ms: Cell<u64>,
    pub wall: Option<WallClock>,
}

#[allow(dead_code)]
impl MockClock {
    /// Inside the 07:00 window on the 12th: 07:10, or 20:21 on the legacy
    /// clock (20 × 21 = 420).
    pub fn in_morning_window() -> Self {
        #[cfg(not(feature = "legacy-clock"))]
        let (hours, minutes) = (7, 10);
        #[cfg(feature = "legacy-clock")]
        let (hours, minutes) = (20, 21);
        Self::at(hours, minutes, 12)
    }

    pub fn at(hours: u8, minutes: u8, day: u8) -> Self {
        Self {
            now_ms: Cell::new(1_000_000),
            wall: Some(WallClock {
                hours,
                minutes,
                day,
            }),
        }
    }

    /// Move the wall clock along with the monotonic one.
    pub fn set_wall(&mut self, hours: u8, minutes: u8, day: u8) {
        self.wall = Some(WallClock {
            hours,
            minutes,
            day,
        });
    }

    pub fn unsynced() -> Self {
        Self {
            now_ms: Cell::new(1_000_000),
            wall: None,
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }

    pub fn advance_secs(&self, secs: u64) {
        self.now_ms.set(self.now_ms.get() + secs * 1000);
    }
}

impl ClockPort for MockClock {
    fn uptime_ms(&self) -> u64 {
        self.now_ms.get()
    }

    fn wall_clock(&self) -> Option<WallClock> {
        self.wall
    }
}

// ── RecordingPublisher ────────────────────────────────────────

pub struct RecordingPublisher {
    pub sent: Vec<(Topic, Vec<u8>)>,
    pub connected: bool,
}

#[allow(dead_code)]
impl RecordingPublisher {
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            connected: true,
        }
    }

    /// Every message sent to `topic`, parsed as JSON.
    pub fn json_on(&self, topic: Topic) -> Vec<Value> {
        self.sent
            .iter()
            .filter(|(t, _)| *t == topic)
            .map(|(_, body)| serde_json::from_slice(body).unwrap())
            .collect()
    }

    pub fn last_feedback(&self) -> Option<Value> {
        self.json_on(Topic::Feedback).pop()
    }
}

impl Default for RecordingPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishPort for RecordingPublisher {
    fn publish(&mut self, topic: Topic, payload: &[u8]) -> Result<(), CommsError> {
        if !self.connected {
            return Err(CommsError::NotConnected);
        }
        self.sent.push((topic, payload.to_vec()));
        Ok(())
    }
}

// ── RecordingDevice ───────────────────────────────────────────

#[derive(Default)]
pub struct RecordingDevice {
    pub restarts: u32,
    pub sleeps: Vec<u32>,
    pub feeds: u32,
}

impl DevicePort for RecordingDevice {
    fn restart(&mut self) {
        self.restarts += 1;
    }

    fn deep_sleep(&mut self, secs: u32) {
        self.sleeps.push(secs);
    }

    fn feed_watchdog(&mut self) {
        self.feeds += 1;
    }
}

// ── MockConfigStore ───────────────────────────────────────────

/// Keeps the last saved configuration in memory.
#[derive(Default)]
pub struct MockConfigStore {
    pub stored: Option<SystemConfig>,
    pub saves: u32,
    pub fail_saves: bool,
}

impl ConfigPort for MockConfigStore {
    fn load_into(&self, cfg: &mut SystemConfig) -> LoadOutcome {
        match &self.stored {
            Some(stored) => {
                *cfg = stored.clone();
                LoadOutcome::Loaded
            }
            None => LoadOutcome::Absent,
        }
    }

    fn save(&mut self, cfg: &SystemConfig) -> Result<(), ConfigError> {
        if self.fail_saves {
            return Err(ConfigError::Encode);
        }
        cfg.validate()?;
        self.saves += 1;
        self.stored = Some(cfg.clone());
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
