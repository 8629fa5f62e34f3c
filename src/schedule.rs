//! Watering schedule decision.
//!
//! A pure function of the wall clock, the configuration and the
//! last-watered marker.  No state, no I/O: the FSM's Idle handler calls
//! [`should_trigger_window`] once per control tick.
//!
//! ```text
//!   t ─────────────── t + duration*5 + interval*N
//!   │◀──────── window for start time t ────────▶│
//! ```
//!
//! The window bound mixes units (seconds-scale config values added to a
//! minute-of-day start time).  The device has always computed it this way
//! and the schedules in the field are tuned to it.

use heapless::Vec;
use time::{OffsetDateTime, UtcOffset};

use crate::config::{MAX_WATERING_TIMES, SystemConfig, ZONE_COUNT};

/// Local wall-clock reading as seen by the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    pub hours: u8,
    pub minutes: u8,
    /// Day of month, 1..=31.
    pub day: u8,
}

/// Identifies a served window: the day it ran and the start time it matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastWatered {
    pub day: u8,
    pub slot: u16,
}

/// 2020-01-01T00:00:00Z.  An SNTP-less clock boots near the epoch.
const MIN_SYNCED_UNIX_SECS: i64 = 1_577_836_800;

impl WallClock {
    /// Schedule clock value compared against `watering_times`.
    #[cfg(not(feature = "legacy-clock"))]
    pub fn minute_of_day(&self) -> u32 {
        u32::from(self.hours) * 60 + u32::from(self.minutes)
    }

    /// Schedule clock value compared against `watering_times`.
    ///
    /// Legacy devices multiply hours by minutes.  The value is not monotonic
    /// and is 0 at every full hour.
    #[cfg(feature = "legacy-clock")]
    pub fn minute_of_day(&self) -> u32 {
        u32::from(self.hours) * u32::from(self.minutes)
    }

    /// Convert a UNIX timestamp to local time using a fixed UTC offset.
    ///
    /// Returns `None` for clocks that have not been synced yet, and for
    /// offsets `time` cannot represent.
    pub fn from_unix(unix_secs: i64, utc_offset_secs: i32) -> Option<Self> {
        if unix_secs < MIN_SYNCED_UNIX_SECS {
            return None;
        }
        let offset = UtcOffset::from_whole_seconds(utc_offset_secs).ok()?;
        let local = OffsetDateTime::from_unix_timestamp(unix_secs)
            .ok()?
            .checked_to_offset(offset)?;
        Some(Self {
            hours: local.hour(),
            minutes: local.minute(),
            day: local.day(),
        })
    }
}

/// Start times already served, keyed by the day they ran on.
///
/// Every window served today stays blocked until the day changes, not just
/// the most recent one.  Overlapping windows would otherwise take turns
/// re-firing each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServedWindows {
    /// Day the `slots` belong to; 0 before anything is served.
    day: u8,
    slots: Vec<u16, MAX_WATERING_TIMES>,
    last: Option<LastWatered>,
}

impl ServedWindows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a served window.
    pub fn mark(&mut self, served: LastWatered) {
        self.roll_over(served.day);
        if !self.slots.contains(&served.slot) && self.slots.push(served.slot).is_err() {
            log::warn!("Schedule: served set full, slot {} not recorded", served.slot);
        }
        self.last = Some(served);
    }

    /// Forget every slot recorded for a day other than `today`.
    pub fn roll_over(&mut self, today: u8) {
        if self.day != today {
            self.day = today;
            self.slots.clear();
        }
    }

    pub fn contains(&self, day: u8, slot: u16) -> bool {
        self.day == day && self.slots.contains(&slot)
    }

    /// The most recently served window.
    pub fn last(&self) -> Option<LastWatered> {
        self.last
    }
}

impl From<LastWatered> for ServedWindows {
    fn from(served: LastWatered) -> Self {
        let mut windows = Self::new();
        windows.mark(served);
        windows
    }
}

/// Upper bound of the window opened by start time `t`.
pub fn window_end(t: u16, cfg: &SystemConfig) -> u64 {
    u64::from(t)
        + u64::from(cfg.watering_duration_secs) * 5
        + u64::from(cfg.watering_interval_secs) * ZONE_COUNT as u64
}

/// Decide whether a session should start now.
///
/// Returns the matched start time.  Entries are checked in configuration
/// order and the first window containing `now_minutes` that has not been
/// served today wins.
pub fn should_trigger_window(
    now_minutes: u32,
    today: u8,
    cfg: &SystemConfig,
    served: &ServedWindows,
) -> Option<u16> {
    let now = u64::from(now_minutes);
    cfg.watering_times.iter().copied().find(|&t| {
        !served.contains(today, t) && now >= u64::from(t) && now <= window_end(t, cfg)
    })
}
