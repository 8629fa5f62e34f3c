//! ESP32 time adapter.
//!
//! Implements [`ClockPort`]:
//!
//! - **`target_os = "espidf"`**: uptime from `esp_timer_get_time()`,
//!   wall clock from `gettimeofday()` (set by SNTP).
//! - **`not(target_os = "espidf")`**: `std::time::Instant` for uptime and
//!   a settable Unix time for simulation.
//!
//! Local time is derived from the configured fixed UTC offset; the device
//! has no timezone database.

use crate::app::ports::ClockPort;
use crate::schedule::WallClock;

pub struct Esp32TimeAdapter {
    utc_offset_secs: i32,
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    #[cfg(not(target_os = "espidf"))]
    unix_at_start: Option<i64>,
}

impl Esp32TimeAdapter {
    pub fn new(utc_offset_secs: i32) -> Self {
        Self {
            utc_offset_secs,
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(not(target_os = "espidf"))]
            unix_at_start: None,
        }
    }

    pub fn set_utc_offset(&mut self, secs: i32) {
        self.utc_offset_secs = secs;
    }

    /// Seconds since the Unix epoch, `None` until the clock is set.
    #[cfg(target_os = "espidf")]
    pub fn unix_secs(&self) -> Option<i64> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        Some(tv.tv_sec as i64)
    }

    /// Seconds since the Unix epoch, `None` until [`set_unix`](Self::set_unix).
    #[cfg(not(target_os = "espidf"))]
    pub fn unix_secs(&self) -> Option<i64> {
        self.unix_at_start
            .map(|base| base + self.start.elapsed().as_secs() as i64)
    }

    /// Pretend SNTP just delivered `unix_secs`.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_unix(&mut self, unix_secs: i64) {
        self.unix_at_start = Some(unix_secs - self.start.elapsed().as_secs() as i64);
    }
}

impl ClockPort for Esp32TimeAdapter {
    #[cfg(target_os = "espidf")]
    fn uptime_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn wall_clock(&self) -> Option<WallClock> {
        WallClock::from_unix(self.unix_secs()?, self.utc_offset_secs)
    }
}
