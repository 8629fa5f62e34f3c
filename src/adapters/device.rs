//! Device lifecycle adapter: restart, deep sleep and the task watchdog.
//!
//! The main loop must call [`DevicePort::feed_watchdog`] on every pass;
//! the TWDT resets the device if the loop stalls for more than 10 s.
//!
//! On non-espidf targets the adapter only records what was requested.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::DevicePort;

#[cfg(target_os = "espidf")]
const WATCHDOG_TIMEOUT_MS: u32 = 10_000;

pub struct Esp32Device {
    #[cfg(target_os = "espidf")]
    watchdog_subscribed: bool,
    #[cfg(not(target_os = "espidf"))]
    pub restarts: u32,
    #[cfg(not(target_os = "espidf"))]
    pub sleeps: heapless::Vec<u32, 4>,
    #[cfg(not(target_os = "espidf"))]
    pub feeds: u64,
}

impl Esp32Device {
    /// Subscribe the calling task to the TWDT.
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        use esp_idf_svc::sys::{
            ESP_OK, esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure,
        };

        let cfg = esp_task_wdt_config_t {
            timeout_ms: WATCHDOG_TIMEOUT_MS,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
        if ret != ESP_OK {
            warn!("Device: TWDT reconfigure returned {} (may already be configured)", ret);
        }
        let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
        let watchdog_subscribed = ret == ESP_OK;
        if watchdog_subscribed {
            info!("Device: watchdog armed ({} ms)", WATCHDOG_TIMEOUT_MS);
        } else {
            warn!("Device: watchdog subscribe failed ({})", ret);
        }
        Self {
            watchdog_subscribed,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        info!("Device(sim): no watchdog");
        Self {
            restarts: 0,
            sleeps: heapless::Vec::new(),
            feeds: 0,
        }
    }
}

impl Default for Esp32Device {
    fn default() -> Self {
        Self::new()
    }
}

impl DevicePort for Esp32Device {
    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        info!("Device: restarting");
        unsafe { esp_idf_svc::sys::esp_restart() }
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        info!("Device(sim): restart requested");
        self.restarts += 1;
    }

    #[cfg(target_os = "espidf")]
    fn deep_sleep(&mut self, secs: u32) {
        info!("Device: deep sleep for {} s", secs);
        unsafe { esp_idf_svc::sys::esp_deep_sleep(u64::from(secs) * 1_000_000) }
    }

    #[cfg(not(target_os = "espidf"))]
    fn deep_sleep(&mut self, secs: u32) {
        info!("Device(sim): deep sleep {} s requested", secs);
        let _ = self.sleeps.push(secs);
    }

    #[cfg(target_os = "espidf")]
    fn feed_watchdog(&mut self) {
        if self.watchdog_subscribed {
            unsafe {
                esp_idf_svc::sys::esp_task_wdt_reset();
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn feed_watchdog(&mut self) {
        self.feeds += 1;
    }
}
