//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements              | Connects to                 |
//! |------------|-------------------------|-----------------------------|
//! | `expander` | -                       | PCF8575 over I²C            |
//! | `hardware` | ValvePort, MoisturePort | zone bank on the expander   |
//! | `nvs`      | StoragePort             | NVS blob / in-memory region |
//! | `time`     | ClockPort               | ESP32 timer + SNTP clock    |
//! | `mqtt`     | PublishPort             | ESP-IDF MQTT client         |
//! | `wifi`     | -                       | ESP-IDF WiFi STA            |
//! | `device`   | DevicePort              | restart, deep sleep, TWDT   |
//! | `log_sink` | EventSink               | Serial log output           |

pub mod device;
pub mod expander;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod time;
pub mod wifi;
