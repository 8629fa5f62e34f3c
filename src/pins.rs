//! Pin assignments for the Smart Garden controller board.
//!
//! Adapters reference this module rather than
//! hard-coding pin numbers.  Valves and sensors hang off a PCF8575 16-bit
//! I/O expander; the ESP32 itself only drives the I²C bus.

use crate::config::ZONE_COUNT;

// ---------------------------------------------------------------------------
// I²C bus (ESP32 default Wire pins)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
pub const I2C_BAUDRATE_HZ: u32 = 100_000;

// ---------------------------------------------------------------------------
// PCF8575 expander
// ---------------------------------------------------------------------------

/// First 7-bit address probed during discovery (A2..A0 all low).
pub const EXPANDER_ADDR_FIRST: u8 = 0x20;
/// One past the last address probed.
pub const EXPANDER_ADDR_END: u8 = 0x28;

/// Solenoid valve outputs, expander pins P0..P4.  Active-low: LOW = open.
pub const VALVE_PINS: [u8; ZONE_COUNT] = [0, 1, 2, 3, 4];

/// Soil-moisture comparator inputs, expander pins P5..P9.  LOW = wet.
pub const MOISTURE_PINS: [u8; ZONE_COUNT] = [5, 6, 7, 8, 9];
