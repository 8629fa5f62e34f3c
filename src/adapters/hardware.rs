//! Hardware adapter: bridges the PCF8575 zone bank to the domain ports.
//!
//! Owns the expander and exposes it through [`ValvePort`] and
//! [`MoisturePort`].  Valve state is never cached here; `is_open` reads the
//! pin back from the chip so a status query reflects what the hardware is
//! actually driving.
//!
//! Both valve outputs and moisture inputs are active-low.

use embedded_hal::i2c::I2c;
use log::warn;

use crate::adapters::expander::{ExpanderError, Pcf8575};
use crate::app::ports::{MoisturePort, ValvePort};
use crate::config::ZONE_COUNT;
use crate::pins::{EXPANDER_ADDR_END, EXPANDER_ADDR_FIRST, MOISTURE_PINS, VALVE_PINS};

/// Five valves and five moisture sensors behind one expander.
pub struct ZoneBank<I2C> {
    expander: Pcf8575<I2C>,
    bus_errors: u32,
}

impl<I2C: I2c> ZoneBank<I2C> {
    pub fn new(expander: Pcf8575<I2C>) -> Self {
        Self {
            expander,
            bus_errors: 0,
        }
    }

    /// Scan the expander address range and bind to the first responder.
    pub fn discover(i2c: I2C) -> Result<Self, ExpanderError> {
        Pcf8575::discover(i2c, EXPANDER_ADDR_FIRST..EXPANDER_ADDR_END).map(Self::new)
    }

    pub fn address(&self) -> u8 {
        self.expander.address()
    }

    /// I²C failures seen since construction.
    pub fn bus_errors(&self) -> u32 {
        self.bus_errors
    }

    pub fn into_inner(self) -> Pcf8575<I2C> {
        self.expander
    }

    fn drive(&mut self, index: usize, open: bool) {
        let Some(&pin) = VALVE_PINS.get(index) else {
            return;
        };
        if let Err(e) = self.expander.write_pin(pin, !open) {
            self.bus_errors += 1;
            warn!("ZoneBank: valve {} write failed: {}", index, e);
        }
    }

    /// Pin level, or `None` after logging a bus failure.
    fn level(&mut self, pin: u8) -> Option<bool> {
        match self.expander.read_pin(pin) {
            Ok(high) => Some(high),
            Err(e) => {
                self.bus_errors += 1;
                warn!("ZoneBank: pin {} read failed: {}", pin, e);
                None
            }
        }
    }
}

impl<I2C: I2c> ValvePort for ZoneBank<I2C> {
    fn valve_count(&self) -> usize {
        ZONE_COUNT
    }

    fn open(&mut self, index: usize) {
        self.drive(index, true);
    }

    fn close(&mut self, index: usize) {
        self.drive(index, false);
    }

    // An unreadable valve is reported open so the safety sweep still
    // tries to close it.
    fn is_open(&mut self, index: usize) -> bool {
        let Some(&pin) = VALVE_PINS.get(index) else {
            return false;
        };
        self.level(pin).is_none_or(|high| !high)
    }
}

impl<I2C: I2c> MoisturePort for ZoneBank<I2C> {
    fn sensor_count(&self) -> usize {
        ZONE_COUNT
    }

    // Unreadable sensors count as wet: that stops watering rather than
    // flooding a zone.
    fn is_wet(&mut self, index: usize) -> bool {
        let Some(&pin) = MOISTURE_PINS.get(index) else {
            return false;
        };
        self.level(pin).is_none_or(|high| !high)
    }
}
