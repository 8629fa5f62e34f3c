//! PCF8575 16-bit quasi-bidirectional I/O expander.
//!
//! The chip has no direction register: a pin written HIGH is weakly pulled
//! up and can be read as an input, a pin written LOW sinks current.  The
//! driver keeps a latch of the last written levels so single-pin writes
//! don't disturb the rest of the port, and keeps input pins latched HIGH.
//!
//! Wire format, both directions: two bytes, `P0..P7` then `P10..P17`
//! (pins 0..7 and 8..15 here).
//!
//! Generic over [`embedded_hal::i2c::I2c`], so the same driver runs on the
//! ESP-IDF I²C master and on a fake bus in tests.

use core::fmt;
use core::ops::Range;

use embedded_hal::i2c::I2c;
use log::{info, warn};

pub const PIN_COUNT: u8 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpanderError {
    /// No device answered in the probed address range.
    NotFound,
    /// An I²C transfer failed.
    Bus,
    /// Pin number outside `0..16`.
    InvalidPin(u8),
}

impl fmt::Display for ExpanderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "no PCF8575 found"),
            Self::Bus => write!(f, "I2C bus error"),
            Self::InvalidPin(p) => write!(f, "invalid pin {}", p),
        }
    }
}

pub struct Pcf8575<I2C> {
    i2c: I2C,
    address: u8,
    latch: u16,
}

impl<I2C: I2c> Pcf8575<I2C> {
    /// Bind to a known address.  Every pin starts released (HIGH).
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            latch: 0xFFFF,
        }
    }

    /// Probe `addresses` in order and bind to the first device that
    /// answers, then release every pin.
    pub fn discover(mut i2c: I2C, addresses: Range<u8>) -> Result<Self, ExpanderError> {
        info!("Expander: scanning 0x{:02X}..0x{:02X}", addresses.start, addresses.end);
        for address in addresses {
            let mut probe = [0u8; 2];
            if i2c.read(address, &mut probe).is_ok() {
                info!("Expander: PCF8575 found at 0x{:02X}", address);
                let mut dev = Self::new(i2c, address);
                dev.flush()?;
                return Ok(dev);
            }
        }
        warn!("Expander: no device answered");
        Err(ExpanderError::NotFound)
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Drive `pin` HIGH (released) or LOW (sinking).
    pub fn write_pin(&mut self, pin: u8, high: bool) -> Result<(), ExpanderError> {
        let mask = Self::mask(pin)?;
        if high {
            self.latch |= mask;
        } else {
            self.latch &= !mask;
        }
        self.flush()
    }

    /// Current level of `pin`, read from the chip.
    pub fn read_pin(&mut self, pin: u8) -> Result<bool, ExpanderError> {
        let mask = Self::mask(pin)?;
        Ok(self.read_port()? & mask != 0)
    }

    /// All sixteen pin levels, P0 in bit 0.
    pub fn read_port(&mut self) -> Result<u16, ExpanderError> {
        let mut buf = [0u8; 2];
        self.i2c
            .read(self.address, &mut buf)
            .map_err(|_| ExpanderError::Bus)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    fn flush(&mut self) -> Result<(), ExpanderError> {
        self.i2c
            .write(self.address, &self.latch.to_le_bytes())
            .map_err(|_| ExpanderError::Bus)
    }

    fn mask(pin: u8) -> Result<u16, ExpanderError> {
        if pin >= PIN_COUNT {
            return Err(ExpanderError::InvalidPin(pin));
        }
        Ok(1 << pin)
    }
}

/// In-memory PCF8575 on an [`I2c`] bus, for host tests.
#[cfg(not(target_os = "espidf"))]
pub mod fake {
    use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

    /// Emulates one PCF8575: output latch plus externally driven inputs.
    ///
    /// A pin reads LOW if either the latch sinks it or the outside world
    /// pulls it low (`external_low`).
    #[derive(Debug, Clone)]
    pub struct FakeExpanderBus {
        pub address: u8,
        pub latch: u16,
        pub external_low: u16,
        pub fail: bool,
        pub writes: u32,
    }

    impl FakeExpanderBus {
        pub fn new(address: u8) -> Self {
            Self {
                address,
                latch: 0xFFFF,
                external_low: 0,
                fail: false,
                writes: 0,
            }
        }

        pub fn levels(&self) -> u16 {
            self.latch & !self.external_low
        }
    }

    impl ErrorType for FakeExpanderBus {
        type Error = ErrorKind;
    }

    impl I2c for FakeExpanderBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.fail || address != self.address {
                return Err(ErrorKind::NoAcknowledge(
                    embedded_hal::i2c::NoAcknowledgeSource::Address,
                ));
            }
            for op in operations {
                match op {
                    Operation::Read(buf) => {
                        let bytes = self.levels().to_le_bytes();
                        for (dst, src) in buf.iter_mut().zip(bytes.iter().cycle()) {
                            *dst = *src;
                        }
                    }
                    Operation::Write(data) => {
                        if data.len() >= 2 {
                            self.latch = u16::from_le_bytes([data[0], data[1]]);
                            self.writes += 1;
                        }
                    }
                }
            }
            Ok(())
        }
    }
}
