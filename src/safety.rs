//! Safety sweep.
//!
//! Runs **every control tick before the sequencer**.  Any valve whose
//! paired sensor reports wet soil is closed, whatever opened it: the
//! sequencer, a remote `open_valve`, or a valve left energised across a
//! reset.
//!
//! The supervisor remembers what its last sweep closed and how many valves
//! it has closed since boot.

use crate::app::ports::{MoisturePort, ValvePort};
use log::warn;

/// Safety supervisor.
#[derive(Debug, Default)]
pub struct SafetySupervisor {
    /// Valves closed by the most recent sweep.
    last_closed: u8,
    /// Total valves closed since boot.
    total_closed: u32,
}

impl SafetySupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close every open valve whose sensor reports wet.
    /// Returns a bitmask of the valves closed by this sweep.
    pub fn sweep<H: ValvePort + MoisturePort>(&mut self, hw: &mut H) -> u8 {
        let zones = hw.valve_count().min(hw.sensor_count()).min(8);
        let mut closed = 0u8;
        for i in 0..zones {
            if hw.is_wet(i) && hw.is_open(i) {
                hw.close(i);
                closed |= 1 << i;
            }
        }
        if closed != 0 {
            warn!("Safety: closed wet zones mask=0b{:05b}", closed);
            self.total_closed = self.total_closed.saturating_add(closed.count_ones());
        }
        self.last_closed = closed;
        closed
    }

    /// Bitmask from the most recent sweep.
    pub fn last_closed(&self) -> u8 {
        self.last_closed
    }

    /// Valves closed by the sweep since boot.
    pub fn total_closed(&self) -> u32 {
        self.total_closed
    }
}
