//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART in production).

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::fsm::context::SessionEvent;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

fn bits(flags: &[bool]) -> u8 {
    flags
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &on)| if on { acc | (1 << i) } else { acc })
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | state={:?} | wet=0b{:05b} | open=0b{:05b}",
                    t.state,
                    bits(&t.moisture),
                    bits(&t.valve),
                );
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::Session(s) => match s {
                SessionEvent::Started { window } => {
                    info!("WATER | session start, window={}", window);
                }
                SessionEvent::Advanced { from, to, wet } => {
                    info!(
                        "WATER | valve {} -> {} ({})",
                        from,
                        to,
                        if *wet { "wet" } else { "time" }
                    );
                }
                SessionEvent::Completed { window } => {
                    info!("WATER | session complete, window={}", window);
                }
                SessionEvent::Abandoned { valve } => {
                    info!("WATER | disabled mid-session at valve {}", valve);
                }
                SessionEvent::Aborted {
                    window,
                    valve,
                    elapsed_secs,
                } => {
                    error!(
                        "WATER | fail-safe abort, window={} valve={} after {} s",
                        window, valve, elapsed_secs
                    );
                }
            },
            AppEvent::SafetyClosed(mask) => {
                warn!("SAFETY | wet zones closed, mask=0b{:05b}", mask);
            }
            AppEvent::ValveForced { valve, open } => {
                info!(
                    "REMOTE | valve {} forced {}",
                    valve,
                    if *open { "open" } else { "closed" }
                );
            }
            AppEvent::ConfigUpdated => {
                info!("REMOTE | configuration updated");
            }
            AppEvent::ShuttingDown => {
                info!("POWER | all valves closed for shutdown");
            }
            AppEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
        }
    }
}
