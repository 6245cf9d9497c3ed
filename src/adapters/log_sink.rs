//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART in production).  The radio sink
//! implements the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { mode, status } => {
                info!("START | mode={:?} status=0x{:02x}", mode, status);
            }
            AppEvent::Reading(t) => {
                info!("TEMP  | {}\u{00b0}C", t);
            }
            AppEvent::OutputChanged { relay, on } => {
                info!("RELAY | {:?} -> {}", relay, if *on { "ON" } else { "OFF" });
            }
            AppEvent::RegulationChanged { enabled } => {
                info!("REG   | {}", if *enabled { "enabled" } else { "disabled" });
            }
            AppEvent::SensorFault(fault) => {
                warn!("FAULT | sensor: {}", fault);
            }
            AppEvent::ReadingTimedOut => {
                warn!("FAULT | no reading within the wait window");
            }
            AppEvent::ConfigApplied(c) => {
                info!(
                    "CONF  | mode={:?} set={} hyst={} period={} timeout={}",
                    c.mode, c.setpoint, c.hysteresis, c.sample_period_ticks, c.reading_timeout_ticks
                );
            }
        }
    }
}
