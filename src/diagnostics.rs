//! Runtime counters and the boot status byte.
//!
//! The status byte is what the node reports once at boot over its serial
//! console; the counters are snapshotted on demand for logging and the
//! radio telemetry frame.
//!
//! ```text
//!   bit 7   bit 6..2   bit 1               bit 0
//!  ┌──────┬──────────┬───────────────────┬──────────────────┐
//!  │ alive│ reserved │ sensor configured │ config defaulted │
//!  └──────┴──────────┴───────────────────┴──────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SensorFault;

pub const STATUS_CONFIG_DEFAULTED: u8 = 1 << 0;
pub const STATUS_SENSOR_CONFIGURED: u8 = 1 << 1;
pub const STATUS_ALIVE: u8 = 1 << 7;

/// Boot status byte builder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootStatus(u8);

impl BootStatus {
    pub fn new(config_defaulted: bool, sensor_configured: bool) -> Self {
        let mut bits = STATUS_ALIVE;
        if config_defaulted {
            bits |= STATUS_CONFIG_DEFAULTED;
        }
        if sensor_configured {
            bits |= STATUS_SENSOR_CONFIGURED;
        }
        Self(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn config_defaulted(self) -> bool {
        self.0 & STATUS_CONFIG_DEFAULTED != 0
    }

    pub fn sensor_configured(self) -> bool {
        self.0 & STATUS_SENSOR_CONFIGURED != 0
    }
}

/// Counters since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub readings: u32,
    pub sensor_faults: u32,
    pub reading_timeouts: u32,
    pub relay_pulses: u32,
    pub line_faults: u32,
    pub dropped_events: u32,
    pub last_fault: Option<SensorFault>,
}

impl Diagnostics {
    pub fn record_reading(&mut self) {
        self.readings = self.readings.wrapping_add(1);
    }

    pub fn record_fault(&mut self, fault: SensorFault) {
        self.sensor_faults = self.sensor_faults.wrapping_add(1);
        self.last_fault = Some(fault);
    }

    pub fn record_timeout(&mut self) {
        self.reading_timeouts = self.reading_timeouts.wrapping_add(1);
    }

    /// Share of acquisitions that produced a reading, in percent.
    pub fn success_rate(&self) -> u8 {
        let attempts = u64::from(self.readings)
            + u64::from(self.sensor_faults)
            + u64::from(self.reading_timeouts);
        if attempts == 0 {
            return 100;
        }
        (u64::from(self.readings) * 100 / attempts) as u8
    }
}

impl core::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "readings={} faults={} timeouts={} pulses={} line_faults={} dropped={}",
            self.readings,
            self.sensor_faults,
            self.reading_timeouts,
            self.relay_pulses,
            self.line_faults,
            self.dropped_events
        )
    }
}
