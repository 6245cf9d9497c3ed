//! System configuration parameters
//!
//! All tunable parameters for the SmartNode.  Defaults are compile-time
//! constants; nothing is persisted, so every boot starts from
//! [`SystemConfig::default`] unless a [`ConfigPort`](crate::app::ports::ConfigPort)
//! supplies something else.  Thermostat values may change at runtime through
//! [`AppCommand`](crate::app::commands::AppCommand)s.

use serde::{Deserialize, Serialize};

use crate::drivers::relays::RelayId;
use crate::error::ConfigError;
use crate::sensor::ds18b20::{Centidegrees, Resolution};

/// Which season the thermostat regulates for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThermostatMode {
    /// Heating: on below the setpoint.
    Winter,
    /// Cooling: on above the setpoint.
    Summer,
}

impl ThermostatMode {
    /// Relay that carries this mode's load.
    pub const fn relay(self) -> RelayId {
        match self {
            Self::Winter => RelayId::Heating,
            Self::Summer => RelayId::Cooling,
        }
    }
}

/// Hysteresis controller parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThermostatConfig {
    pub mode: ThermostatMode,
    pub setpoint: Centidegrees,
    /// Width of the dead band above (winter) or below (summer) the setpoint.
    pub hysteresis: Centidegrees,
    /// 100 ms ticks between acquisitions.
    pub sample_period_ticks: u16,
    /// 100 ms ticks to wait for a reading before giving up.
    pub reading_timeout_ticks: u16,
}

/// DS18B20 parameters and the protocol engine's recovery policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// TH register, °C.
    pub alarm_high: i8,
    /// TL register, °C.
    pub alarm_low: i8,
    pub resolution: Resolution,
    /// Extra resets after a missing presence pulse before faulting.
    pub presence_retries: u8,
    /// Give up on a conversion after this long.
    pub conversion_timeout_ms: u16,
    /// Leave the fault state on the next tick instead of latching it.
    pub auto_recover: bool,
}

/// Core system configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    pub thermostat: ThermostatConfig,
    pub sensor: SensorConfig,
    /// Latching relay coil pulse width (1 ms ticks).
    pub relay_pulse_ms: u8,
}

impl Default for ThermostatConfig {
    fn default() -> Self {
        Self {
            mode: ThermostatMode::Winter,
            setpoint: Centidegrees(2050), // 20.50 °C
            hysteresis: Centidegrees(150), // 1.50 °C
            sample_period_ticks: 50,      // 5 s
            reading_timeout_ticks: 30,    // 3 s
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            alarm_high: 50,
            alarm_low: 0x85_u8 as i8,
            resolution: Resolution::Bits12,
            presence_retries: 3,
            conversion_timeout_ms: 1000,
            auto_recover: true,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            thermostat: ThermostatConfig::default(),
            sensor: SensorConfig::default(),
            relay_pulse_ms: 4,
        }
    }
}

impl ThermostatConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hysteresis.0 <= 0 {
            return Err(ConfigError::InvalidHysteresis);
        }
        if self.setpoint < Centidegrees::MIN_SENSOR || self.setpoint > Centidegrees::MAX_SENSOR {
            return Err(ConfigError::SetpointOutOfRange);
        }
        if self.sample_period_ticks == 0 || self.reading_timeout_ticks == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }
}

impl SensorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.conversion_timeout_ms < self.resolution.conversion_time_ms() {
            return Err(ConfigError::ConversionTimeoutTooShort);
        }
        Ok(())
    }
}

impl SystemConfig {
    /// Check every section plus the cross-section timing constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.thermostat.validate()?;
        self.sensor.validate()?;
        if self.relay_pulse_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        let wait_ms = u32::from(self.thermostat.reading_timeout_ticks) * 100;
        if wait_ms <= u32::from(self.sensor.conversion_timeout_ms) {
            return Err(ConfigError::ReadingTimeoutTooShort);
        }
        Ok(())
    }
}
