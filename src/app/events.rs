//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, or send a telemetry
//! frame over the radio.

use crate::config::{ThermostatConfig, ThermostatMode};
use crate::drivers::relays::RelayId;
use crate::error::SensorFault;
use crate::sensor::ds18b20::Centidegrees;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The service has started; carries the boot status byte.
    Started { mode: ThermostatMode, status: u8 },

    /// A fresh temperature reading was evaluated.
    Reading(Centidegrees),

    /// A relay was pulsed to a new logical state.
    OutputChanged { relay: RelayId, on: bool },

    /// Regulation was enabled or disabled by `On`/`Off`.
    RegulationChanged { enabled: bool },

    /// The sensor reported a fault instead of a reading.
    SensorFault(SensorFault),

    /// No reading arrived within the thermostat's wait window.
    ReadingTimedOut,

    /// Thermostat parameters changed at runtime.
    ConfigApplied(ThermostatConfig),
}
