//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (radio, serial)
//! that the [`AppService`](super::service::AppService) interprets and
//! acts upon.  They derive serde so a radio payload can carry them.

use serde::{Deserialize, Serialize};

use crate::config::ThermostatMode;
use crate::sensor::ds18b20::Centidegrees;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppCommand {
    /// Enable regulation.
    On,

    /// Disable regulation and switch the output off.
    Off,

    /// Switch between heating and cooling.
    SetMode(ThermostatMode),

    SetSetpoint(Centidegrees),

    SetHysteresis(Centidegrees),

    /// Reset the sensor protocol engine and rewrite its configuration.
    ReinitializeSensor,
}
