//! Application core: orchestration without I/O.
//!
//! [`service::AppService`] wires the sensor protocol engine to the
//! thermostat and the relays.  All interaction with hardware happens
//! through the **port traits** defined in [`ports`], keeping this layer
//! fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
