//! SmartNode firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.
//!
//! ```text
//!   timer ISR ──▶ onewire (bit slots) ◀── sensor (DS18B20 FSM, 1 ms)
//!                                              ▲
//!                                  thermostat (hysteresis, 100 ms) ──▶ drivers::relays
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod events;
pub mod onewire;
pub mod pins;
pub mod sensor;
pub mod thermostat;

pub use error::Error;
