//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (sensor engine, relay bank, event sinks, radio, config
//! loader) implement these traits.  The [`Thermostat`](crate::thermostat::Thermostat)
//! and [`AppService`](super::service::AppService) consume them via generics,
//! so the control logic never touches hardware directly.

use crate::config::SystemConfig;
use crate::drivers::relays::{Coil, RelayId};
use crate::error::{ConfigError, RadioError, SensorFault};
use crate::sensor::ds18b20::Centidegrees;

// ───────────────────────────────────────────────────────────────
// Temperature source (driven adapter: sensor → thermostat)
// ───────────────────────────────────────────────────────────────

/// Request/poll contract of a temperature sensor.
pub trait TemperatureSource {
    /// Request a reading.  Dropped if one is already pending.
    fn start_acquisition(&mut self);

    /// True exactly once per completed reading.
    fn is_temperature_ready(&mut self) -> bool;

    /// Latest reading.
    fn temperature(&self) -> Centidegrees;

    /// Fault raised since the last call, if any.
    fn take_fault(&mut self) -> Option<SensorFault>;
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: thermostat → coils)
// ───────────────────────────────────────────────────────────────

/// Momentary actuation of latching relays.
pub trait RelayPort {
    /// Queue one assert-then-release pulse on a coil.
    fn pulse(&mut self, relay: RelayId, coil: Coil);

    /// Advance pulse timing; called every 1 ms.
    fn tick_1ms(&mut self);

    /// A coil is energised or a pulse is queued.
    fn is_busy(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, radio).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Fan an event out to two sinks.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: boot-time defaults)
// ───────────────────────────────────────────────────────────────

/// Supplies the configuration at boot.
///
/// Implementations MUST return a configuration that passes
/// [`SystemConfig::validate`].
pub trait ConfigPort {
    fn load(&self) -> Result<SystemConfig, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Radio port (driven adapter: domain ↔ transceiver)
// ───────────────────────────────────────────────────────────────

/// Largest payload the transceiver carries.
pub const RADIO_PAYLOAD_LEN: usize = 32;

/// Blocking packet radio.
pub trait RadioPort {
    /// Send one payload of at most [`RADIO_PAYLOAD_LEN`] bytes.
    fn transmit(&mut self, payload: &[u8]) -> Result<(), RadioError>;

    /// Copy a received payload into `buf`, returning its length.
    fn receive(&mut self, buf: &mut [u8; RADIO_PAYLOAD_LEN]) -> Option<usize>;
}
