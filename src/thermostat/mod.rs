//! Hysteresis thermostat driving two latching relays.
//!
//! Runs from the 100 ms task.  Every `sample_period_ticks` it asks the
//! temperature source for a reading, waits for it, applies the
//! [`rules::decide`] band and pulses a relay coil only when the logical
//! output flips:
//!
//! ```text
//!        ┌──────── every N ticks ────────┐
//!        │                               ▼
//!     ┌──────┐   ready / fault / timeout  ┌─────────────────────┐
//!     │ Init │ ◀───────────────────────── │ WaitForTemperature  │
//!     └──────┘                            └─────────────────────┘
//!        ▲  │ off()
//!   on() │  ▼
//!     ┌──────┐
//!     │ Idle │  regulation disabled, output OFF
//!     └──────┘
//! ```
//!
//! `active` is the logical output.  Relays are bistable, so it changes only
//! through one SET or RESET pulse and is never re-asserted while unchanged.

pub mod rules;

use log::{debug, info, warn};

use crate::app::ports::{RelayPort, TemperatureSource};
use crate::config::{ThermostatConfig, ThermostatMode};
use crate::drivers::relays::Coil;
use crate::error::SensorFault;
use crate::sensor::ds18b20::Centidegrees;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermostatState {
    Init,
    Idle,
    WaitForTemperature,
}

/// External on/off request, single slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    None,
    On,
    Off,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Regulation disabled.
    Idle,
    /// Counting down to the next acquisition.
    Counting,
    /// Acquisition requested this tick.
    Requested,
    /// Still waiting for the sensor.
    Waiting,
    /// A reading arrived and was evaluated.
    Sampled(Centidegrees),
    /// The sensor reported a fault instead of a reading.
    SensorFault(SensorFault),
    /// No reading within the timeout.
    TimedOut,
}

pub struct Thermostat {
    config: ThermostatConfig,
    state: ThermostatState,
    request: Request,
    enabled: bool,
    active: bool,
    last_temperature: Option<Centidegrees>,
    sample_counter: u16,
    wait_ticks: u16,
}

impl Thermostat {
    pub fn new(config: ThermostatConfig) -> Self {
        Self {
            config,
            state: ThermostatState::Init,
            request: Request::None,
            enabled: true,
            active: false,
            last_temperature: None,
            sample_counter: 0,
            wait_ticks: 0,
        }
    }

    /// Start regulating from scratch with the output assumed OFF.
    pub fn initialize(&mut self) {
        self.state = ThermostatState::Init;
        self.request = Request::None;
        self.enabled = true;
        self.active = false;
        self.last_temperature = None;
        self.sample_counter = 0;
        self.wait_ticks = 0;
    }

    /// Ask to (re-)enable regulation.  Dropped if a request is pending.
    pub fn on(&mut self) {
        self.request(Request::On);
    }

    /// Ask to disable regulation and switch the output off.  Dropped if a
    /// request is pending.
    pub fn off(&mut self) {
        self.request(Request::Off);
    }

    pub fn state(&self) -> ThermostatState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn mode(&self) -> ThermostatMode {
        self.config.mode
    }

    pub fn config(&self) -> &ThermostatConfig {
        &self.config
    }

    pub fn last_temperature(&self) -> Option<Centidegrees> {
        self.last_temperature
    }

    /// Replace setpoint, hysteresis, mode and timing between ticks.
    ///
    /// Leaving a mode while its relay is on switches that relay off first,
    /// so the new mode starts from OFF.
    pub fn apply_config<R: RelayPort>(&mut self, config: ThermostatConfig, relays: &mut R) {
        if config.mode != self.config.mode && self.active {
            self.switch(false, relays);
        }
        if config != self.config {
            info!(
                "thermostat: {:?} set={} hyst={}",
                config.mode, config.setpoint, config.hysteresis
            );
        }
        self.config = config;
    }

    /// Advance by one 100 ms step.
    pub fn tick<S, R>(&mut self, sensor: &mut S, relays: &mut R) -> Outcome
    where
        S: TemperatureSource,
        R: RelayPort,
    {
        self.handle_request(relays);

        match self.state {
            ThermostatState::Idle => Outcome::Idle,

            ThermostatState::Init => {
                self.sample_counter = self.sample_counter.saturating_add(1);
                if self.sample_counter < self.config.sample_period_ticks {
                    return Outcome::Counting;
                }
                self.sample_counter = 0;
                self.wait_ticks = 0;
                // A reading that completed after we stopped waiting (off,
                // timeout) still holds the sensor's slot.  It is stale.
                if sensor.is_temperature_ready() {
                    debug!("thermostat: discarding stale reading {}", sensor.temperature());
                }
                sensor.start_acquisition();
                self.go(ThermostatState::WaitForTemperature);
                Outcome::Requested
            }

            ThermostatState::WaitForTemperature => {
                if sensor.is_temperature_ready() {
                    let t = sensor.temperature();
                    self.last_temperature = Some(t);
                    self.evaluate(t, relays);
                    self.go(ThermostatState::Init);
                    return Outcome::Sampled(t);
                }
                if let Some(fault) = sensor.take_fault() {
                    warn!("thermostat: sensor fault ({}), keeping output", fault);
                    self.go(ThermostatState::Init);
                    return Outcome::SensorFault(fault);
                }
                self.wait_ticks = self.wait_ticks.saturating_add(1);
                if self.wait_ticks >= self.config.reading_timeout_ticks {
                    warn!("thermostat: no reading after {} ticks", self.wait_ticks);
                    self.go(ThermostatState::Init);
                    return Outcome::TimedOut;
                }
                Outcome::Waiting
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn request(&mut self, request: Request) {
        if self.request == Request::None {
            self.request = request;
        }
    }

    fn handle_request<R: RelayPort>(&mut self, relays: &mut R) {
        match core::mem::replace(&mut self.request, Request::None) {
            Request::None => {}
            Request::On => {
                if !self.enabled {
                    info!("thermostat: regulation enabled");
                    self.enabled = true;
                    self.sample_counter = 0;
                    self.go(ThermostatState::Init);
                }
            }
            Request::Off => {
                if self.enabled {
                    info!("thermostat: regulation disabled");
                    if self.active {
                        self.switch(false, relays);
                    }
                    self.enabled = false;
                    self.go(ThermostatState::Idle);
                }
            }
        }
    }

    fn evaluate<R: RelayPort>(&mut self, t: Centidegrees, relays: &mut R) {
        let c = &self.config;
        match rules::decide(c.mode, c.setpoint, c.hysteresis, t, self.active) {
            Some(on) => self.switch(on, relays),
            None => debug!("thermostat: t={} no change (active={})", t, self.active),
        }
    }

    /// Flip `active` with exactly one pulse on the current mode's relay.
    fn switch<R: RelayPort>(&mut self, on: bool, relays: &mut R) {
        let relay = self.config.mode.relay();
        let coil = if on { Coil::Set } else { Coil::Reset };
        relays.pulse(relay, coil);
        self.active = on;
        info!("thermostat: {:?} output {}", relay, if on { "ON" } else { "OFF" });
    }

    fn go(&mut self, next: ThermostatState) {
        if next != self.state {
            debug!("thermostat: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}
