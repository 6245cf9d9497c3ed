//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the sensor protocol engine, the thermostat, the
//! relay port and the live configuration.  It exposes the two periodic
//! entry points the main loop drives plus command handling.  All I/O flows
//! through the bus and relay ports it was built with and the event sink
//! passed at call sites, so the whole service runs against mocks.
//!
//! ```text
//!   1 ms  ──▶ tick_1ms()   ── SensorEngine::tick · RelayPort::tick_1ms
//!  100 ms ──▶ tick_100ms() ── Thermostat::tick ──▶ EventSink
//!   cmd   ──▶ handle_command()
//! ```

use log::info;

use crate::config::{SystemConfig, ThermostatConfig};
use crate::diagnostics::{BootStatus, Diagnostics};
use crate::drivers::relays::{Coil, RelayId};
use crate::error::Error;
use crate::events;
use crate::onewire::BitBus;
use crate::sensor::SensorEngine;
use crate::sensor::ds18b20::Centidegrees;
use crate::thermostat::{Outcome, Thermostat};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{EventSink, RelayPort};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService<B: BitBus, R: RelayPort> {
    config: SystemConfig,
    sensor: SensorEngine<B>,
    thermostat: Thermostat,
    relays: R,
    diag: Diagnostics,
    control_ticks: u64,
}

impl<B: BitBus, R: RelayPort> AppService<B, R> {
    /// Build the service around a bus and a relay port.
    ///
    /// Does **not** touch the hardware. Call [`start`](Self::start) next.
    pub fn new(config: SystemConfig, bus: B, relays: R) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            sensor: SensorEngine::new(bus, config.sensor),
            thermostat: Thermostat::new(config.thermostat),
            relays,
            config,
            diag: Diagnostics::default(),
            control_ticks: 0,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Initialize both engines, request the sensor configuration write and
    /// drive every relay to OFF.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.sensor.initialize();
        self.sensor.configure();
        self.thermostat.initialize();
        for relay in RelayId::ALL {
            self.relays.pulse(relay, Coil::Reset);
            self.diag.relay_pulses += 1;
        }
        let status = self.boot_status();
        info!(
            "AppService started: {:?} set={} hyst={} status=0x{:02x}",
            self.config.thermostat.mode,
            self.config.thermostat.setpoint,
            self.config.thermostat.hysteresis,
            status.bits()
        );
        sink.emit(&AppEvent::Started {
            mode: self.config.thermostat.mode,
            status: status.bits(),
        });
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// 1 ms task: one sensor protocol step, then relay pulse timing.
    pub fn tick_1ms(&mut self) {
        self.sensor.tick();
        self.relays.tick_1ms();
    }

    /// 100 ms task: one thermostat step.
    pub fn tick_100ms(&mut self, sink: &mut impl EventSink) {
        self.control_ticks += 1;
        let before = self.snapshot();

        match self.thermostat.tick(&mut self.sensor, &mut self.relays) {
            Outcome::Sampled(t) => {
                self.diag.record_reading();
                sink.emit(&AppEvent::Reading(t));
            }
            Outcome::SensorFault(fault) => {
                self.diag.record_fault(fault);
                sink.emit(&AppEvent::SensorFault(fault));
            }
            Outcome::TimedOut => {
                self.diag.record_timeout();
                sink.emit(&AppEvent::ReadingTimedOut);
            }
            Outcome::Idle | Outcome::Counting | Outcome::Requested | Outcome::Waiting => {}
        }

        self.emit_changes(before, sink);
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.
    ///
    /// `On`/`Off` take effect on the next 100 ms tick.  Parameter changes
    /// are validated against the whole configuration and applied at once;
    /// a rejected change leaves everything as it was.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        match cmd {
            AppCommand::On => self.thermostat.on(),
            AppCommand::Off => self.thermostat.off(),
            AppCommand::SetMode(mode) => self.update_thermostat(|c| c.mode = mode, sink)?,
            AppCommand::SetSetpoint(t) => self.update_thermostat(|c| c.setpoint = t, sink)?,
            AppCommand::SetHysteresis(h) => self.update_thermostat(|c| c.hysteresis = h, sink)?,
            AppCommand::ReinitializeSensor => {
                info!("AppService: reinitializing sensor");
                self.sensor.initialize();
                self.sensor.configure();
            }
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn thermostat(&self) -> &Thermostat {
        &self.thermostat
    }

    pub fn sensor(&self) -> &SensorEngine<B> {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut SensorEngine<B> {
        &mut self.sensor
    }

    pub fn relays(&self) -> &R {
        &self.relays
    }

    pub fn relays_mut(&mut self) -> &mut R {
        &mut self.relays
    }

    /// Last evaluated reading.
    pub fn temperature(&self) -> Option<Centidegrees> {
        self.thermostat.last_temperature()
    }

    /// 100 ms ticks since boot.
    pub fn control_ticks(&self) -> u64 {
        self.control_ticks
    }

    pub fn boot_status(&self) -> BootStatus {
        BootStatus::new(
            self.config == SystemConfig::default(),
            self.sensor.is_configured(),
        )
    }

    /// Counter snapshot including the bus line faults and the tick events
    /// lost to a full queue.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            line_faults: self.sensor.bus().line_faults(),
            dropped_events: events::dropped_events(),
            ..self.diag
        }
    }

    // ── Internal ──────────────────────────────────────────────

    fn update_thermostat(
        &mut self,
        edit: impl FnOnce(&mut ThermostatConfig),
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        let mut next = self.config;
        edit(&mut next.thermostat);
        next.validate()?;

        let before = self.snapshot();
        self.thermostat.apply_config(next.thermostat, &mut self.relays);
        self.config = next;
        self.emit_changes(before, sink);
        sink.emit(&AppEvent::ConfigApplied(next.thermostat));
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            relay: self.thermostat.mode().relay(),
            active: self.thermostat.is_active(),
            enabled: self.thermostat.is_enabled(),
        }
    }

    /// Report what a thermostat step changed.  A flip of `active` is one
    /// pulse on the relay of the mode in force before the step.
    fn emit_changes(&mut self, before: Snapshot, sink: &mut impl EventSink) {
        let active = self.thermostat.is_active();
        if active != before.active {
            self.diag.relay_pulses += 1;
            let relay = if active { self.thermostat.mode().relay() } else { before.relay };
            sink.emit(&AppEvent::OutputChanged { relay, on: active });
        }
        let enabled = self.thermostat.is_enabled();
        if enabled != before.enabled {
            sink.emit(&AppEvent::RegulationChanged { enabled });
        }
    }
}

#[derive(Clone, Copy)]
struct Snapshot {
    relay: RelayId,
    active: bool,
    enabled: bool,
}
