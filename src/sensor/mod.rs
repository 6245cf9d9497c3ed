//! DS18B20 protocol engine.
//!
//! Sequences the sensor's command set through the bus engine's bit
//! primitives and offers a request/poll contract upward:
//!
//! ```text
//!  Init ─▶ Idle ─▶ DetectPresence ─▶ SkipRom ─┬─▶ ConfigWriteScratchpad ─▶ ConfigTAlarm0
//!           ▲            ▲                     │      ─▶ ConfigTAlarm1 ─▶ ConfigResolution ─▶ Idle
//!           │            │                     ├─▶ ConvertTemperature ─▶ PollConversion ─┐
//!           │            └─────────────────────┼─────────────────────────────────────────┘
//!           │                                  └─▶ ReadScratchpad ─▶ AcquiringScratchpad ─▶ Idle
//!           └──── ErrorFound (auto-recover) ◀── presence / timeout / CRC / bus fault
//! ```
//!
//! `tick()` runs every 1 ms and performs at most one bus action.  Which
//! branch follows `SkipRom` depends on the pending event: a configure
//! request, a read request, or a finished conversion.

pub mod ds18b20;

use log::{debug, info, warn};

use crate::app::ports::TemperatureSource;
use crate::config::SensorConfig;
use crate::error::SensorFault;
use crate::onewire::transfer::{ByteReader, ByteWriter, Transfer};
use crate::onewire::{BitBus, Presence};
use ds18b20::{Centidegrees, SCRATCHPAD_LEN, Scratchpad, function, rom};

/// Period at which [`SensorEngine::tick`] is called.
pub const TICK_MS: u32 = 1;

/// Protocol phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    Init,
    Idle,
    DetectPresence,
    SkipRom,
    ConfigWriteScratchpad,
    ConfigTAlarm0,
    ConfigTAlarm1,
    ConfigResolution,
    ConvertTemperature,
    PollConversion,
    ReadScratchpad,
    AcquiringScratchpad,
    ErrorFound,
}

/// Single-slot request/event register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingEvent {
    None,
    ConfigureRequested,
    ReadRequested,
    ConversionFinished,
    TemperatureReady,
}

pub struct SensorEngine<B> {
    bus: B,
    config: SensorConfig,
    state: SensorState,
    pending: PendingEvent,
    scratchpad: [u8; SCRATCHPAD_LEN],
    index: usize,
    writer: Option<ByteWriter>,
    reader: Option<ByteReader>,
    /// A presence or polling slot was issued and not yet collected.
    slot_in_flight: bool,
    retries_left: u8,
    poll_elapsed_ms: u32,
    raw_temperature: i16,
    configure_wanted: bool,
    configured: bool,
    fault: Option<SensorFault>,
    fault_unread: bool,
}

impl<B: BitBus> SensorEngine<B> {
    pub fn new(bus: B, config: SensorConfig) -> Self {
        Self {
            bus,
            config,
            state: SensorState::Init,
            pending: PendingEvent::None,
            scratchpad: [0; SCRATCHPAD_LEN],
            index: 0,
            writer: None,
            reader: None,
            slot_in_flight: false,
            retries_left: 0,
            poll_elapsed_ms: 0,
            raw_temperature: 0,
            configure_wanted: false,
            configured: false,
            fault: None,
            fault_unread: false,
        }
    }

    /// Back to `Init` with an empty scratchpad and no pending event.
    pub fn initialize(&mut self) {
        self.state = SensorState::Init;
        self.pending = PendingEvent::None;
        self.scratchpad = [0; SCRATCHPAD_LEN];
        self.index = 0;
        self.writer = None;
        self.reader = None;
        self.slot_in_flight = false;
        self.configured = false;
        self.fault = None;
        self.fault_unread = false;
    }

    /// Request a write of TH, TL and the resolution register.
    pub fn configure(&mut self) {
        if self.request(PendingEvent::ConfigureRequested) {
            self.configure_wanted = true;
        }
    }

    /// Request a convert-then-read cycle.
    pub fn start_acquisition(&mut self) {
        self.request(PendingEvent::ReadRequested);
    }

    /// True exactly once per completed acquisition.
    pub fn is_temperature_ready(&mut self) -> bool {
        if self.pending == PendingEvent::TemperatureReady {
            self.pending = PendingEvent::None;
            true
        } else {
            false
        }
    }

    /// Latest reading, native Q12.4 (scratchpad bytes 0–1).
    pub fn get_temperature(&self) -> i16 {
        self.raw_temperature
    }

    /// Latest reading in hundredths of a degree.
    pub fn temperature(&self) -> Centidegrees {
        Centidegrees::from_raw(self.raw_temperature)
    }

    pub fn state(&self) -> SensorState {
        self.state
    }

    pub fn pending(&self) -> PendingEvent {
        self.pending
    }

    /// Bytes of the scratchpad read so far in the current acquisition.
    pub fn scratchpad_index(&self) -> usize {
        self.index
    }

    pub fn scratchpad(&self) -> Scratchpad {
        Scratchpad(self.scratchpad)
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Last fault, cleared by the next good reading.
    pub fn fault(&self) -> Option<SensorFault> {
        self.fault
    }

    /// Last fault, reported once.
    pub fn take_fault(&mut self) -> Option<SensorFault> {
        if self.fault_unread {
            self.fault_unread = false;
            self.fault
        } else {
            None
        }
    }

    pub fn set_config(&mut self, config: SensorConfig) {
        self.config = config;
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Advance by at most one bus action.  Returns whether anything happened.
    pub fn tick(&mut self) -> bool {
        let result = match self.state {
            SensorState::Init => {
                self.index = 0;
                self.go(SensorState::Idle);
                Ok(true)
            }
            SensorState::Idle => Ok(self.on_idle()),
            SensorState::DetectPresence => self.detect_presence(),
            SensorState::SkipRom => {
                let next = match self.pending {
                    PendingEvent::ConfigureRequested => SensorState::ConfigWriteScratchpad,
                    PendingEvent::ConversionFinished => SensorState::ReadScratchpad,
                    _ => SensorState::ConvertTemperature,
                };
                self.send_then(rom::SKIP_ROM, next)
            }
            SensorState::ConfigWriteScratchpad => {
                self.send_then(function::WRITE_SCRATCHPAD, SensorState::ConfigTAlarm0)
            }
            SensorState::ConfigTAlarm0 => {
                self.send_then(self.config.alarm_high as u8, SensorState::ConfigTAlarm1)
            }
            SensorState::ConfigTAlarm1 => {
                self.send_then(self.config.alarm_low as u8, SensorState::ConfigResolution)
            }
            SensorState::ConfigResolution => {
                let byte = self.config.resolution.config_byte();
                let progressed = self.send_then(byte, SensorState::Idle);
                if self.state == SensorState::Idle {
                    self.pending = PendingEvent::None;
                    self.configured = true;
                    info!("sensor: configured ({:?})", self.config.resolution);
                }
                progressed
            }
            SensorState::ConvertTemperature => {
                self.send_then(function::CONVERT_T, SensorState::PollConversion)
            }
            SensorState::PollConversion => self.poll_conversion(),
            SensorState::ReadScratchpad => {
                self.send_then(function::READ_SCRATCHPAD, SensorState::AcquiringScratchpad)
            }
            SensorState::AcquiringScratchpad => self.acquire_scratchpad(),
            SensorState::ErrorFound => {
                if self.config.auto_recover {
                    self.go(SensorState::Init);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        };

        match result {
            Ok(progressed) => progressed,
            Err(fault) => {
                self.fail(fault);
                true
            }
        }
    }

    // -----------------------------------------------------------------------
    // State handlers
    // -----------------------------------------------------------------------

    fn on_idle(&mut self) -> bool {
        if self.pending == PendingEvent::None && self.configure_wanted && !self.configured {
            // A configure lost to a fault is re-issued before the next read.
            self.pending = PendingEvent::ConfigureRequested;
        }
        match self.pending {
            PendingEvent::ConfigureRequested | PendingEvent::ReadRequested => {
                self.go(SensorState::DetectPresence);
                true
            }
            _ => false,
        }
    }

    fn detect_presence(&mut self) -> Result<bool, SensorFault> {
        if !self.bus.is_idle() {
            return Ok(false);
        }
        if !self.slot_in_flight {
            self.bus.start_detect_presence()?;
            self.slot_in_flight = true;
            return Ok(true);
        }
        self.slot_in_flight = false;
        match self.bus.presence() {
            Presence::Present => {
                self.go(SensorState::SkipRom);
                Ok(true)
            }
            Presence::Absent | Presence::NotReady if self.retries_left > 0 => {
                self.retries_left -= 1;
                debug!("sensor: no presence pulse, {} retries left", self.retries_left);
                Ok(true)
            }
            Presence::Absent | Presence::NotReady => Err(SensorFault::NoDevicePresent),
        }
    }

    /// A read slot returns 1 once the conversion is done.
    fn poll_conversion(&mut self) -> Result<bool, SensorFault> {
        self.poll_elapsed_ms += TICK_MS;
        if self.poll_elapsed_ms > u32::from(self.config.conversion_timeout_ms) {
            return Err(SensorFault::ConversionTimeout);
        }
        if !self.bus.is_idle() {
            return Ok(false);
        }
        if self.slot_in_flight {
            self.slot_in_flight = false;
            match self.bus.take_bit() {
                Some(true) => {
                    debug!("sensor: conversion done after {} ms", self.poll_elapsed_ms);
                    self.pending = PendingEvent::ConversionFinished;
                    self.go(SensorState::DetectPresence);
                    return Ok(true);
                }
                Some(false) => {}
                None => return Err(SensorFault::BusFault),
            }
        }
        self.bus.start_read_bit()?;
        self.slot_in_flight = true;
        Ok(true)
    }

    fn acquire_scratchpad(&mut self) -> Result<bool, SensorFault> {
        let reader = self.reader.get_or_insert_with(ByteReader::new);
        match reader.step(&mut self.bus)? {
            Transfer::Complete(byte) => {
                self.reader = None;
                self.scratchpad[self.index] = byte;
                self.index += 1;
                if self.index == SCRATCHPAD_LEN {
                    self.finish_acquisition()?;
                }
                Ok(true)
            }
            other => Ok(other.made_progress()),
        }
    }

    fn finish_acquisition(&mut self) -> Result<(), SensorFault> {
        let pad = Scratchpad(self.scratchpad);
        if !pad.is_valid() {
            return Err(SensorFault::CrcMismatch);
        }
        self.raw_temperature = pad.raw_temperature();
        self.fault = None;
        self.pending = PendingEvent::TemperatureReady;
        self.go(SensorState::Idle);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Step the current state's byte write; on completion move to `next`.
    fn send_then(&mut self, byte: u8, next: SensorState) -> Result<bool, SensorFault> {
        let writer = self.writer.get_or_insert_with(|| ByteWriter::new(byte));
        match writer.step(&mut self.bus)? {
            Transfer::Complete(()) => {
                self.writer = None;
                self.go(next);
                Ok(true)
            }
            other => Ok(other.made_progress()),
        }
    }

    /// Returns whether the request took the slot.
    fn request(&mut self, event: PendingEvent) -> bool {
        if self.pending == PendingEvent::None {
            self.pending = event;
            true
        } else {
            debug!("sensor: {:?} dropped, {:?} pending", event, self.pending);
            false
        }
    }

    fn go(&mut self, next: SensorState) {
        debug!("sensor: {:?} -> {:?}", self.state, next);
        match next {
            SensorState::DetectPresence if self.state != SensorState::DetectPresence => {
                self.retries_left = self.config.presence_retries;
                self.slot_in_flight = false;
            }
            SensorState::PollConversion => {
                self.poll_elapsed_ms = 0;
                self.slot_in_flight = false;
            }
            SensorState::AcquiringScratchpad => {
                self.index = 0;
                self.scratchpad = [0; SCRATCHPAD_LEN];
            }
            _ => {}
        }
        self.state = next;
    }

    fn fail(&mut self, fault: SensorFault) {
        warn!("sensor: {} in {:?}", fault, self.state);
        self.fault = Some(fault);
        self.fault_unread = true;
        self.pending = PendingEvent::None;
        self.writer = None;
        self.reader = None;
        self.slot_in_flight = false;
        self.go(SensorState::ErrorFound);
    }
}

impl<B: BitBus> TemperatureSource for SensorEngine<B> {
    fn start_acquisition(&mut self) {
        SensorEngine::start_acquisition(self);
    }

    fn is_temperature_ready(&mut self) -> bool {
        SensorEngine::is_temperature_ready(self)
    }

    fn temperature(&self) -> Centidegrees {
        SensorEngine::temperature(self)
    }

    fn take_fault(&mut self) -> Option<SensorFault> {
        SensorEngine::take_fault(self)
    }
}
