//! Radio telemetry and command adapter.
//!
//! Frames are postcard-encoded and must fit one transceiver payload
//! ([`RADIO_PAYLOAD_LEN`] bytes).  The sink keeps a running picture of the
//! node from the events it sees and sends a frame whenever something worth
//! reporting happens:
//!
//! ```text
//!   AppEvent ──▶ RadioSink ──▶ TelemetryFrame ──postcard──▶ RadioPort::transmit
//!   RadioPort::receive ──postcard──▶ AppCommand ──▶ AppService::handle_command
//! ```

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::commands::AppCommand;
use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, RADIO_PAYLOAD_LEN, RadioPort};
use crate::config::ThermostatMode;
use crate::error::{RadioError, SensorFault};
use crate::sensor::ds18b20::Centidegrees;

/// Why a frame was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameKind {
    Boot,
    Reading,
    Output,
    Fault,
    /// The thermostat gave up waiting for a reading.
    ReadingTimeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    pub seq: u16,
    pub kind: FrameKind,
    pub temperature: Option<Centidegrees>,
    pub mode: ThermostatMode,
    pub active: bool,
    pub enabled: bool,
    pub fault: Option<SensorFault>,
}

impl TelemetryFrame {
    /// Encode into `buf`, returning the used prefix.
    pub fn encode<'a>(&self, buf: &'a mut [u8; RADIO_PAYLOAD_LEN]) -> Result<&'a [u8], RadioError> {
        postcard::to_slice(self, buf)
            .map(|used| &*used)
            .map_err(|_| RadioError::Encode)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, RadioError> {
        postcard::from_bytes(bytes).map_err(|_| RadioError::Decode)
    }
}

/// Parse a command out of a received payload.
pub fn decode_command(payload: &[u8]) -> Result<AppCommand, RadioError> {
    postcard::from_bytes(payload).map_err(|_| RadioError::Decode)
}

/// Encode a command the way [`decode_command`] expects it.
pub fn encode_command<'a>(
    cmd: &AppCommand,
    buf: &'a mut [u8; RADIO_PAYLOAD_LEN],
) -> Result<&'a [u8], RadioError> {
    postcard::to_slice(cmd, buf)
        .map(|used| &*used)
        .map_err(|_| RadioError::Encode)
}

// ───────────────────────────────────────────────────────────────
// RadioSink
// ───────────────────────────────────────────────────────────────

pub struct RadioSink<R> {
    radio: R,
    seq: u16,
    temperature: Option<Centidegrees>,
    mode: ThermostatMode,
    active: bool,
    enabled: bool,
    fault: Option<SensorFault>,
    sent: u32,
    failures: u32,
}

impl<R: RadioPort> RadioSink<R> {
    pub fn new(radio: R) -> Self {
        Self {
            radio,
            seq: 0,
            temperature: None,
            mode: ThermostatMode::Winter,
            active: false,
            enabled: true,
            fault: None,
            sent: 0,
            failures: 0,
        }
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn sent(&self) -> u32 {
        self.sent
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Next received command, if a payload is waiting.
    pub fn poll_command(&mut self) -> Option<Result<AppCommand, RadioError>> {
        let mut buf = [0u8; RADIO_PAYLOAD_LEN];
        let len = self.radio.receive(&mut buf)?;
        Some(decode_command(&buf[..len.min(RADIO_PAYLOAD_LEN)]))
    }

    fn frame(&self, kind: FrameKind) -> TelemetryFrame {
        TelemetryFrame {
            seq: self.seq,
            kind,
            temperature: self.temperature,
            mode: self.mode,
            active: self.active,
            enabled: self.enabled,
            fault: self.fault,
        }
    }

    fn send(&mut self, kind: FrameKind) {
        let frame = self.frame(kind);
        self.seq = self.seq.wrapping_add(1);
        let mut buf = [0u8; RADIO_PAYLOAD_LEN];
        let result = frame
            .encode(&mut buf)
            .and_then(|payload| self.radio.transmit(payload));
        match result {
            Ok(()) => {
                self.sent += 1;
                debug!("radio: frame {} ({:?}) sent", frame.seq, kind);
            }
            Err(e) => {
                self.failures += 1;
                warn!("radio: frame {} not sent: {}", frame.seq, e);
            }
        }
    }
}

impl<R: RadioPort> EventSink for RadioSink<R> {
    fn emit(&mut self, event: &AppEvent) {
        match *event {
            AppEvent::Started { mode, .. } => {
                self.mode = mode;
                self.send(FrameKind::Boot);
            }
            AppEvent::Reading(t) => {
                self.temperature = Some(t);
                self.fault = None;
                self.send(FrameKind::Reading);
            }
            AppEvent::OutputChanged { on, .. } => {
                self.active = on;
                self.send(FrameKind::Output);
            }
            AppEvent::SensorFault(fault) => {
                self.fault = Some(fault);
                self.send(FrameKind::Fault);
            }
            AppEvent::ReadingTimedOut => self.send(FrameKind::ReadingTimeout),
            AppEvent::RegulationChanged { enabled } => self.enabled = enabled,
            AppEvent::ConfigApplied(c) => self.mode = c.mode,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// NullRadio
// ───────────────────────────────────────────────────────────────

/// Stands in where no transceiver is fitted.
#[derive(Debug, Default)]
pub struct NullRadio;

impl RadioPort for NullRadio {
    fn transmit(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        if payload.len() > RADIO_PAYLOAD_LEN {
            return Err(RadioError::Transmit);
        }
        Ok(())
    }

    fn receive(&mut self, _buf: &mut [u8; RADIO_PAYLOAD_LEN]) -> Option<usize> {
        None
    }
}
