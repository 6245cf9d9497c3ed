//! Unified error types for the SmartNode firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! boot glue's error handling uniform.  All variants are `Copy` so they can
//! travel through the protocol engine and the event sinks without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The 1-Wire timing engine refused a request.
    Bus(BusError),
    /// The temperature sensor faulted.
    Sensor(SensorFault),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// A radio payload could not be encoded, decoded or sent.
    Radio(RadioError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Radio(e) => write!(f, "radio: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// A time slot is still in progress; the engine does not queue.
    Busy,
    /// The shared engine has not been installed yet.
    Unavailable,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "time slot in progress"),
            Self::Unavailable => write!(f, "bus engine not installed"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor faults
// ---------------------------------------------------------------------------

/// Faults the DS18B20 protocol engine reports outward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SensorFault {
    /// No presence pulse after every allowed reset.
    NoDevicePresent,
    /// The device never signalled conversion complete.
    ConversionTimeout,
    /// Scratchpad CRC-8 did not check out.
    CrcMismatch,
    /// The bus refused a slot or lost a sample.
    BusFault,
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDevicePresent => write!(f, "no device present"),
            Self::ConversionTimeout => write!(f, "conversion timed out"),
            Self::CrcMismatch => write!(f, "scratchpad CRC mismatch"),
            Self::BusFault => write!(f, "bus fault"),
        }
    }
}

impl From<BusError> for SensorFault {
    fn from(_: BusError) -> Self {
        Self::BusFault
    }
}

impl From<SensorFault> for Error {
    fn from(e: SensorFault) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Hysteresis must be strictly positive.
    InvalidHysteresis,
    /// Setpoint outside the sensor's -55..=125 °C range.
    SetpointOutOfRange,
    /// A period, timeout or pulse width is zero.
    ZeroInterval,
    /// Conversion timeout shorter than the configured resolution needs.
    ConversionTimeoutTooShort,
    /// Thermostat gives up on a reading before the sensor can deliver one.
    ReadingTimeoutTooShort,
    /// The loader could not produce a configuration.
    LoadFailed,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidHysteresis => write!(f, "hysteresis must be > 0"),
            Self::SetpointOutOfRange => write!(f, "setpoint out of sensor range"),
            Self::ZeroInterval => write!(f, "zero period, timeout or pulse width"),
            Self::ConversionTimeoutTooShort => {
                write!(f, "conversion timeout below resolution conversion time")
            }
            Self::ReadingTimeoutTooShort => {
                write!(f, "reading timeout below sensor conversion timeout")
            }
            Self::LoadFailed => write!(f, "config load failed"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Radio errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// Frame does not fit the 32-byte payload.
    Encode,
    /// Received payload is not a valid command.
    Decode,
    /// Transceiver rejected the payload.
    Transmit,
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Encode => write!(f, "frame encode failed"),
            Self::Decode => write!(f, "payload decode failed"),
            Self::Transmit => write!(f, "transmit failed"),
        }
    }
}

impl From<RadioError> for Error {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}
