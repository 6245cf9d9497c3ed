//! DS18B20 command set, scratchpad layout and temperature units.

use core::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Command bytes
// ---------------------------------------------------------------------------

/// ROM commands.
pub mod rom {
    pub const SEARCH_ROM: u8 = 0xF0;
    pub const READ_ROM: u8 = 0x33;
    pub const MATCH_ROM: u8 = 0x55;
    /// Address every device at once; valid with a single device on the bus.
    pub const SKIP_ROM: u8 = 0xCC;
    pub const ALARM_SEARCH: u8 = 0xEC;
}

/// Function commands.
pub mod function {
    pub const CONVERT_T: u8 = 0x44;
    pub const WRITE_SCRATCHPAD: u8 = 0x4E;
    pub const READ_SCRATCHPAD: u8 = 0xBE;
    pub const COPY_SCRATCHPAD: u8 = 0x48;
    pub const RECALL_E2: u8 = 0xB8;
    pub const READ_POWER_SUPPLY: u8 = 0xB4;
}

/// Scratchpad size in bytes, CRC included.
pub const SCRATCHPAD_LEN: usize = 9;

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Conversion resolution (configuration register bits R1:R0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Bits9,
    Bits10,
    Bits11,
    Bits12,
}

impl Resolution {
    /// Configuration register value.
    pub const fn config_byte(self) -> u8 {
        match self {
            Self::Bits9 => 0x1F,
            Self::Bits10 => 0x3F,
            Self::Bits11 => 0x5F,
            Self::Bits12 => 0x7F,
        }
    }

    /// Worst-case conversion time from the datasheet.
    pub const fn conversion_time_ms(self) -> u16 {
        match self {
            Self::Bits9 => 94,
            Self::Bits10 => 188,
            Self::Bits11 => 375,
            Self::Bits12 => 750,
        }
    }

    pub fn from_config_byte(byte: u8) -> Self {
        match (byte >> 5) & 0b11 {
            0 => Self::Bits9,
            1 => Self::Bits10,
            2 => Self::Bits11,
            _ => Self::Bits12,
        }
    }
}

// ---------------------------------------------------------------------------
// CRC-8
// ---------------------------------------------------------------------------

/// Dallas/Maxim CRC-8 (x^8 + x^5 + x^4 + 1, reflected, init 0).
///
/// Running it over data plus its trailing CRC byte yields 0.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in data {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

// ---------------------------------------------------------------------------
// Scratchpad
// ---------------------------------------------------------------------------

/// The device's 9-byte register block.
///
/// ```text
///   0  temp LSB   1  temp MSB   2  TH   3  TL   4  config
///   5  0xFF       6  reserved   7  0x10 8  CRC
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Scratchpad(pub [u8; SCRATCHPAD_LEN]);

impl Scratchpad {
    /// Temperature in native Q12.4 units.
    pub fn raw_temperature(&self) -> i16 {
        i16::from_le_bytes([self.0[0], self.0[1]])
    }

    pub fn alarm_high(&self) -> i8 {
        self.0[2] as i8
    }

    pub fn alarm_low(&self) -> i8 {
        self.0[3] as i8
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::from_config_byte(self.0[4])
    }

    pub fn crc(&self) -> u8 {
        self.0[8]
    }

    pub fn crc_ok(&self) -> bool {
        crc8(&self.0) == 0
    }

    /// CRC checks out and the block is not all zeros (a line held low
    /// reads as zeros, whose CRC is also zero).
    pub fn is_valid(&self) -> bool {
        self.crc_ok() && self.0 != [0; SCRATCHPAD_LEN]
    }
}

// ---------------------------------------------------------------------------
// Temperature units
// ---------------------------------------------------------------------------

/// Temperature in hundredths of a degree Celsius.
///
/// The only temperature unit above the sensor boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Centidegrees(pub i16);

impl Centidegrees {
    pub const MIN_SENSOR: Self = Self(-5500);
    pub const MAX_SENSOR: Self = Self(12500);

    /// Convert a native Q12.4 reading (degrees = raw / 16).
    ///
    /// The magnitude is taken first (two's complement for negative
    /// readings), scaled by 6.25 with truncation, and the sign is put back,
    /// so `-x` always maps to the negation of `x`.
    pub fn from_raw(raw: i16) -> Self {
        let magnitude = i32::from(raw.unsigned_abs());
        let scaled = 6 * magnitude + magnitude / 4;
        let signed = if raw < 0 { -scaled } else { scaled };
        Self(signed.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16)
    }

    pub fn as_i32(self) -> i32 {
        i32::from(self.0)
    }
}

impl fmt::Display for Centidegrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}
