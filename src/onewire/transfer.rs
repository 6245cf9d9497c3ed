//! Caller-driven byte transfers.
//!
//! A byte is eight single-bit time slots, least-significant bit first.
//! Each `step()` does at most one thing: nothing while the bus is busy,
//! otherwise issue (or collect and issue) one slot.  The protocol engine
//! calls `step()` once per tick.

use super::{BitBus, BusError};

/// Result of one transfer step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer<T> {
    /// Bus still busy with the previous slot.
    Stalled,
    /// A slot was issued or its result collected.
    Advanced,
    /// All eight slots finished.
    Complete(T),
}

impl<T> Transfer<T> {
    pub fn made_progress(&self) -> bool {
        !matches!(self, Self::Stalled)
    }
}

/// Writes one byte, LSB first.
#[derive(Debug, Clone)]
pub struct ByteWriter {
    byte: u8,
    sent: u8,
}

impl ByteWriter {
    pub const fn new(byte: u8) -> Self {
        Self { byte, sent: 0 }
    }

    pub fn step<B: BitBus>(&mut self, bus: &mut B) -> Result<Transfer<()>, BusError> {
        if !bus.is_idle() {
            return Ok(Transfer::Stalled);
        }
        if self.sent == 8 {
            return Ok(Transfer::Complete(()));
        }
        bus.start_write_bit((self.byte >> self.sent) & 1 == 1)?;
        self.sent += 1;
        Ok(Transfer::Advanced)
    }
}

/// Reads one byte, LSB first.
#[derive(Debug, Clone, Default)]
pub struct ByteReader {
    value: u8,
    received: u8,
    in_flight: bool,
}

impl ByteReader {
    pub const fn new() -> Self {
        Self {
            value: 0,
            received: 0,
            in_flight: false,
        }
    }

    /// Collects the finished slot (if any) and issues the next one in the
    /// same step, so a byte takes nine steps rather than sixteen.
    pub fn step<B: BitBus>(&mut self, bus: &mut B) -> Result<Transfer<u8>, BusError> {
        if !bus.is_idle() {
            return Ok(Transfer::Stalled);
        }
        if self.in_flight {
            // A read slot that finished without a sample means the line
            // faulted mid-slot.
            let bit = bus.take_bit().ok_or(BusError::Unavailable)?;
            self.value |= u8::from(bit) << self.received;
            self.received += 1;
            self.in_flight = false;
        }
        if self.received == 8 {
            return Ok(Transfer::Complete(self.value));
        }
        bus.start_read_bit()?;
        self.in_flight = true;
        Ok(Transfer::Advanced)
    }
}
