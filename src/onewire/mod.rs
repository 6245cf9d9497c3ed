//! Interrupt-driven 1-Wire bus timing engine.
//!
//! The engine generates reset/presence, write-bit and read-bit time slots
//! without ever spinning.  A start call drives the line low and arms the
//! compare timer; every timer interrupt then advances one timing segment:
//!
//! ```text
//!            ┌──────────────────────────────────────────────────────┐
//!   start ──▶│ PresenceDriveLow ─▶ PresenceSample ─▶ PresenceRecov. │──┐
//!   start ──▶│ Write1DriveLow ──▶ Write1Recovery                    │──┤
//!   start ──▶│ Write0DriveLow ──▶ Write0Recovery                    │──┼─▶ Idle
//!   start ──▶│ ReadBitDriveLow ─▶ ReadBitSample ─▶ ReadBitRecovery  │──┘
//!            └──────────────────────────────────────────────────────┘
//! ```
//!
//! Phases longer than the timer's compare maximum are split into several
//! interrupt periods (see [`timing::next_chunk`]); the protocol state only
//! moves once the whole phase has elapsed.
//!
//! Byte transfers are built on top by the caller, one slot at a time
//! ([`transfer`]).  The engine itself never queues: a start while a slot is
//! in progress is refused with [`BusError::Busy`].

pub mod shared;
pub mod timing;
pub mod transfer;

use embedded_hal::digital::{InputPin, OutputPin};
use log::error;

pub use crate::error::BusError;
use timing::{BusTiming, next_chunk};

// ---------------------------------------------------------------------------
// Hardware seams
// ---------------------------------------------------------------------------

/// A compare-match timer that interrupts after a programmed number of ticks.
///
/// Hardware may auto-reload; the engine reprograms or stops the timer on
/// every interrupt it handles.
pub trait CompareTimer {
    /// Largest count the compare register accepts.
    const MAX_TICKS: u16;
    /// Timer ticks per microsecond after the prescaler.
    const TICKS_PER_US: u32;

    /// Count `ticks` from now and interrupt when reached.
    fn start(&mut self, ticks: u16);

    /// Stop counting; no further interrupts.
    fn stop(&mut self);
}

/// Start/poll/idle surface the protocol layer drives the bus through.
pub trait BitBus {
    /// No time slot in progress.
    fn is_idle(&mut self) -> bool;
    fn start_detect_presence(&mut self) -> Result<(), BusError>;
    fn start_write_bit(&mut self, bit: bool) -> Result<(), BusError>;
    fn start_read_bit(&mut self) -> Result<(), BusError>;
    /// Result of the last presence cycle; consumes it.
    fn presence(&mut self) -> Presence;
    /// Result of the last read slot; consumes it.
    fn take_bit(&mut self) -> Option<bool>;

    /// Slots aborted on a pin error since boot.
    fn line_faults(&self) -> u32 {
        0
    }
}

// ---------------------------------------------------------------------------
// Engine state
// ---------------------------------------------------------------------------

/// Timing phase the engine is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    Idle,
    PresenceDriveLow,
    PresenceSample,
    PresenceRecovery,
    Write1DriveLow,
    Write1Recovery,
    Write0DriveLow,
    Write0Recovery,
    ReadBitDriveLow,
    ReadBitSample,
    ReadBitRecovery,
}

/// Last sampled line level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    NotReady,
    Zero,
    One,
}

/// Outcome of a reset/presence cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// A device pulled the line low during the presence window.
    Present,
    /// The line stayed high.
    Absent,
    /// No presence sample since the last read.
    NotReady,
}

/// The timing engine.  Owns the open-drain bus pin and the compare timer.
pub struct BusEngine<P, T> {
    pin: P,
    timer: T,
    timing: BusTiming,
    state: BusState,
    /// Ticks still owed to the current phase beyond the armed period.
    remaining: u32,
    sample: Sample,
    line_faults: u32,
}

impl<P, T> BusEngine<P, T>
where
    P: OutputPin + InputPin,
    T: CompareTimer,
{
    /// Engine with standard-speed timing for the timer's tick rate.
    pub fn new(pin: P, timer: T) -> Self {
        Self::with_timing(pin, timer, BusTiming::standard(T::TICKS_PER_US))
    }

    pub fn with_timing(pin: P, timer: T, timing: BusTiming) -> Self {
        Self {
            pin,
            timer,
            timing,
            state: BusState::Idle,
            remaining: 0,
            sample: Sample::NotReady,
            line_faults: 0,
        }
    }

    /// Release the line, stop the timer and forget any sample.  Idempotent.
    pub fn initialize(&mut self) {
        self.timer.stop();
        if self.pin.set_high().is_err() {
            self.line_faults += 1;
        }
        self.state = BusState::Idle;
        self.remaining = 0;
        self.sample = Sample::NotReady;
    }

    pub fn state(&self) -> BusState {
        self.state
    }

    pub fn timing(&self) -> &BusTiming {
        &self.timing
    }

    /// Pin errors seen since boot.
    pub fn line_faults(&self) -> u32 {
        self.line_faults
    }

    pub fn is_idle(&self) -> bool {
        self.state == BusState::Idle
    }

    pub fn start_detect_presence(&mut self) -> Result<(), BusError> {
        self.begin_slot(BusState::PresenceDriveLow, self.timing.reset_low)
    }

    pub fn start_write_bit(&mut self, bit: bool) -> Result<(), BusError> {
        if bit {
            self.begin_slot(BusState::Write1DriveLow, self.timing.write1_low)
        } else {
            self.begin_slot(BusState::Write0DriveLow, self.timing.write0_low)
        }
    }

    pub fn start_read_bit(&mut self) -> Result<(), BusError> {
        self.begin_slot(BusState::ReadBitDriveLow, self.timing.read_low)
    }

    pub fn presence(&mut self) -> Presence {
        match core::mem::replace(&mut self.sample, Sample::NotReady) {
            Sample::Zero => Presence::Present,
            Sample::One => Presence::Absent,
            Sample::NotReady => Presence::NotReady,
        }
    }

    pub fn take_bit(&mut self) -> Option<bool> {
        match core::mem::replace(&mut self.sample, Sample::NotReady) {
            Sample::Zero => Some(false),
            Sample::One => Some(true),
            Sample::NotReady => None,
        }
    }

    /// Timer interrupt body.  Advances by exactly one timing segment.
    pub fn on_timer_interrupt(&mut self) {
        if self.state == BusState::Idle {
            // Late interrupt after the last phase stopped the timer.
            return;
        }

        if self.remaining > 0 {
            let chunk = next_chunk(&mut self.remaining, T::MAX_TICKS);
            self.timer.start(chunk);
            return;
        }

        let t = self.timing;
        match self.state {
            BusState::Idle => {}

            BusState::PresenceDriveLow => {
                if self.release() {
                    self.enter(BusState::PresenceSample, t.presence_sample);
                }
            }
            BusState::PresenceSample => {
                // Device present ⇔ it holds the line low.
                if let Some(level) = self.read_line() {
                    self.sample = level;
                    self.enter(BusState::PresenceRecovery, t.presence_recovery);
                }
            }

            BusState::Write1DriveLow => {
                if self.release() {
                    self.enter(BusState::Write1Recovery, t.write1_recovery);
                }
            }
            BusState::Write0DriveLow => {
                if self.release() {
                    self.enter(BusState::Write0Recovery, t.write0_recovery);
                }
            }

            BusState::ReadBitDriveLow => {
                if self.release() {
                    self.enter(BusState::ReadBitSample, t.read_sample);
                }
            }
            BusState::ReadBitSample => {
                if let Some(level) = self.read_line() {
                    self.sample = level;
                    self.enter(BusState::ReadBitRecovery, t.read_recovery);
                }
            }

            BusState::PresenceRecovery
            | BusState::Write1Recovery
            | BusState::Write0Recovery
            | BusState::ReadBitRecovery => {
                self.state = BusState::Idle;
                self.timer.stop();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn begin_slot(&mut self, state: BusState, low_ticks: u32) -> Result<(), BusError> {
        if self.state != BusState::Idle {
            return Err(BusError::Busy);
        }
        self.sample = Sample::NotReady;
        if self.pin.set_low().is_err() {
            self.line_faults += 1;
            error!("onewire: failed to drive line low");
            return Err(BusError::Unavailable);
        }
        self.enter(state, low_ticks);
        Ok(())
    }

    /// Switch phase and arm the first compare period of its delay.
    fn enter(&mut self, state: BusState, ticks: u32) {
        self.state = state;
        self.remaining = ticks.max(1);
        let first = next_chunk(&mut self.remaining, T::MAX_TICKS);
        self.timer.start(first);
    }

    fn release(&mut self) -> bool {
        if self.pin.set_high().is_ok() {
            true
        } else {
            self.abort();
            false
        }
    }

    fn read_line(&mut self) -> Option<Sample> {
        match self.pin.is_low() {
            Ok(true) => Some(Sample::Zero),
            Ok(false) => Some(Sample::One),
            Err(_) => {
                self.abort();
                None
            }
        }
    }

    /// Give up on the current slot: line released, no sample, idle.
    fn abort(&mut self) {
        self.line_faults += 1;
        let _ = self.pin.set_high();
        self.timer.stop();
        self.state = BusState::Idle;
        self.remaining = 0;
        self.sample = Sample::NotReady;
    }
}

impl<P, T> BitBus for BusEngine<P, T>
where
    P: OutputPin + InputPin,
    T: CompareTimer,
{
    fn is_idle(&mut self) -> bool {
        BusEngine::is_idle(self)
    }

    fn start_detect_presence(&mut self) -> Result<(), BusError> {
        BusEngine::start_detect_presence(self)
    }

    fn start_write_bit(&mut self, bit: bool) -> Result<(), BusError> {
        BusEngine::start_write_bit(self, bit)
    }

    fn start_read_bit(&mut self) -> Result<(), BusError> {
        BusEngine::start_read_bit(self)
    }

    fn presence(&mut self) -> Presence {
        BusEngine::presence(self)
    }

    fn take_bit(&mut self) -> Option<bool> {
        BusEngine::take_bit(self)
    }

    fn line_faults(&self) -> u32 {
        BusEngine::line_faults(self)
    }
}
