//! Bus engine shared between the timer interrupt and the 1 ms task.
//!
//! The engine lives in a `static` behind a critical-section mutex.  Every
//! start (drive low + arm timer) and every interrupt runs with interrupts
//! masked, so the two contexts never interleave while a phase is being set
//! up.  Foreground code reaches the engine only through [`BitBus`] on
//! `&SharedBus`.
//!
//! ```text
//!   timer ISR ── on_timer_interrupt() ─┐
//!                                      ├─▶ Mutex<CriticalSection, RefCell<BusEngine>>
//!   1 ms task ── BitBus for &SharedBus ┘
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::digital::{InputPin, OutputPin};

use super::{BitBus, BusEngine, BusError, CompareTimer, Presence};

pub struct SharedBus<P, T> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Option<BusEngine<P, T>>>>,
}

impl<P, T> SharedBus<P, T> {
    /// Empty slot, suitable for a `static`.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }
}

impl<P, T> Default for SharedBus<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T> SharedBus<P, T>
where
    P: OutputPin + InputPin,
    T: CompareTimer,
{
    /// Place the engine (once, at boot) and initialize it.
    pub fn install(&self, mut engine: BusEngine<P, T>) {
        engine.initialize();
        self.inner.lock(|cell| {
            cell.replace(Some(engine));
        });
    }

    pub fn is_installed(&self) -> bool {
        self.inner.lock(|cell| cell.borrow().is_some())
    }

    /// Timer interrupt entry point.
    pub fn on_timer_interrupt(&self) {
        self.with(BusEngine::on_timer_interrupt);
    }

    /// Pin errors seen by the engine, 0 when not installed.
    pub fn line_faults(&self) -> u32 {
        self.with(|e| e.line_faults()).unwrap_or(0)
    }

    /// Run `f` on the engine inside one critical section.
    pub fn with<R>(&self, f: impl FnOnce(&mut BusEngine<P, T>) -> R) -> Option<R> {
        self.inner
            .lock(|cell| cell.borrow_mut().as_mut().map(f))
    }
}

impl<P, T> BitBus for &SharedBus<P, T>
where
    P: OutputPin + InputPin,
    T: CompareTimer,
{
    fn is_idle(&mut self) -> bool {
        self.with(|e| e.is_idle()).unwrap_or(false)
    }

    fn start_detect_presence(&mut self) -> Result<(), BusError> {
        self.with(BusEngine::start_detect_presence)
            .unwrap_or(Err(BusError::Unavailable))
    }

    fn start_write_bit(&mut self, bit: bool) -> Result<(), BusError> {
        self.with(|e| e.start_write_bit(bit))
            .unwrap_or(Err(BusError::Unavailable))
    }

    fn start_read_bit(&mut self) -> Result<(), BusError> {
        self.with(BusEngine::start_read_bit)
            .unwrap_or(Err(BusError::Unavailable))
    }

    fn presence(&mut self) -> Presence {
        self.with(BusEngine::presence).unwrap_or(Presence::NotReady)
    }

    fn take_bit(&mut self) -> Option<bool> {
        self.with(BusEngine::take_bit).flatten()
    }

    fn line_faults(&self) -> u32 {
        SharedBus::line_faults(self)
    }
}
