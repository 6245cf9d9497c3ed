//! Bistable (latching) relay bank.
//!
//! Each relay has a SET coil and a RESET coil.  A short pulse on SET closes
//! the contact, a pulse on RESET opens it; neither needs a held level.
//!
//! ```text
//!   pulse(Heating, Set) ─▶ queue ─▶ tick_1ms: assert ─▶ hold N ms ─▶ release
//!                                    (one coil energised at a time)
//! ```
//!
//! Pulses are paced from the 1 ms task, so nothing here blocks.  Dropping
//! the bank releases every coil.

use embedded_hal::digital::OutputPin;
use heapless::Deque;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::RelayPort;

/// Pulses that may wait behind the one in progress.
pub const PULSE_QUEUE_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayId {
    /// Relay 0, switched in winter.
    Heating,
    /// Relay 1, switched in summer.
    Cooling,
}

impl RelayId {
    pub const ALL: [Self; 2] = [Self::Heating, Self::Cooling];

    pub const fn index(self) -> usize {
        match self {
            Self::Heating => 0,
            Self::Cooling => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coil {
    /// Close the contact (output ON).
    Set,
    /// Open the contact (output OFF).
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseRequest {
    pub relay: RelayId,
    pub coil: Coil,
}

/// Coil pair of one relay.
pub struct LatchingRelay<P> {
    pub set: P,
    pub reset: P,
}

impl<P: OutputPin> LatchingRelay<P> {
    pub fn new(set: P, reset: P) -> Self {
        Self { set, reset }
    }

    fn coil(&mut self, coil: Coil) -> &mut P {
        match coil {
            Coil::Set => &mut self.set,
            Coil::Reset => &mut self.reset,
        }
    }
}

pub struct RelayBank<P: OutputPin> {
    relays: [LatchingRelay<P>; 2],
    queue: Deque<PulseRequest, PULSE_QUEUE_LEN>,
    /// Pulse being held and the 1 ms ticks it has left.
    energised: Option<(PulseRequest, u8)>,
    pulse_ms: u8,
    pulses: u32,
    dropped: u32,
    pin_errors: u32,
}

impl<P: OutputPin> RelayBank<P> {
    /// Coils start released.  `pulse_ms` of 0 is treated as 1.
    pub fn new(heating: LatchingRelay<P>, cooling: LatchingRelay<P>, pulse_ms: u8) -> Self {
        let mut bank = Self {
            relays: [heating, cooling],
            queue: Deque::new(),
            energised: None,
            pulse_ms: pulse_ms.max(1),
            pulses: 0,
            dropped: 0,
            pin_errors: 0,
        };
        bank.release_all();
        bank
    }

    /// Queue a RESET pulse on every relay so the contacts are in a known state.
    pub fn reset_all(&mut self) {
        for relay in RelayId::ALL {
            self.pulse(relay, Coil::Reset);
        }
    }

    pub fn set_pulse_ms(&mut self, pulse_ms: u8) {
        self.pulse_ms = pulse_ms.max(1);
    }

    /// Completed pulses since construction.
    pub fn pulses(&self) -> u32 {
        self.pulses
    }

    /// Pulses refused because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn pin_errors(&self) -> u32 {
        self.pin_errors
    }

    /// Coil currently energised, if any.
    pub fn energised(&self) -> Option<PulseRequest> {
        self.energised.map(|(req, _)| req)
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn start_next(&mut self) {
        let Some(req) = self.queue.pop_front() else {
            return;
        };
        let pin = self.relays[req.relay.index()].coil(req.coil);
        if pin.set_high().is_err() {
            self.pin_errors += 1;
            warn!("relays: {:?}/{:?} assert failed, pulse abandoned", req.relay, req.coil);
            let _ = pin.set_low();
            return;
        }
        debug!("relays: {:?}/{:?} energised", req.relay, req.coil);
        self.energised = Some((req, self.pulse_ms));
    }

    fn finish(&mut self, req: PulseRequest) {
        let pin = self.relays[req.relay.index()].coil(req.coil);
        if pin.set_low().is_err() {
            self.pin_errors += 1;
            warn!("relays: {:?}/{:?} release failed", req.relay, req.coil);
        }
        self.energised = None;
        self.pulses += 1;
    }

    fn release_all(&mut self) {
        for relay in &mut self.relays {
            let set = relay.set.set_low().is_ok();
            let reset = relay.reset.set_low().is_ok();
            if !(set && reset) {
                self.pin_errors += 1;
            }
        }
    }
}

impl<P: OutputPin> RelayPort for RelayBank<P> {
    fn pulse(&mut self, relay: RelayId, coil: Coil) {
        if self.queue.push_back(PulseRequest { relay, coil }).is_err() {
            self.dropped += 1;
            warn!("relays: queue full, {:?}/{:?} dropped", relay, coil);
        }
    }

    /// Release a finished pulse, or energise the next queued one.
    fn tick_1ms(&mut self) {
        match self.energised {
            Some((req, left)) if left <= 1 => self.finish(req),
            Some((req, left)) => self.energised = Some((req, left - 1)),
            None => self.start_next(),
        }
    }

    fn is_busy(&self) -> bool {
        self.energised.is_some() || !self.queue.is_empty()
    }
}

impl<P: OutputPin> Drop for RelayBank<P> {
    fn drop(&mut self) {
        self.release_all();
    }
}
