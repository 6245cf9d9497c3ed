//! Mock hardware adapters for integration tests.
//!
//! Records every coil edge, every emitted event and every radio payload so
//! tests can assert on the full history without touching real GPIO.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::digital::{ErrorType, OutputPin};
use smartnode::app::events::AppEvent;
use smartnode::app::ports::{EventSink, RADIO_PAYLOAD_LEN, RadioPort};
use smartnode::drivers::relays::{Coil, RelayId};
use smartnode::error::RadioError;

// ── Coils ─────────────────────────────────────────────────────

/// Coil index: heating SET/RESET, cooling SET/RESET.
fn coil_of(index: usize) -> (RelayId, Coil) {
    let relay = if index < 2 { RelayId::Heating } else { RelayId::Cooling };
    let coil = if index % 2 == 0 { Coil::Set } else { Coil::Reset };
    (relay, coil)
}

#[derive(Default)]
struct CoilState {
    level: [bool; 4],
    /// Rising edges, in order.
    pulses: Vec<(RelayId, Coil)>,
    high_ms: [u32; 4],
}

/// Shared record of the four coil lines.
#[derive(Clone, Default)]
pub struct CoilLog(Rc<RefCell<CoilState>>);

#[allow(dead_code)]
impl CoilLog {
    pub fn pin(&self, index: usize) -> CoilPin {
        CoilPin {
            log: self.clone(),
            index,
        }
    }

    /// Every pulse started so far.
    pub fn pulses(&self) -> Vec<(RelayId, Coil)> {
        self.0.borrow().pulses.clone()
    }

    /// Pulses after the two boot-time RESETs.
    pub fn pulses_after_boot(&self) -> Vec<(RelayId, Coil)> {
        self.pulses().into_iter().skip(2).collect()
    }

    pub fn any_energised(&self) -> bool {
        self.0.borrow().level.iter().any(|&l| l)
    }

    /// Count one millisecond against every coil that is high.
    pub fn sample_ms(&self) {
        let mut s = self.0.borrow_mut();
        for i in 0..4 {
            if s.level[i] {
                s.high_ms[i] += 1;
            }
        }
    }

    pub fn high_ms(&self, index: usize) -> u32 {
        self.0.borrow().high_ms[index]
    }

    /// Logical relay state replayed from the pulse history.
    pub fn latched(&self, relay: RelayId) -> bool {
        self.pulses()
            .iter()
            .rev()
            .find(|(r, _)| *r == relay)
            .is_some_and(|(_, c)| *c == Coil::Set)
    }
}

pub struct CoilPin {
    log: CoilLog,
    index: usize,
}

impl ErrorType for CoilPin {
    type Error = Infallible;
}

impl OutputPin for CoilPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.log.0.borrow_mut().level[self.index] = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        let mut s = self.log.0.borrow_mut();
        if !s.level[self.index] {
            s.level[self.index] = true;
            s.pulses.push(coil_of(self.index));
        }
        Ok(())
    }
}

// ── Events ────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn readings(&self) -> Vec<i16> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Reading(t) => Some(t.0),
                _ => None,
            })
            .collect()
    }

    pub fn outputs(&self) -> Vec<(RelayId, bool)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::OutputChanged { relay, on } => Some((*relay, *on)),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(*event);
    }
}

// ── Radio ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockRadio {
    pub sent: Vec<Vec<u8>>,
    pub inbox: VecDeque<Vec<u8>>,
    pub fail_tx: bool,
}

impl RadioPort for MockRadio {
    fn transmit(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        if self.fail_tx || payload.len() > RADIO_PAYLOAD_LEN {
            return Err(RadioError::Transmit);
        }
        self.sent.push(payload.to_vec());
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8; RADIO_PAYLOAD_LEN]) -> Option<usize> {
        let payload = self.inbox.pop_front()?;
        let len = payload.len().min(RADIO_PAYLOAD_LEN);
        buf[..len].copy_from_slice(&payload[..len]);
        Some(len)
    }
}
