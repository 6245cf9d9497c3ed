//! Timer-driven event queue.
//!
//! The two periodic timers do no work themselves; they only push a tick
//! event.  The main loop drains the queue and runs the matching task.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ 1 ms timer   │────▶│  Event Queue │────▶│  Main Loop   │
//! │ 100 ms timer │────▶│  (lock-free) │     │  (consumer)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! The bus timing interrupt is not routed through here; it runs the bus
//! engine directly.

use core::sync::atomic::{AtomicU32, Ordering};

use heapless::mpmc::Q32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// 1 ms: sensor protocol step and relay pulse timing.
    FastTick,
    /// 100 ms: thermostat step.
    ControlTick,
}

static QUEUE: Q32<Event> = Q32::new();
static DROPPED: AtomicU32 = AtomicU32::new(0);

/// Push an event.  Safe from timer callbacks.  Returns `false` and counts
/// the drop if the queue is full.
pub fn push_event(event: Event) -> bool {
    if QUEUE.enqueue(event).is_ok() {
        true
    } else {
        DROPPED.fetch_add(1, Ordering::Relaxed);
        false
    }
}

pub fn pop_event() -> Option<Event> {
    QUEUE.dequeue()
}

/// Drain all pending events into a callback, FIFO.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

/// Events lost to a full queue since boot.
pub fn dropped_events() -> u32 {
    DROPPED.load(Ordering::Relaxed)
}
