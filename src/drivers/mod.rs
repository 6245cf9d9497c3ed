//! Actuator drivers and timer plumbing.

pub mod hw_timer;
pub mod relays;
