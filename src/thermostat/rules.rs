//! Hysteresis switching rule.
//!
//! ```text
//!   WINTER                                  SUMMER
//!   ON ◀── t ≤ set      set+hyst ≤ t ──▶ OFF   OFF ◀── t ≤ set−hyst      set ≤ t ──▶ ON
//!        ├────────────┼──────────────┤             ├────────────┼──────────────┤
//!               set   dead band  set+hyst                set−hyst  dead band  set
//! ```

use crate::config::ThermostatMode;
use crate::sensor::ds18b20::Centidegrees;

/// New value for `active`, or `None` when the reading calls for no change.
///
/// Never returns the current value, so every `Some` is a real transition.
pub fn decide(
    mode: ThermostatMode,
    setpoint: Centidegrees,
    hysteresis: Centidegrees,
    t: Centidegrees,
    active: bool,
) -> Option<bool> {
    let set = setpoint.as_i32();
    let hyst = hysteresis.as_i32();
    let t = t.as_i32();

    let (turn_on, turn_off) = match mode {
        ThermostatMode::Winter => (t <= set, t >= set + hyst),
        ThermostatMode::Summer => (t >= set, t <= set - hyst),
    };

    if !active && turn_on {
        Some(true)
    } else if active && turn_off {
        Some(false)
    } else {
        None
    }
}
