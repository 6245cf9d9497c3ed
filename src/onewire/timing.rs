//! 1-Wire slot timing and long-delay decomposition.
//!
//! ```text
//!   reset/presence   ▔▔╲______480______╱▔▔70▔▔┆sample┆▔▔▔▔410▔▔▔▔▔▔
//!   write 1          ▔▔╲_6_╱▔▔▔▔▔▔▔▔▔64▔▔▔▔▔▔▔▔▔▔
//!   write 0          ▔▔╲_______60_______╱▔10▔
//!   read             ▔▔╲_6_╱▔9▔┆sample┆▔▔▔▔55▔▔▔▔
//! ```
//!
//! All values are microseconds at standard speed.  The engine works in
//! timer ticks, so every phase is scaled by the timer's ticks-per-µs and
//! then split into compare periods no longer than the timer can count.

/// Per-phase delays in timer ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTiming {
    pub reset_low: u32,
    pub presence_sample: u32,
    pub presence_recovery: u32,
    pub write1_low: u32,
    pub write1_recovery: u32,
    pub write0_low: u32,
    pub write0_recovery: u32,
    pub read_low: u32,
    pub read_sample: u32,
    pub read_recovery: u32,
}

impl BusTiming {
    /// Standard-speed timing for a timer running at `ticks_per_us`.
    pub const fn standard(ticks_per_us: u32) -> Self {
        let k = if ticks_per_us == 0 { 1 } else { ticks_per_us };
        Self {
            reset_low: 480 * k,
            presence_sample: 70 * k,
            presence_recovery: 410 * k,
            write1_low: 6 * k,
            write1_recovery: 64 * k,
            write0_low: 60 * k,
            write0_recovery: 10 * k,
            read_low: 6 * k,
            read_sample: 9 * k,
            read_recovery: 55 * k,
        }
    }

    /// Length of a full write-1 time slot.
    pub const fn write1_slot(&self) -> u32 {
        self.write1_low + self.write1_recovery
    }

    /// Length of a full write-0 time slot.
    pub const fn write0_slot(&self) -> u32 {
        self.write0_low + self.write0_recovery
    }

    /// Length of a full read time slot.
    pub const fn read_slot(&self) -> u32 {
        self.read_low + self.read_sample + self.read_recovery
    }
}

// ---------------------------------------------------------------------------
// Long-delay decomposition
// ---------------------------------------------------------------------------

/// Take the next compare period out of `remaining`.
///
/// Returns `min(remaining, max)` and subtracts it.  Returns 0 only when
/// nothing is left.  A `max` of 0 is treated as 1.
pub fn next_chunk(remaining: &mut u32, max: u16) -> u16 {
    let max = u32::from(max.max(1));
    let chunk = (*remaining).min(max);
    *remaining -= chunk;
    chunk as u16
}

/// Iterator over the compare periods that make up one delay.
///
/// The periods are all in `1..=max` and add up to the requested delay.
#[derive(Debug, Clone)]
pub struct DelaySplitter {
    remaining: u32,
    max: u16,
}

impl DelaySplitter {
    pub fn new(total: u32, max: u16) -> Self {
        Self {
            remaining: total,
            max,
        }
    }

    /// Ticks not yet handed out.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl Iterator for DelaySplitter {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        match next_chunk(&mut self.remaining, self.max) {
            0 => None,
            chunk => Some(chunk),
        }
    }
}
