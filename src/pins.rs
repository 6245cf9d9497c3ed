//! GPIO / peripheral assignments for the SmartNode board.
//!
//! Single source of truth: the boot glue references this module rather than
//! hard-coding pin numbers.  The constants are checked against the pins
//! `main.rs` actually claims from `Peripherals`.

// ---------------------------------------------------------------------------
// 1-Wire bus (DS18B20)
// ---------------------------------------------------------------------------

/// Open-drain data line, external 4.7 kΩ pull-up to 3V3.
pub const ONEWIRE_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Latching relays (dual-coil, driven through ULN2003)
// ---------------------------------------------------------------------------

/// Relay 0 (heating) SET coil.
pub const RELAY0_SET_GPIO: i32 = 16;
/// Relay 0 (heating) RESET coil.
pub const RELAY0_RESET_GPIO: i32 = 17;
/// Relay 1 (cooling) SET coil.
pub const RELAY1_SET_GPIO: i32 = 18;
/// Relay 1 (cooling) RESET coil.
pub const RELAY1_RESET_GPIO: i32 = 19;

// ---------------------------------------------------------------------------
// Timers
// ---------------------------------------------------------------------------

// The bus timer must dispatch from the esp_timer ISR
// (CONFIG_ESP_TIMER_SUPPORTS_ISR_DISPATCH_METHOD=y, see sdkconfig.defaults).
// Task dispatch adds tens of µs per segment and turns every write-1 into a
// write-0.  The callback must stay out of flash-disabled windows: no NVS or
// OTA writes while the bus is in use.

/// Bus timer resolution.  esp_timer counts in microseconds.
pub const BUS_TIMER_TICKS_PER_US: u32 = 1;
/// Longest one-shot the bus engine programs in one go.
pub const BUS_TIMER_MAX_TICKS: u16 = 255;
/// Worst-case delay from a bus timer deadline to its ISR callback.
pub const BUS_TIMER_LATENCY_US: u32 = 3;
/// The DS18B20 samples a master write this long after the falling edge.
pub const DEVICE_WRITE_SAMPLE_US: u32 = 15;
