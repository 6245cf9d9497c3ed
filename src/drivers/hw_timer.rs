//! Hardware timers using ESP-IDF's esp_timer API.
//!
//! Two kinds of timer live here:
//!
//! - [`EspBusTimer`]: a one-shot timer implementing
//!   [`CompareTimer`](crate::onewire::CompareTimer).  The bus engine
//!   re-arms it from its own callback for every timing segment.
//! - Periodic tick timers (1 ms, 100 ms) that only push events into the
//!   lock-free queue; the main loop does the work.
//!
//! The bus timer dispatches from the esp_timer ISR: a write-1 or read slot
//! releases the line 6 µs after pulling it low, which the timer task's
//! scheduling latency cannot meet.  Its callback must not log or block.
//! The tick timers stay on the timer task and only push events.
//! On host targets the tick timers are not started; tests drive the
//! service directly.

use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::{error, info};

#[cfg(target_os = "espidf")]
use crate::events::{Event, push_event};
#[cfg(target_os = "espidf")]
use crate::onewire::CompareTimer;
#[cfg(target_os = "espidf")]
use crate::pins;

/// esp_timer calls that returned an error since boot.
static TIMER_ERRORS: AtomicU32 = AtomicU32::new(0);

pub fn timer_errors() -> u32 {
    TIMER_ERRORS.load(Ordering::Relaxed)
}

#[cfg(target_os = "espidf")]
fn check(rc: esp_err_t, what: &str) -> bool {
    if rc == ESP_OK {
        true
    } else {
        TIMER_ERRORS.fetch_add(1, Ordering::Relaxed);
        error!("hw_timer: {} failed (rc={})", what, rc);
        false
    }
}

// ---------------------------------------------------------------------------
// Bus timer
// ---------------------------------------------------------------------------

/// One-shot esp_timer driving the 1-Wire bus engine.
#[cfg(target_os = "espidf")]
pub struct EspBusTimer {
    handle: esp_timer_handle_t,
}

// SAFETY: the handle is an opaque token; esp_timer_* calls on it are
// internally locked and may come from any task.
#[cfg(target_os = "espidf")]
unsafe impl Send for EspBusTimer {}

#[cfg(target_os = "espidf")]
impl EspBusTimer {
    /// Create the timer with ISR dispatch.  `callback` runs in interrupt
    /// context and must end up in
    /// [`SharedBus::on_timer_interrupt`](crate::onewire::shared::SharedBus::on_timer_interrupt).
    pub fn new(callback: unsafe extern "C" fn(*mut core::ffi::c_void)) -> Result<Self, crate::error::Error> {
        let mut handle: esp_timer_handle_t = core::ptr::null_mut();
        let args = esp_timer_create_args_t {
            callback: Some(callback),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_ISR,
            name: c"onewire".as_ptr(),
            skip_unhandled_events: false,
        };
        // SAFETY: `args` outlives the call; esp_timer copies what it needs.
        let rc = unsafe { esp_timer_create(&args, &mut handle) };
        if !check(rc, "bus timer create") {
            return Err(crate::error::Error::Init("bus timer"));
        }
        Ok(Self { handle })
    }
}

#[cfg(target_os = "espidf")]
impl CompareTimer for EspBusTimer {
    const MAX_TICKS: u16 = pins::BUS_TIMER_MAX_TICKS;
    const TICKS_PER_US: u32 = pins::BUS_TIMER_TICKS_PER_US;

    fn start(&mut self, ticks: u16) {
        let us = u64::from(ticks) / u64::from(Self::TICKS_PER_US);
        // SAFETY: handle was created in `new` and is never deleted.
        // Called from the ISR as well: count failures, never log.
        unsafe {
            // Stopping an idle timer reports INVALID_STATE; that is fine.
            esp_timer_stop(self.handle);
            if esp_timer_start_once(self.handle, us.max(1)) != ESP_OK {
                TIMER_ERRORS.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn stop(&mut self) {
        // SAFETY: as above.
        unsafe {
            esp_timer_stop(self.handle);
        }
    }
}

// ---------------------------------------------------------------------------
// Periodic tick timers
// ---------------------------------------------------------------------------

#[cfg(target_os = "espidf")]
unsafe extern "C" fn fast_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::FastTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn control_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::ControlTick);
}

#[cfg(target_os = "espidf")]
fn start_periodic(
    name: &'static core::ffi::CStr,
    callback: unsafe extern "C" fn(*mut core::ffi::c_void),
    period_us: u64,
) -> bool {
    let mut handle: esp_timer_handle_t = core::ptr::null_mut();
    let args = esp_timer_create_args_t {
        callback: Some(callback),
        arg: core::ptr::null_mut(),
        dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
        name: name.as_ptr(),
        skip_unhandled_events: true,
    };
    // SAFETY: `args` outlives the call.  The handle is intentionally
    // leaked: the tick timers run for the lifetime of the firmware.
    unsafe {
        check(esp_timer_create(&args, &mut handle), "tick timer create")
            && check(esp_timer_start_periodic(handle, period_us), "tick timer start")
    }
}

/// Start the 1 ms and 100 ms tick timers.
#[cfg(target_os = "espidf")]
pub fn start_tick_timers() -> Result<(), crate::error::Error> {
    if !start_periodic(c"fast", fast_tick_cb, 1_000) {
        return Err(crate::error::Error::Init("1 ms timer"));
    }
    if !start_periodic(c"control", control_tick_cb, 100_000) {
        return Err(crate::error::Error::Init("100 ms timer"));
    }
    info!("hw_timer: fast@1kHz + control@10Hz started");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_tick_timers() -> Result<(), crate::error::Error> {
    log::info!("hw_timer(sim): timers not started (ticks driven by the caller)");
    Ok(())
}
