//! SmartNode Firmware: Main Entry Point
//!
//! Boot glue and the event loop.  Everything with behavior lives in the
//! library; this file only claims peripherals and wires them together.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  DefaultConfig      LogEventSink      RadioSink<NullRadio>     │
//! │  (ConfigPort)       (EventSink)       (EventSink + commands)   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │   AppService: SensorEngine<&SharedBus> · Thermostat    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  esp_timer one-shot ──▶ BUS (BusEngine)   1 ms / 100 ms ticks  │
//! │  RelayBank<PinDriver>                     ──▶ event queue      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{
    AnyIOPin, AnyOutputPin, IOPin as _, InputOutput, Output, OutputPin as _, PinDriver,
};
use esp_idf_hal::peripherals::Peripherals;
use log::{info, warn};

use smartnode::adapters::defaults::DefaultConfig;
use smartnode::adapters::log_sink::LogEventSink;
use smartnode::adapters::radio::{NullRadio, RadioSink};
use smartnode::app::ports::ConfigPort;
use smartnode::app::service::AppService;
use smartnode::config::SystemConfig;
use smartnode::drivers::hw_timer::{self, EspBusTimer};
use smartnode::drivers::relays::{LatchingRelay, RelayBank};
use smartnode::events::{self, Event};
use smartnode::onewire::BusEngine;
use smartnode::onewire::shared::SharedBus;

type BusLine = PinDriver<'static, AnyIOPin, InputOutput>;
type CoilPin = PinDriver<'static, AnyOutputPin, Output>;

/// The bus engine, shared between the esp_timer ISR and the 1 ms task.
static BUS: SharedBus<BusLine, EspBusTimer> = SharedBus::new();

/// Control ticks between diagnostics log lines (1 min).
const DIAG_EVERY: u64 = 600;

unsafe extern "C" fn bus_timer_isr(_arg: *mut core::ffi::c_void) {
    BUS.on_timer_interrupt();
}

fn coil(pin: AnyOutputPin) -> Result<CoilPin> {
    Ok(PinDriver::output(pin)?)
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SmartNode v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = DefaultConfig::new().load().unwrap_or_else(|e| {
        warn!("Config load failed ({}), using built-in defaults", e);
        SystemConfig::default()
    });

    // ── 3. Peripherals ────────────────────────────────────────
    let p = Peripherals::take()?;

    let mut line = PinDriver::input_output_od(p.pins.gpio4.downgrade())?;
    line.set_high()?;
    let timer = EspBusTimer::new(bus_timer_isr)?;
    BUS.install(BusEngine::new(line, timer));
    info!("1-Wire bus on GPIO{}", smartnode::pins::ONEWIRE_GPIO);

    let relays = RelayBank::new(
        LatchingRelay::new(
            coil(p.pins.gpio16.downgrade_output())?,
            coil(p.pins.gpio17.downgrade_output())?,
        ),
        LatchingRelay::new(
            coil(p.pins.gpio18.downgrade_output())?,
            coil(p.pins.gpio19.downgrade_output())?,
        ),
        config.relay_pulse_ms,
    );

    // ── 4. App service ────────────────────────────────────────
    let mut sink = (LogEventSink::new(), RadioSink::new(NullRadio));
    let mut app = AppService::new(config, &BUS, relays)?;
    app.start(&mut sink);

    hw_timer::start_tick_timers()?;
    info!("System ready. Entering event loop.");

    // ── 5. Event loop ─────────────────────────────────────────
    let mut status_reported = false;
    loop {
        events::drain_events(|event| match event {
            Event::FastTick => app.tick_1ms(),
            Event::ControlTick => {
                app.tick_100ms(&mut sink);

                if let Some(received) = sink.1.poll_command() {
                    match received {
                        Ok(cmd) => {
                            info!("Command: {:?}", cmd);
                            if let Err(e) = app.handle_command(cmd, &mut sink) {
                                warn!("Command {:?} rejected: {}", cmd, e);
                            }
                        }
                        Err(e) => warn!("Radio payload dropped: {}", e),
                    }
                }

                if !status_reported && app.sensor().is_configured() {
                    status_reported = true;
                    info!("Boot status 0x{:02x}", app.boot_status().bits());
                }

                if app.control_ticks() % DIAG_EVERY == 0 {
                    info!(
                        "DIAG  | {} | timer_errors={}",
                        app.diagnostics(),
                        hw_timer::timer_errors()
                    );
                }
            }
        });

        FreeRtos::delay_ms(1);
    }
}
