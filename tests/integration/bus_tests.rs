//! Bus engine slot timing against the simulated device.

use smartnode::error::BusError;
use smartnode::onewire::transfer::{ByteReader, ByteWriter, Transfer};
use smartnode::onewire::{BitBus, Presence};
use smartnode::sensor::ds18b20::{function, rom};

use crate::sim_ds18b20::{Ds18b20Sim, Shared, SimBus, advance_us, installed_bus, world};

fn rig(device: Ds18b20Sim) -> (Shared, &'static SimBus) {
    let w = world(device);
    let bus = installed_bus(&w);
    (w, bus)
}

/// Step a transfer to completion, letting 100 µs pass between steps.
fn finish<T>(
    w: &Shared,
    bus: &'static SimBus,
    mut step: impl FnMut(&mut &'static SimBus) -> Result<Transfer<T>, BusError>,
) -> T {
    let mut b = bus;
    for _ in 0..64 {
        if let Transfer::Complete(v) = step(&mut b).expect("slot refused") {
            return v;
        }
        advance_us(w, bus, 100);
    }
    panic!("transfer never completed");
}

fn reset(w: &Shared, bus: &'static SimBus) -> Presence {
    let mut b = bus;
    b.start_detect_presence().expect("bus idle");
    advance_us(w, bus, 1000);
    assert!(b.is_idle());
    b.presence()
}

fn write_byte(w: &Shared, bus: &'static SimBus, byte: u8) {
    let mut writer = ByteWriter::new(byte);
    finish(w, bus, |b| writer.step(b));
}

fn read_byte(w: &Shared, bus: &'static SimBus) -> u8 {
    let mut reader = ByteReader::new();
    finish(w, bus, |b| reader.step(b))
}

#[test]
fn reset_sees_presence_pulse_in_five_interrupts() {
    let (w, bus) = rig(Ds18b20Sim::default());
    assert_eq!(reset(&w, bus), Presence::Present);

    let world = w.borrow();
    // 480 µs low and 410 µs recovery each take two compare periods.
    assert_eq!(world.interrupts, 5);
    assert_eq!(world.device.resets, 1);
    assert!(!world.master_low, "line released after the cycle");
    assert_eq!(world.deadline, None, "timer stopped when idle");
}

#[test]
fn missing_device_reads_absent() {
    let (w, bus) = rig(Ds18b20Sim {
        present: false,
        ..Ds18b20Sim::default()
    });
    assert_eq!(reset(&w, bus), Presence::Absent);
}

#[test]
fn presence_is_consumed_once() {
    let (w, bus) = rig(Ds18b20Sim::default());
    assert_eq!(reset(&w, bus), Presence::Present);
    let mut b = bus;
    assert_eq!(b.presence(), Presence::NotReady);
}

#[test]
fn start_during_slot_is_refused() {
    let (w, bus) = rig(Ds18b20Sim::default());
    let mut b = bus;
    b.start_detect_presence().unwrap();
    assert_eq!(b.start_read_bit(), Err(BusError::Busy));
    assert_eq!(b.start_write_bit(false), Err(BusError::Busy));
    advance_us(&w, bus, 1000);
    assert!(b.is_idle());
}

#[test]
fn write_slots_deliver_commands() {
    let (w, bus) = rig(Ds18b20Sim::default());
    assert_eq!(reset(&w, bus), Presence::Present);
    write_byte(&w, bus, rom::SKIP_ROM);
    write_byte(&w, bus, function::WRITE_SCRATCHPAD);
    for byte in [0x19, 0xF6, 0x3F] {
        write_byte(&w, bus, byte);
    }

    let world = w.borrow();
    assert_eq!(world.device.commands, vec![function::WRITE_SCRATCHPAD]);
    assert_eq!(world.device.th, 0x19);
    assert_eq!(world.device.tl, 0xF6);
    assert_eq!(world.device.config, 0x3F);
}

#[test]
fn read_slots_return_scratchpad() {
    let (w, bus) = rig(Ds18b20Sim {
        raw_temperature: 0x0191,
        ..Ds18b20Sim::default()
    });
    let expected = w.borrow().device.scratchpad();

    assert_eq!(reset(&w, bus), Presence::Present);
    write_byte(&w, bus, rom::SKIP_ROM);
    write_byte(&w, bus, function::READ_SCRATCHPAD);
    let got: Vec<u8> = (0..9).map(|_| read_byte(&w, bus)).collect();

    assert_eq!(got, expected);
    assert_eq!(&got[..2], &[0x91, 0x01]);
}

#[test]
fn conversion_reads_zero_until_done() {
    let (w, bus) = rig(Ds18b20Sim {
        conversion_ms: 2,
        ..Ds18b20Sim::default()
    });
    assert_eq!(reset(&w, bus), Presence::Present);
    write_byte(&w, bus, rom::SKIP_ROM);
    write_byte(&w, bus, function::CONVERT_T);

    let mut b = bus;
    b.start_read_bit().unwrap();
    advance_us(&w, bus, 100);
    assert_eq!(b.take_bit(), Some(false));

    advance_us(&w, bus, 3000);
    b.start_read_bit().unwrap();
    advance_us(&w, bus, 100);
    assert_eq!(b.take_bit(), Some(true));
    assert_eq!(w.borrow().device.conversions, 1);
}

#[test]
fn late_interrupt_on_idle_engine_is_ignored() {
    let (w, bus) = rig(Ds18b20Sim::default());
    bus.on_timer_interrupt();
    let mut b = bus;
    assert!(b.is_idle());
    assert!(!w.borrow().master_low);
    assert_eq!(bus.line_faults(), 0);
}
