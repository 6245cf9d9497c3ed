//! End-to-end regulation: simulated sensor → bus engine → protocol engine
//! → thermostat → relay bank → mock coils.

use smartnode::app::commands::AppCommand;
use smartnode::app::events::AppEvent;
use smartnode::config::{SystemConfig, ThermostatMode};
use smartnode::drivers::relays::{Coil, RelayId};
use smartnode::error::SensorFault;
use smartnode::sensor::ds18b20::Centidegrees;
use smartnode::thermostat::ThermostatState;

use crate::sim_ds18b20::{Ds18b20Sim, Rig, raw_from_centi};

fn summer() -> SystemConfig {
    let mut c = SystemConfig::default();
    c.thermostat.mode = ThermostatMode::Summer;
    c
}

fn first_output(rig: &mut Rig) -> bool {
    rig.run_until(8000, |r| !r.events.outputs().is_empty())
}

#[test]
fn boot_resets_both_relays_and_configures_sensor() {
    let mut rig = Rig::new(SystemConfig::default(), Ds18b20Sim::at_centi(2100));
    assert!(matches!(
        rig.events.events[0],
        AppEvent::Started { mode: ThermostatMode::Winter, status: 0x81 }
    ));

    rig.run_ms(200);
    assert_eq!(
        rig.coils.pulses(),
        vec![(RelayId::Heating, Coil::Reset), (RelayId::Cooling, Coil::Reset)]
    );
    assert_eq!(rig.coils.high_ms(1), 4);
    assert_eq!(rig.coils.high_ms(3), 4);
    assert!(!rig.coils.any_energised());

    assert!(rig.app.sensor().is_configured());
    assert_eq!(rig.app.boot_status().bits(), 0x83);
    assert_eq!(rig.device().config, 0x7F);
}

#[test]
fn winter_heats_below_setpoint_then_stops_above_band() {
    let mut rig = Rig::new(SystemConfig::default(), Ds18b20Sim::at_centi(2000));
    assert!(first_output(&mut rig));

    // Five seconds of counting plus one conversion.
    assert!(rig.elapsed_ms() >= 5750, "first output at {} ms", rig.elapsed_ms());
    assert_eq!(rig.events.readings(), vec![2000]);
    assert_eq!(rig.events.outputs(), vec![(RelayId::Heating, true)]);
    rig.run_ms(10);
    assert_eq!(rig.coils.pulses_after_boot(), vec![(RelayId::Heating, Coil::Set)]);
    assert_eq!(rig.coils.high_ms(0), 4);
    assert!(rig.coils.latched(RelayId::Heating));

    rig.device().raw_temperature = raw_from_centi(2250);
    rig.run_ms(7000);
    assert_eq!(
        rig.events.outputs(),
        vec![(RelayId::Heating, true), (RelayId::Heating, false)]
    );
    assert_eq!(
        rig.coils.pulses_after_boot(),
        vec![(RelayId::Heating, Coil::Set), (RelayId::Heating, Coil::Reset)]
    );
    assert!(!rig.coils.latched(RelayId::Heating));
    assert_eq!(rig.app.temperature(), Some(Centidegrees(2250)));
}

#[test]
fn dead_band_never_pulses() {
    let mut rig = Rig::new(SystemConfig::default(), Ds18b20Sim::at_centi(2100));
    rig.run_ms(20_000);

    assert!(rig.events.readings().len() >= 3);
    assert!(rig.events.readings().iter().all(|&t| t == 2100));
    assert!(rig.events.outputs().is_empty());
    assert!(rig.coils.pulses_after_boot().is_empty());
}

#[test]
fn steady_cold_pulses_once() {
    let mut rig = Rig::new(SystemConfig::default(), Ds18b20Sim::at_centi(1500));
    rig.run_ms(30_000);

    assert!(rig.events.readings().len() >= 4);
    assert_eq!(rig.coils.pulses_after_boot(), vec![(RelayId::Heating, Coil::Set)]);
}

#[test]
fn summer_cools_above_setpoint_then_stops_below_band() {
    let mut rig = Rig::new(summer(), Ds18b20Sim::at_centi(2200));
    assert!(first_output(&mut rig));
    assert_eq!(rig.events.outputs(), vec![(RelayId::Cooling, true)]);

    rig.device().raw_temperature = raw_from_centi(1800);
    rig.run_ms(7000);
    assert_eq!(
        rig.events.outputs(),
        vec![(RelayId::Cooling, true), (RelayId::Cooling, false)]
    );
    assert_eq!(
        rig.coils.pulses_after_boot(),
        vec![(RelayId::Cooling, Coil::Set), (RelayId::Cooling, Coil::Reset)]
    );
    assert_eq!(rig.coils.high_ms(0), 0, "heating SET never touched");
}

#[test]
fn missing_sensor_keeps_output_and_reports_faults() {
    let mut rig = Rig::new(SystemConfig::default(), Ds18b20Sim::at_centi(2000));
    assert!(first_output(&mut rig));

    rig.device().present = false;
    rig.run_ms(12_000);

    let faults = rig
        .events
        .count(|e| *e == AppEvent::SensorFault(SensorFault::NoDevicePresent));
    assert!(faults >= 1);
    assert_eq!(rig.events.outputs(), vec![(RelayId::Heating, true)]);
    assert!(rig.coils.latched(RelayId::Heating));
    assert!(rig.app.diagnostics().sensor_faults >= 1);
    assert_eq!(
        rig.app.diagnostics().last_fault,
        Some(SensorFault::NoDevicePresent)
    );

    rig.device().present = true;
    rig.device().raw_temperature = raw_from_centi(2300);
    rig.run_ms(12_000);
    assert_eq!(
        rig.events.outputs(),
        vec![(RelayId::Heating, true), (RelayId::Heating, false)]
    );
}

#[test]
fn stuck_conversion_surfaces_as_fault() {
    let mut rig = Rig::new(SystemConfig::default(), Ds18b20Sim::at_centi(2000));
    rig.device().stuck = true;
    rig.run_ms(8000);

    assert!(rig.events.readings().is_empty());
    assert!(
        rig.events
            .count(|e| *e == AppEvent::SensorFault(SensorFault::ConversionTimeout))
            >= 1
    );
    assert!(rig.coils.pulses_after_boot().is_empty());
}

#[test]
fn corrupt_scratchpad_is_never_acted_on() {
    let mut rig = Rig::new(SystemConfig::default(), Ds18b20Sim::at_centi(1000));
    rig.device().corrupt_crc = true;
    rig.run_ms(8000);

    assert!(rig.events.readings().is_empty());
    assert!(
        rig.events
            .count(|e| *e == AppEvent::SensorFault(SensorFault::CrcMismatch))
            >= 1
    );
    assert!(rig.coils.pulses_after_boot().is_empty());
}

#[test]
fn off_switches_output_off_and_stops_sampling() {
    let mut rig = Rig::new(SystemConfig::default(), Ds18b20Sim::at_centi(2000));
    assert!(first_output(&mut rig));

    rig.app.handle_command(AppCommand::Off, &mut rig.events).unwrap();
    rig.run_ms(200);
    assert_eq!(
        rig.events.outputs(),
        vec![(RelayId::Heating, true), (RelayId::Heating, false)]
    );
    assert!(
        rig.events
            .events
            .contains(&AppEvent::RegulationChanged { enabled: false })
    );

    let conversions = rig.device().conversions;
    rig.run_ms(15_000);
    assert_eq!(rig.device().conversions, conversions, "no sampling while off");
    assert_eq!(rig.coils.pulses_after_boot().len(), 2);

    rig.app.handle_command(AppCommand::On, &mut rig.events).unwrap();
    rig.run_ms(7000);
    assert!(rig.device().conversions > conversions);
    assert_eq!(
        rig.events.outputs(),
        vec![
            (RelayId::Heating, true),
            (RelayId::Heating, false),
            (RelayId::Heating, true)
        ]
    );
}

#[test]
fn mode_change_releases_the_old_relay() {
    let mut rig = Rig::new(SystemConfig::default(), Ds18b20Sim::at_centi(2000));
    assert!(first_output(&mut rig));

    rig.app
        .handle_command(AppCommand::SetMode(ThermostatMode::Summer), &mut rig.events)
        .unwrap();
    rig.run_ms(20);
    assert_eq!(
        rig.coils.pulses_after_boot(),
        vec![(RelayId::Heating, Coil::Set), (RelayId::Heating, Coil::Reset)]
    );
    assert_eq!(rig.app.config().thermostat.mode, ThermostatMode::Summer);

    // 20.00 °C sits in the summer dead band: nothing more happens.
    rig.run_ms(12_000);
    assert_eq!(rig.coils.pulses_after_boot().len(), 2);
    assert!(!rig.coils.latched(RelayId::Cooling));
}

#[test]
fn setpoint_change_applies_on_next_reading() {
    let mut rig = Rig::new(SystemConfig::default(), Ds18b20Sim::at_centi(2100));
    rig.run_ms(7000);
    assert!(rig.events.outputs().is_empty());

    rig.app
        .handle_command(AppCommand::SetSetpoint(Centidegrees(2200)), &mut rig.events)
        .unwrap();
    assert!(rig.events.events.iter().any(|e| matches!(
        e,
        AppEvent::ConfigApplied(c) if c.setpoint == Centidegrees(2200)
    )));
    rig.run_ms(6000);
    assert_eq!(rig.events.outputs(), vec![(RelayId::Heating, true)]);
}

#[test]
fn reinitialize_rewrites_sensor_configuration() {
    let mut rig = Rig::new(SystemConfig::default(), Ds18b20Sim::at_centi(2100));
    rig.run_ms(200);
    rig.device().config = 0x1F;

    rig.app
        .handle_command(AppCommand::ReinitializeSensor, &mut rig.events)
        .unwrap();
    rig.run_ms(200);
    assert_eq!(rig.device().config, 0x7F);
    assert!(rig.app.sensor().is_configured());
}

#[test]
fn reading_taken_before_off_is_not_reused_after_on() {
    let mut rig = Rig::new(SystemConfig::default(), Ds18b20Sim::at_centi(2100));
    assert!(rig.run_until(6000, |r| {
        r.app.thermostat().state() == ThermostatState::WaitForTemperature
    }));
    rig.app.handle_command(AppCommand::Off, &mut rig.events).unwrap();
    rig.run_ms(60_000);
    assert!(rig.events.readings().is_empty());
    let conversions = rig.device().conversions;

    rig.device().raw_temperature = raw_from_centi(1500);
    rig.app.handle_command(AppCommand::On, &mut rig.events).unwrap();
    rig.run_ms(7000);

    assert_eq!(rig.events.readings(), vec![1500]);
    assert_eq!(rig.device().conversions, conversions + 1);
    assert_eq!(rig.events.outputs(), vec![(RelayId::Heating, true)]);
}
