//! Radio telemetry and command path around a live service.

use smartnode::adapters::radio::{FrameKind, RadioSink, TelemetryFrame, encode_command};
use smartnode::app::commands::AppCommand;
use smartnode::app::ports::RADIO_PAYLOAD_LEN;
use smartnode::app::service::AppService;
use smartnode::config::{SystemConfig, ThermostatMode};
use smartnode::drivers::relays::{LatchingRelay, RelayBank};
use smartnode::error::{ConfigError, Error, RadioError};
use smartnode::sensor::ds18b20::Centidegrees;

use crate::mock_hw::{CoilLog, CoilPin, MockRadio, RecordingSink};
use crate::sim_ds18b20::{Ds18b20Sim, Shared, SimBus, advance_us, installed_bus, world};

type Sink = (RecordingSink, RadioSink<MockRadio>);

struct Node {
    world: Shared,
    bus: &'static SimBus,
    app: AppService<&'static SimBus, RelayBank<CoilPin>>,
    sink: Sink,
    ms: u64,
}

impl Node {
    fn new(device: Ds18b20Sim) -> Self {
        let world = world(device);
        let bus = installed_bus(&world);
        let coils = CoilLog::default();
        let config = SystemConfig::default();
        let relays = RelayBank::new(
            LatchingRelay::new(coils.pin(0), coils.pin(1)),
            LatchingRelay::new(coils.pin(2), coils.pin(3)),
            config.relay_pulse_ms,
        );
        let mut app = AppService::new(config, bus, relays).unwrap();
        let mut sink = (RecordingSink::default(), RadioSink::new(MockRadio::default()));
        app.start(&mut sink);
        Self {
            world,
            bus,
            app,
            sink,
            ms: 0,
        }
    }

    /// The firmware's main loop: fast ticks, control ticks, then one
    /// command per control tick.
    fn run_ms(&mut self, ms: u64) -> Vec<Result<(), Error>> {
        let mut results = Vec::new();
        for _ in 0..ms {
            advance_us(&self.world, self.bus, 1000);
            self.app.tick_1ms();
            self.ms += 1;
            if self.ms % 100 == 0 {
                self.app.tick_100ms(&mut self.sink);
                if let Some(received) = self.sink.1.poll_command() {
                    let result = received
                        .map_err(Error::from)
                        .and_then(|cmd| self.app.handle_command(cmd, &mut self.sink));
                    results.push(result);
                }
            }
        }
        results
    }

    fn send(&mut self, cmd: AppCommand) {
        let mut buf = [0u8; RADIO_PAYLOAD_LEN];
        let payload = encode_command(&cmd, &mut buf).unwrap().to_vec();
        self.sink.1.radio_mut().inbox.push_back(payload);
    }

    fn frames(&self) -> Vec<TelemetryFrame> {
        self.sink
            .1
            .radio()
            .sent
            .iter()
            .map(|p| TelemetryFrame::decode(p).unwrap())
            .collect()
    }
}

#[test]
fn boot_frame_is_first() {
    let node = Node::new(Ds18b20Sim::at_centi(2100));
    let frames = node.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].seq, 0);
    assert_eq!(frames[0].kind, FrameKind::Boot);
    assert_eq!(frames[0].mode, ThermostatMode::Winter);
    assert_eq!(frames[0].temperature, None);
}

#[test]
fn reading_and_output_frames_follow_regulation() {
    let mut node = Node::new(Ds18b20Sim::at_centi(2000));
    node.run_ms(7000);

    let frames = node.frames();
    let kinds: Vec<FrameKind> = frames.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![FrameKind::Boot, FrameKind::Reading, FrameKind::Output]);
    assert_eq!(frames[1].temperature, Some(Centidegrees(2000)));
    assert!(!frames[1].active);
    assert!(frames[2].active);
    assert!(frames.windows(2).all(|w| w[1].seq == w[0].seq + 1));
    assert_eq!(node.sink.1.sent(), 3);
}

#[test]
fn setpoint_command_is_applied() {
    let mut node = Node::new(Ds18b20Sim::at_centi(2100));
    node.send(AppCommand::SetSetpoint(Centidegrees(1900)));
    let results = node.run_ms(100);

    assert_eq!(results, vec![Ok(())]);
    assert_eq!(node.app.config().thermostat.setpoint, Centidegrees(1900));
}

#[test]
fn invalid_command_is_rejected_without_side_effects() {
    let mut node = Node::new(Ds18b20Sim::at_centi(2100));
    node.send(AppCommand::SetHysteresis(Centidegrees(0)));
    let results = node.run_ms(100);

    assert_eq!(
        results,
        vec![Err(Error::Config(ConfigError::InvalidHysteresis))]
    );
    assert_eq!(node.app.config(), &SystemConfig::default());
}

#[test]
fn garbage_payload_is_a_decode_error() {
    let mut node = Node::new(Ds18b20Sim::at_centi(2100));
    node.sink.1.radio_mut().inbox.push_back(vec![0x7F, 0x00]);
    let results = node.run_ms(100);
    assert_eq!(results, vec![Err(Error::Radio(RadioError::Decode))]);
}

#[test]
fn off_over_radio_switches_output_off() {
    let mut node = Node::new(Ds18b20Sim::at_centi(2000));
    node.run_ms(7000);
    node.send(AppCommand::Off);
    node.run_ms(200);

    let last = *node.frames().last().unwrap();
    assert_eq!(last.kind, FrameKind::Output);
    assert!(!last.active);
    assert!(!node.app.thermostat().is_enabled());
}

#[test]
fn transmit_failures_are_counted_not_fatal() {
    let mut node = Node::new(Ds18b20Sim::at_centi(2000));
    node.sink.1.radio_mut().fail_tx = true;
    node.run_ms(7000);

    assert_eq!(node.sink.1.sent(), 1);
    assert_eq!(node.sink.1.failures(), 2);
    assert_eq!(node.sink.0.outputs().len(), 1, "regulation unaffected");
}
