//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against a simulated DS18B20 on a virtual-time 1-Wire line and mock
//! relay coils.  All tests run on the host (x86_64) with no real hardware
//! required.

mod bus_tests;
mod mock_hw;
mod radio_tests;
mod thermostat_flow_tests;
