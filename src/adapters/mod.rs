//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements   | Connects to                      |
//! |-------------|--------------|----------------------------------|
//! | `defaults`  | ConfigPort   | Compile-time defaults            |
//! | `log_sink`  | EventSink    | Serial log output                |
//! | `radio`     | EventSink    | Packet radio (postcard frames)   |
//! |             | RadioPort    | `NullRadio` when none is fitted  |
//!
//! The sensor engine and the relay bank implement `TemperatureSource` and
//! `RelayPort` themselves.

pub mod defaults;
pub mod log_sink;
pub mod radio;
