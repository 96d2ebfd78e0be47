//! Fast position polling for servo controllers spread over several buses.
//!
//! A [`Poller`] queries every configured servo back to back with no pause in
//! between, keeps the last answer from each, and hands a [`StatusReport`] to
//! a sink every status period.

pub mod cli;
pub mod clock;
pub mod config;
pub mod controller;
pub mod poller;
pub mod registry;
pub mod reporter;
pub mod sim;
pub mod transport;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::PollerConfig;
pub use controller::{scan, scan_buses, Controller, QueryOutcome};
pub use poller::{LoopCounters, Poller};
pub use registry::{bus_range, default_devices, DeviceAddress};
pub use reporter::{StatusCodec, StatusReport, StatusReporter};
pub use sim::{SimFactory, SimTransport};
pub use transport::{
    ControllerOptions, Error, Mode, QueryFormat, Resolution, SharedTransport, Telemetry,
    Transport, TransportFactory, TransportRegistry,
};
