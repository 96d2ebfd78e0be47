use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;

use crate::registry::DeviceAddress;
use crate::transport::{
    ControllerOptions, Error, Mode, Resolution, Result, Telemetry, Transport, TransportFactory,
};

pub const SIM_TRANSPORT: &str = "sim";

/// Stand-in bus that answers for a fixed set of servos.
///
/// Each servo swings along a sine of elapsed time, offset by its position in
/// the device list. Anything else never answers.
pub struct SimTransport {
    phases: HashMap<DeviceAddress, f64>,
    start: Instant,
    queries: u64,
    dropout: Option<u64>,
}

impl SimTransport {
    pub fn new(devices: &[DeviceAddress]) -> SimTransport {
        SimTransport {
            phases: devices
                .iter()
                .enumerate()
                .map(|(index, address)| (*address, index as f64 * 0.1))
                .collect(),
            start: Instant::now(),
            queries: 0,
            dropout: None,
        }
    }

    /// Make every `every`-th query time out
    pub fn with_dropout(mut self, every: u64) -> SimTransport {
        self.dropout = if every == 0 { None } else { Some(every) };
        self
    }

    fn position(&self, phase: f64, resolution: Resolution) -> f64 {
        let position = 0.5 * (self.start.elapsed().as_secs_f64() + phase).sin();
        quantize(position, resolution)
    }
}

fn quantize(position: f64, resolution: Resolution) -> f64 {
    let step = match resolution {
        Resolution::Ignore => return 0.0,
        Resolution::Int8 => 0.01,
        Resolution::Int16 => 0.0001,
        Resolution::Int32 => 0.00001,
        Resolution::Float => return position,
    };
    (position / step).round() * step
}

#[async_trait]
impl Transport for SimTransport {
    async fn query(&mut self, options: &ControllerOptions) -> Result<Telemetry> {
        self.queries += 1;
        if let Some(every) = self.dropout {
            if self.queries % every == 0 {
                return Err(Error::Timeout);
            }
        }
        let phase = *self.phases.get(&options.address).ok_or(Error::Timeout)?;
        Ok(Telemetry::new(
            Mode::POSITION,
            self.position(phase, options.query_format.position),
        ))
    }
}

pub struct SimFactory {
    devices: Vec<DeviceAddress>,
}

impl SimFactory {
    pub fn new(devices: Vec<DeviceAddress>) -> SimFactory {
        SimFactory { devices }
    }
}

impl TransportFactory for SimFactory {
    fn name(&self) -> &str {
        SIM_TRANSPORT
    }

    fn make(&self) -> Result<Box<dyn Transport>> {
        Ok(Box::new(SimTransport::new(&self.devices)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::QueryFormat;

    fn options(id: u8, bus: u8) -> ControllerOptions {
        ControllerOptions::new(DeviceAddress::new(id, bus), QueryFormat::position_only())
    }

    #[tokio::test]
    async fn known_servo_answers_in_position_mode() {
        let mut sim = SimTransport::new(&[DeviceAddress::new(11, 1)]);
        let telemetry = sim.query(&options(11, 1)).await.unwrap();
        assert_eq!(telemetry.mode, Mode::POSITION);
        assert!(telemetry.position.abs() <= 0.5);
    }

    #[tokio::test]
    async fn unknown_servo_times_out() {
        let mut sim = SimTransport::new(&[DeviceAddress::new(11, 1)]);
        assert!(matches!(sim.query(&options(11, 2)).await, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn dropout_drops_every_nth_query() {
        let mut sim = SimTransport::new(&[DeviceAddress::new(11, 1)]).with_dropout(3);
        let mut failures = 0;
        for _ in 0..9 {
            if sim.query(&options(11, 1)).await.is_err() {
                failures += 1;
            }
        }
        assert_eq!(failures, 3);
    }

    #[test]
    fn quantize_follows_resolution() {
        assert_eq!(quantize(0.123456, Resolution::Ignore), 0.0);
        assert_eq!(quantize(0.123456, Resolution::Float), 0.123456);
        assert!((quantize(0.123456, Resolution::Int8) - 0.12).abs() < 1e-12);
        assert!((quantize(0.123456, Resolution::Int16) - 0.1235).abs() < 1e-12);
    }

    #[test]
    fn factory_is_named_sim() {
        let factory = SimFactory::new(vec![]);
        assert_eq!(factory.name(), "sim");
        assert!(factory.make().is_ok());
    }

    #[tokio::test]
    async fn factory_transport_answers_every_query() {
        let mut sim = SimFactory::new(vec![DeviceAddress::new(11, 1)]).make().unwrap();
        for _ in 0..20 {
            assert!(sim.query(&options(11, 1)).await.is_ok());
        }
    }
}
