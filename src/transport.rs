use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::registry::DeviceAddress;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("query timeout")]
    Timeout,
    #[error("no transport registered under name {0:?}")]
    UnknownTransport(String),
    #[error("no transport registered")]
    NoTransport,
    #[error("transport error: {0}")]
    Transport(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Operating mode code as reported by the controller
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct Mode(pub u8);

impl Mode {
    pub const STOPPED: Mode = Mode(0);
    pub const POSITION: Mode = Mode(10);
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Last observed state of a servo
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct Telemetry {
    pub mode: Mode,
    pub position: f64,
}

impl Telemetry {
    pub fn new(mode: Mode, position: f64) -> Telemetry {
        Telemetry { mode, position }
    }
}

impl From<(u8, f64)> for Telemetry {
    fn from(input: (u8, f64)) -> Self {
        let (mode, position) = input;
        Telemetry::new(Mode(mode), position)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Resolution {
    Ignore,
    Int8,
    Int16,
    Int32,
    Float,
}

impl Resolution {
    pub fn size(&self) -> usize {
        match self {
            Resolution::Ignore => 0,
            Resolution::Int8 => 1,
            Resolution::Int16 => 2,
            Resolution::Int32 | Resolution::Float => 4,
        }
    }
}

/// Which telemetry fields a query asks for, and at what resolution
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct QueryFormat {
    pub mode: Resolution,
    pub position: Resolution,
    pub velocity: Resolution,
    pub torque: Resolution,
    pub voltage: Resolution,
    pub temperature: Resolution,
    pub fault: Resolution,
}

impl Default for QueryFormat {
    fn default() -> Self {
        QueryFormat {
            mode: Resolution::Int8,
            position: Resolution::Float,
            velocity: Resolution::Float,
            torque: Resolution::Float,
            voltage: Resolution::Int8,
            temperature: Resolution::Int8,
            fault: Resolution::Int8,
        }
    }
}

impl QueryFormat {
    /// Mode plus a 16 bit position, nothing else
    pub fn position_only() -> QueryFormat {
        QueryFormat {
            mode: Resolution::Int8,
            position: Resolution::Int16,
            velocity: Resolution::Ignore,
            torque: Resolution::Ignore,
            voltage: Resolution::Ignore,
            temperature: Resolution::Ignore,
            fault: Resolution::Ignore,
        }
    }

    /// Payload bytes a reply to this format carries
    pub fn reply_len(&self) -> usize {
        [
            self.mode,
            self.position,
            self.velocity,
            self.torque,
            self.voltage,
            self.temperature,
            self.fault,
        ]
        .iter()
        .map(Resolution::size)
        .sum()
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ControllerOptions {
    pub address: DeviceAddress,
    pub query_format: QueryFormat,
}

impl ControllerOptions {
    pub fn new(address: DeviceAddress, query_format: QueryFormat) -> ControllerOptions {
        ControllerOptions {
            address,
            query_format,
        }
    }
}

/// One communication session covering every bus
#[async_trait]
pub trait Transport: Send {
    async fn query(&mut self, options: &ControllerOptions) -> Result<Telemetry>;
}

pub type SharedTransport = Arc<Mutex<Box<dyn Transport>>>;

pub fn shared(transport: Box<dyn Transport>) -> SharedTransport {
    Arc::new(Mutex::new(transport))
}

pub trait TransportFactory: Send + Sync {
    fn name(&self) -> &str;
    fn make(&self) -> Result<Box<dyn Transport>>;
}

/// Transports available to this process.
///
/// Factories are tried by name; without a name the first registered one wins.
#[derive(Default)]
pub struct TransportRegistry {
    factories: Vec<Box<dyn TransportFactory>>,
}

impl TransportRegistry {
    pub fn new() -> TransportRegistry {
        TransportRegistry::default()
    }

    pub fn register(&mut self, factory: impl TransportFactory + 'static) {
        info!("registered transport {}", factory.name());
        self.factories.push(Box::new(factory));
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.iter().map(|factory| factory.name()).collect()
    }

    pub fn make(&self, name: Option<&str>) -> Result<Box<dyn Transport>> {
        let factory = match name {
            Some(name) => self
                .factories
                .iter()
                .find(|factory| factory.name() == name)
                .ok_or_else(|| Error::UnknownTransport(name.to_owned()))?,
            None => self.factories.first().ok_or(Error::NoTransport)?,
        };
        info!("using transport {}", factory.name());
        factory.make()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn query(&mut self, _options: &ControllerOptions) -> Result<Telemetry> {
            Err(Error::Timeout)
        }
    }

    struct CountingFactory {
        name: &'static str,
        made: Arc<AtomicUsize>,
    }

    impl TransportFactory for CountingFactory {
        fn name(&self) -> &str {
            self.name
        }

        fn make(&self) -> Result<Box<dyn Transport>> {
            self.made.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(NullTransport))
        }
    }

    #[test]
    fn position_only_is_smaller_than_default() {
        assert_eq!(QueryFormat::position_only().reply_len(), 3);
        assert_eq!(QueryFormat::default().reply_len(), 15);
    }

    #[test]
    fn registry_picks_first_without_name() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut registry = TransportRegistry::new();
        registry.register(CountingFactory {
            name: "a",
            made: first.clone(),
        });
        registry.register(CountingFactory {
            name: "b",
            made: second.clone(),
        });
        assert_eq!(registry.names(), vec!["a", "b"]);

        registry.make(None).unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        registry.make(Some("b")).unwrap();
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn registry_rejects_unknown_name() {
        let mut registry = TransportRegistry::new();
        registry.register(CountingFactory {
            name: "a",
            made: Arc::new(AtomicUsize::new(0)),
        });
        let error = registry.make(Some("pi3hat")).err().unwrap();
        assert!(matches!(error, Error::UnknownTransport(name) if name == "pi3hat"));
    }

    #[test]
    fn empty_registry_has_no_transport() {
        let registry = TransportRegistry::new();
        assert!(matches!(registry.make(None), Err(Error::NoTransport)));
    }

    #[test]
    fn telemetry_defaults_to_zero() {
        let telemetry = Telemetry::default();
        assert_eq!(telemetry.mode, Mode::STOPPED);
        assert_eq!(telemetry.position, 0.0);
    }
}
