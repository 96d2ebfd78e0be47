use std::ops::RangeInclusive;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::registry::DeviceAddress;
use crate::transport::{ControllerOptions, QueryFormat, SharedTransport, Telemetry};

pub(crate) const TIMEOUT: u64 = 100;

/// Result of a single telemetry fetch
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum QueryOutcome {
    Ok(Telemetry),
    TimedOut,
}

impl QueryOutcome {
    pub fn telemetry(&self) -> Option<Telemetry> {
        match self {
            QueryOutcome::Ok(telemetry) => Some(*telemetry),
            QueryOutcome::TimedOut => None,
        }
    }
}

/// Handle to one servo on a shared transport
pub struct Controller {
    options: ControllerOptions,
    transport: SharedTransport,
    timeout: Duration,
}

impl Controller {
    pub fn new(options: ControllerOptions, transport: SharedTransport) -> Controller {
        Controller::with_timeout(options, transport, Duration::from_millis(TIMEOUT))
    }

    pub fn with_timeout(
        options: ControllerOptions,
        transport: SharedTransport,
        timeout: Duration,
    ) -> Controller {
        Controller {
            options,
            transport,
            timeout,
        }
    }

    pub fn address(&self) -> DeviceAddress {
        self.options.address
    }

    /// Fetch the latest telemetry.
    ///
    /// Transport errors and missed deadlines both come back as `TimedOut`.
    pub async fn set_query(&self) -> QueryOutcome {
        let mut transport = self.transport.lock().await;
        let response = timeout(self.timeout, transport.query(&self.options)).await;
        drop(transport);
        match response {
            Ok(Ok(telemetry)) => QueryOutcome::Ok(telemetry),
            Ok(Err(error)) => {
                debug!("{} query failed: {}", self.options.address, error);
                QueryOutcome::TimedOut
            }
            Err(_) => {
                debug!("{} query timed out", self.options.address);
                QueryOutcome::TimedOut
            }
        }
    }
}

/// Probe each id on `bus` once, returning those that answered
pub async fn scan(
    transport: &SharedTransport,
    bus: u8,
    ids: RangeInclusive<u8>,
    query_format: QueryFormat,
) -> Vec<DeviceAddress> {
    let mut found = vec![];
    for id in ids {
        let address = DeviceAddress::new(id, bus);
        let controller = Controller::new(
            ControllerOptions::new(address, query_format),
            transport.clone(),
        );
        if let QueryOutcome::Ok(_) = controller.set_query().await {
            found.push(address);
        }
    }
    found
}

/// Scan several buses in turn, keeping the bus of every responder
pub async fn scan_buses(
    transport: &SharedTransport,
    buses: &[u8],
    ids: RangeInclusive<u8>,
    query_format: QueryFormat,
) -> Vec<DeviceAddress> {
    let mut found = vec![];
    for bus in buses {
        found.extend(scan(transport, *bus, ids.clone(), query_format).await);
    }
    found
}
