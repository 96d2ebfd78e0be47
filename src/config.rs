use std::time::Duration;

use crate::controller::TIMEOUT;
use crate::registry::{default_devices, DeviceAddress};
use crate::reporter::STATUS_PERIOD;
use crate::transport::QueryFormat;

/// Everything the polling loop needs to know up front
#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    pub devices: Vec<DeviceAddress>,
    pub status_period: Duration,
    pub query_timeout: Duration,
    pub query_format: QueryFormat,
    /// `None` picks the first registered transport
    pub transport: Option<String>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        PollerConfig {
            devices: default_devices(),
            status_period: STATUS_PERIOD,
            query_timeout: Duration::from_millis(TIMEOUT),
            query_format: QueryFormat::position_only(),
            transport: None,
        }
    }
}

impl PollerConfig {
    pub fn with_devices(devices: Vec<DeviceAddress>) -> PollerConfig {
        PollerConfig {
            devices,
            ..PollerConfig::default()
        }
    }
}
