use bytes::BytesMut;
use std::fmt::{self, Write};
use std::io;
use std::time::Duration;
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::poller::LoopCounters;
use crate::registry::DeviceAddress;
use crate::transport::{Error, Telemetry};

pub const STATUS_PERIOD: Duration = Duration::from_millis(100);

/// Snapshot printed once per status period
#[derive(Debug, PartialEq, Clone)]
pub struct StatusReport {
    pub timestamp: f64,
    pub cycles: u64,
    pub rate_hz: f64,
    pub servos: Vec<(DeviceAddress, Telemetry)>,
    pub rx_timeouts: u64,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{:.3} {:6} {:6.1}Hz",
            self.timestamp, self.cycles, self.rate_hz
        )?;
        for (address, telemetry) in &self.servos {
            writeln!(
                f,
                "  {}: Mode {}, Position {:.3}",
                address, telemetry.mode, telemetry.position
            )?;
        }
        writeln!(f, "RX Timeouts: {}", self.rx_timeouts)
    }
}

/// Decides when a status report is due.
///
/// Thresholds advance by exactly one period from the previous threshold, so a
/// late report does not push the schedule back.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    period: f64,
    next_status: f64,
}

impl StatusReporter {
    pub fn new(period: Duration, start: f64) -> StatusReporter {
        let period = period.as_secs_f64();
        StatusReporter {
            period,
            next_status: start + period,
        }
    }

    pub fn next_status(&self) -> f64 {
        self.next_status
    }

    pub fn poll(
        &mut self,
        now: f64,
        counters: &mut LoopCounters,
        devices: &[DeviceAddress],
        results: &[Telemetry],
    ) -> Option<StatusReport> {
        if now <= self.next_status {
            return None;
        }
        let report = StatusReport {
            timestamp: now,
            cycles: counters.cycles,
            rate_hz: counters.hz_count as f64 / self.period,
            servos: devices.iter().copied().zip(results.iter().copied()).collect(),
            rx_timeouts: counters.rx_timeouts,
        };
        trace!(
            "status due at {:.3}, {:.3}s late",
            self.next_status,
            now - self.next_status
        );
        counters.hz_count = 0;
        self.next_status += self.period;
        Some(report)
    }
}

/// Renders status reports as console text
#[derive(Debug, Default, Clone, Copy)]
pub struct StatusCodec;

impl Encoder<StatusReport> for StatusCodec {
    type Error = Error;

    fn encode(&mut self, report: StatusReport, buf: &mut BytesMut) -> Result<(), Error> {
        buf.reserve(64 * (report.servos.len() + 2));
        write!(buf, "{}", report)
            .map_err(|_| Error::Io(io::Error::new(io::ErrorKind::Other, "formatting failed")))?;
        Ok(())
    }
}
