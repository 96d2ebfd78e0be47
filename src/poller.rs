use futures::{Sink, SinkExt};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::clock::Clock;
use crate::config::PollerConfig;
use crate::controller::{Controller, QueryOutcome};
use crate::registry::DeviceAddress;
use crate::reporter::{StatusReport, StatusReporter, STATUS_PERIOD};
use crate::transport::{ControllerOptions, Error, SharedTransport, Telemetry};

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
pub struct LoopCounters {
    /// Iterations since start
    pub cycles: u64,
    /// Iterations since the last status report
    pub hz_count: u64,
    /// Failed fetches since start
    pub rx_timeouts: u64,
}

/// Queries every servo back to back, keeping the last answer from each
pub struct Poller {
    devices: Vec<DeviceAddress>,
    controllers: Vec<Controller>,
    results: Vec<Telemetry>,
    counters: LoopCounters,
    status_period: Duration,
}

impl Poller {
    pub fn new(controllers: Vec<Controller>) -> Poller {
        let devices: Vec<DeviceAddress> = controllers
            .iter()
            .map(|controller| controller.address())
            .collect();
        Poller {
            results: vec![Telemetry::default(); devices.len()],
            devices,
            controllers,
            counters: LoopCounters::default(),
            status_period: STATUS_PERIOD,
        }
    }

    pub fn from_config(config: &PollerConfig, transport: SharedTransport) -> Poller {
        let controllers = config
            .devices
            .iter()
            .map(|address| {
                Controller::with_timeout(
                    ControllerOptions::new(*address, config.query_format),
                    transport.clone(),
                    config.query_timeout,
                )
            })
            .collect();
        Poller::new(controllers).with_status_period(config.status_period)
    }

    pub fn with_status_period(mut self, status_period: Duration) -> Poller {
        self.status_period = status_period;
        self
    }

    pub fn devices(&self) -> &[DeviceAddress] {
        &self.devices
    }

    pub fn results(&self) -> &[Telemetry] {
        &self.results
    }

    pub fn counters(&self) -> LoopCounters {
        self.counters
    }

    /// One pass over every servo in registry order
    pub async fn cycle(&mut self) {
        self.counters.cycles += 1;
        self.counters.hz_count += 1;
        for (controller, result) in self.controllers.iter().zip(self.results.iter_mut()) {
            match controller.set_query().await {
                QueryOutcome::Ok(telemetry) => *result = telemetry,
                QueryOutcome::TimedOut => self.counters.rx_timeouts += 1,
            }
        }
    }

    /// Poll until `cancel` fires, sending a report to `sink` every status period.
    ///
    /// There is no pause between cycles.
    pub async fn run<C, S>(
        &mut self,
        clock: &C,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<(), Error>
    where
        C: Clock + ?Sized,
        S: Sink<StatusReport, Error = Error> + Unpin,
    {
        let mut reporter = StatusReporter::new(self.status_period, clock.now());
        info!(
            "polling {} servos, status every {:?}",
            self.devices.len(),
            self.status_period
        );
        while !cancel.is_cancelled() {
            self.cycle().await;
            if let Some(report) = reporter.poll(
                clock.now(),
                &mut self.counters,
                &self.devices,
                &self.results,
            ) {
                sink.send(report).await?;
            }
        }
        info!("polling stopped after {} cycles", self.counters.cycles);
        Ok(())
    }
}
