mod logging;

use servo_poller::cli;
use servo_poller::{SimFactory, TransportRegistry};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = cli::parse_args(std::env::args_os()).unwrap_or_else(|error| error.exit());
    logging::init_logging();
    cli::run(
        args,
        |config| {
            let mut registry = TransportRegistry::new();
            registry.register(SimFactory::new(config.devices.clone()));
            Ok(registry)
        },
        tokio::io::stdout(),
    )
    .await?;
    Ok(())
}
