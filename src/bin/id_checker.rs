#[path = "../logging.rs"]
mod logging;

use structopt::StructOpt;

use servo_poller::registry::{BUS_1, BUS_2};
use servo_poller::transport::shared;
use servo_poller::{default_devices, scan_buses, QueryFormat, SimFactory, TransportRegistry};

#[derive(StructOpt)]
#[structopt(about = "Probe every servo id and list the ones that answer")]
pub struct Args {
    #[structopt(long, default_value = "1", help = "Lowest id to probe")]
    pub first: u8,
    #[structopt(long, default_value = "127", help = "Highest id to probe")]
    pub last: u8,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::from_args();
    logging::init_logging();

    let mut registry = TransportRegistry::new();
    registry.register(SimFactory::new(default_devices()));
    let transport = shared(registry.make(None)?);

    println!("Scanning for connected servos...");
    let found = scan_buses(
        &transport,
        &[BUS_1, BUS_2],
        args.first..=args.last,
        QueryFormat::position_only(),
    )
    .await;
    let mut discovered = vec![];
    for address in found {
        println!("Found servo with ID: {} (Bus {})", address.id(), address.bus());
        discovered.push((address.id(), address.bus()));
    }

    if discovered.is_empty() {
        println!("No servos found.");
    } else {
        // (id, bus) pairs
        println!("Discovered servos: {:?}", discovered);
    }
    Ok(())
}
