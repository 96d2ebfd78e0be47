use std::ffi::OsString;
use structopt::clap::AppSettings;
use structopt::StructOpt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;

use crate::clock::MonotonicClock;
use crate::config::PollerConfig;
use crate::poller::Poller;
use crate::registry::{default_devices, BUS_1, BUS_1_IDS, BUS_2, BUS_2_IDS};
use crate::reporter::StatusCodec;
use crate::transport::{self, Error, TransportRegistry};

/// Clap's own help and version flags are off so `--help` prints exactly
/// [`usage`].
#[derive(StructOpt, Debug)]
#[structopt(
    name = "read_positions",
    global_settings = &[AppSettings::DisableHelpFlags, AppSettings::DisableVersion]
)]
pub struct Args {
    /// Print usage and exit
    #[structopt(short, long)]
    pub help: bool,
}

pub fn usage() -> String {
    format!(
        "Usage: read_positions\n\
         \n\
         \x20 This program queries and displays the position data of {} servos:\n\
         \x20  - IDs {} to {} on bus {}\n\
         \x20  - IDs {} to {} on bus {}\n",
        default_devices().len(),
        BUS_1_IDS.start(),
        BUS_1_IDS.end(),
        BUS_1,
        BUS_2_IDS.start(),
        BUS_2_IDS.end(),
        BUS_2,
    )
}

/// Parse the command line.
///
/// A leading `-h` or `--help` wins over whatever follows it, so help is shown
/// even next to arguments that would otherwise be rejected.
pub fn parse_args<I, T>(args: I) -> Result<Args, structopt::clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
    match args.get(1).and_then(|arg| arg.to_str()) {
        Some("-h") | Some("--help") => Ok(Args { help: true }),
        _ => Args::from_iter_safe(args),
    }
}

/// Body of `read_positions`.
///
/// `register` is only called once help has been ruled out, so a help request
/// never touches the transport layer.
pub async fn run<W, F>(args: Args, register: F, mut out: W) -> Result<(), Error>
where
    W: AsyncWrite + Unpin,
    F: FnOnce(&PollerConfig) -> Result<TransportRegistry, Error>,
{
    if args.help {
        out.write_all(usage().as_bytes()).await?;
        out.flush().await?;
        return Ok(());
    }

    let config = PollerConfig::default();
    let registry = register(&config)?;
    let transport = transport::shared(registry.make(config.transport.as_deref())?);
    let mut poller = Poller::from_config(&config, transport);

    let clock = MonotonicClock::new();
    let mut sink = FramedWrite::new(out, StatusCodec);
    // never cancelled, the process is stopped from outside
    let cancel = CancellationToken::new();
    poller.run(&clock, &mut sink, &cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use structopt::clap::ErrorKind;

    fn parse(args: &[&str]) -> Result<Args, structopt::clap::Error> {
        parse_args(std::iter::once("read_positions").chain(args.iter().copied()))
    }

    #[test]
    fn help_flags_parse() {
        assert!(parse(&["--help"]).unwrap().help);
        assert!(parse(&["-h"]).unwrap().help);
        assert!(!parse(&[]).unwrap().help);
    }

    #[test]
    fn unknown_arguments_are_rejected() {
        assert_eq!(
            parse(&["--bus", "3"]).unwrap_err().kind,
            ErrorKind::UnknownArgument
        );
        assert!(parse(&["extra"]).is_err());
        assert!(parse(&["-V"]).is_err());
        // help only counts as the first argument
        assert!(parse(&["extra", "--help"]).is_err());
    }

    #[test]
    fn leading_help_wins_over_extra_arguments() {
        assert!(parse(&["--help", "extra"]).unwrap().help);
        assert!(parse(&["-h", "-h"]).unwrap().help);
        assert!(parse(&["--help", "--bus", "3"]).unwrap().help);
    }

    #[test]
    fn usage_lists_both_ranges() {
        let usage = usage();
        let lines: Vec<&str> = usage.lines().collect();
        assert_eq!(lines[0], "Usage: read_positions");
        assert!(lines.contains(&"  This program queries and displays the position data of 14 servos:"));
        assert!(lines.contains(&"   - IDs 11 to 17 on bus 1"));
        assert!(lines.contains(&"   - IDs 21 to 27 on bus 2"));
    }

    #[tokio::test]
    async fn help_exits_before_transport_setup() {
        let registered = Cell::new(false);
        let mut out = Vec::new();
        run(
            parse(&["--help"]).unwrap(),
            |_| {
                registered.set(true);
                Ok(TransportRegistry::new())
            },
            &mut out,
        )
        .await
        .unwrap();
        assert!(!registered.get());
        assert_eq!(String::from_utf8(out).unwrap(), usage());
    }

    #[tokio::test]
    async fn help_with_extra_arguments_still_prints_usage() {
        let registered = Cell::new(false);
        let mut out = Vec::new();
        run(
            parse(&["--help", "extra"]).unwrap(),
            |_| {
                registered.set(true);
                Ok(TransportRegistry::new())
            },
            &mut out,
        )
        .await
        .unwrap();
        assert!(!registered.get());
        assert_eq!(String::from_utf8(out).unwrap(), usage());
    }

    #[tokio::test]
    async fn missing_transport_is_fatal() {
        let mut out = Vec::new();
        let result = run(
            parse(&[]).unwrap(),
            |_| Ok(TransportRegistry::new()),
            &mut out,
        )
        .await;
        assert!(matches!(result, Err(Error::NoTransport)));
        assert!(out.is_empty());
    }
}
