//! Signal Tracker CLI Application
//!
//! Command-line front end for the signal-tracker library. It adds:
//! - MQTT subscription to the vehicle position topic
//! - Offline replay of recorded position messages
//! - Periodic status reports (TXT/JSON)

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use signal_tracker::SignalContext;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

mod config;
mod listener;
mod replay;
mod report;

use config::{AppConfig, OutputFormat};
use report::StatusReport;

/// Longest replay mode waits on the update channel between checks
const REPLAY_POLL: Duration = Duration::from_millis(10);

/// Signal Tracker - simulate traffic signals from live vehicle positions
#[derive(Parser, Debug)]
#[command(name = "signal-tracker-cli")]
#[command(about = "Track a vehicle over MQTT and simulate nearby traffic signals", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// MQTT broker host (overrides config)
    #[arg(long, value_name = "HOST")]
    host: Option<String>,

    /// MQTT broker port (overrides config)
    #[arg(long, value_name = "PORT")]
    port: Option<u16>,

    /// MQTT topic carrying position messages (overrides config)
    #[arg(long, value_name = "TOPIC")]
    topic: Option<String>,

    /// Replay JSON-lines position messages from FILE ("-" for stdin) instead of MQTT
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Status report format (overrides config)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Stop listening after this many seconds
    #[arg(long, value_name = "SECS")]
    duration: Option<u64>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.broker.host = host.clone();
        }
        if let Some(port) = self.port {
            config.broker.port = port;
        }
        if let Some(topic) = &self.topic {
            config.broker.topic = topic.clone();
        }
        if let Some(format) = self.format {
            config.display.format = format;
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Signal Tracker CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using tracker library v{}", signal_tracker::VERSION);

    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    args.apply_overrides(&mut config);

    let (context, sender) =
        SignalContext::new(config.tracking.clone()).context("Invalid tracking configuration")?;
    log::debug!(
        "{} signal sites, green threshold {} m",
        config.tracking.sites.len(),
        config.tracking.threshold_m
    );

    match &args.replay {
        Some(path) => {
            let handle = replay::spawn(path.clone(), sender, context.link())?;
            replay_mode(context, handle, path, &config)
        }
        None => {
            let handle = listener::spawn(config.broker.clone(), sender, context.link())?;
            listen_mode(context, handle, &config, args.duration.map(Duration::from_secs))
        }
    }
}

/// Listen mode - apply live updates as they arrive, print a report every refresh
fn listen_mode(
    mut context: SignalContext,
    handle: thread::JoinHandle<()>,
    config: &AppConfig,
    duration: Option<Duration>,
) -> Result<()> {
    let source = config.broker.describe();
    let started = Instant::now();

    loop {
        // Keep draining between reports so the listener never waits on us
        let summary = context.drain_until(Instant::now() + config.display.refresh_interval());
        print_report(&StatusReport::capture(&context, source.as_str()), config.display.format)?;

        if summary.disconnected {
            log::info!("MQTT listener stopped");
            handle
                .join()
                .map_err(|_| anyhow!("MQTT listener thread panicked"))?;
            break;
        }

        if duration.is_some_and(|limit| started.elapsed() >= limit) {
            log::info!("Listen duration elapsed, exiting");
            break;
        }
    }

    Ok(())
}

/// Replay mode - apply every recorded message, then print the final report
fn replay_mode(
    mut context: SignalContext,
    handle: thread::JoinHandle<Result<replay::ReplaySummary>>,
    path: &Path,
    config: &AppConfig,
) -> Result<()> {
    while !context.drain_until(Instant::now() + REPLAY_POLL).disconnected {}

    let summary = handle
        .join()
        .map_err(|_| anyhow!("Replay thread panicked"))??;
    log::info!(
        "Replayed {} of {} messages ({} malformed)",
        summary.sent,
        summary.lines,
        summary.malformed
    );

    let source = format!("replay:{}", path.display());
    print_report(&StatusReport::capture(&context, source), config.display.format)
}

fn print_report(report: &StatusReport, format: OutputFormat) -> Result<()> {
    println!("{}", report.render(format)?);
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
