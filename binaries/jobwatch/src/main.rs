use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use jobwatch::{
    dashboard::{
        JobKind, WatchConfig, WatchTarget,
        config::{DEFAULT_PROTOCOL_URL, PROTOCOL_URL_ENV},
    },
    run_watch,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(name = "jobwatch", version, about = "Watch flow and batch job status")]
struct Cli {
    /// Job gateway URL
    #[arg(long, env = PROTOCOL_URL_ENV, default_value = DEFAULT_PROTOCOL_URL)]
    protocol_url: String,

    /// Delay between two polls of the same job (e.g. 5s, 500ms)
    #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
    interval: Duration,

    /// Width of the metrics window fetched on each poll
    #[arg(long, default_value = "30s", value_parser = humantime::parse_duration)]
    time_range: Duration,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Watch stream-processing flows
    Flow(JobArgs),
    /// Watch batch (MapReduce) jobs
    Batch(JobArgs),
}

#[derive(Debug, clap::Args)]
struct JobArgs {
    /// Jobs as `<app>:<job>`
    #[arg(required = true)]
    ids: Vec<String>,

    /// Metric to track, repeatable
    #[arg(long = "metric")]
    metrics: Vec<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let (kind, args) = match cli.command {
        Command::Flow(args) => (JobKind::Flow, args),
        Command::Batch(args) => (JobKind::Batch, args),
    };
    let targets = args
        .ids
        .into_iter()
        .map(|id| WatchTarget {
            kind,
            id,
            metrics: args.metrics.clone(),
        })
        .collect();

    let config = WatchConfig {
        protocol_url: cli.protocol_url,
        poll_interval: cli.interval,
        time_range: cli.time_range,
    };
    run_watch(config, targets)
}
