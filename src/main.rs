//! CLI entry point for the event ring.
//!
//! Drives a simulated pulse stream through the ring and reports how many
//! records reached the consumer clean and how many were tainted.
//!
//! # Usage
//!
//! Run 20k pulses with a beam trip at pulse 8000 lasting 30 pulses:
//! ```bash
//! event_ring run --pulses 20000 --trip 8000:30 --holdoff 200
//! ```
//!
//! Show the effective configuration:
//! ```bash
//! event_ring config --config config/event_ring.toml
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use daq_event_ring::config::{Settings, DEFAULT_CONFIG_PATH};
use daq_event_ring::data::event_ring::EventRing;
use daq_event_ring::data::mock_source::{MockPulseSource, Trip};
use daq_event_ring::data::pulse::PulseCuts;
use daq_event_ring::data::ring_log::RingLog;
use daq_event_ring::data::rolling_average::{RollingAverage, RollingSummary};
use daq_event_ring::run::{self, RunReport};
use daq_event_ring::tracing_setup::{self, OutputFormat};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "event_ring")]
#[command(about = "Sliding-window event ring with beam-trip holdoff", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push a simulated pulse stream through the ring
    Run(RunArgs),

    /// Print the effective configuration as TOML
    Config {
        /// Configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of pulses to simulate
    #[arg(long, default_value_t = 20_000)]
    pulses: usize,

    /// Detector channels per pulse
    #[arg(long, default_value_t = 4)]
    channels: usize,

    /// Random seed for the simulated stream
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Inject a beam trip as START:LENGTH (repeatable)
    #[arg(long = "trip", value_name = "START:LENGTH")]
    trips: Vec<Trip>,

    /// Drop one channel's readout on this pulse (repeatable)
    #[arg(long = "dropout", value_name = "SEQUENCE")]
    dropouts: Vec<u64>,

    /// Ring capacity in events
    #[arg(long)]
    ring_size: Option<usize>,

    /// Stability cut switch (> 0 enables trip detection)
    #[arg(long, allow_negative_numbers = true)]
    stability_cut: Option<f64>,

    /// Pushes tainted after a beam trip
    #[arg(long)]
    holdoff: Option<u32>,

    /// Print the rolling average when the ring is unwound
    #[arg(long)]
    print_after_unwind: bool,

    /// Write the slot log to this file
    #[arg(long)]
    ring_log: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<OutputFormat>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    report: &'a RunReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    rolling_average: Option<&'a RollingSummary>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_simulation(args),
        Commands::Config { config } => print_config(config),
    }
}

fn load_settings(path: Option<PathBuf>) -> Result<Settings> {
    let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    Settings::load_from(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn run_simulation(args: RunArgs) -> Result<()> {
    let mut settings = load_settings(args.config)?;
    if let Some(size) = args.ring_size {
        settings.ring.size = size;
    }
    if let Some(cut) = args.stability_cut {
        settings.ring.stability_cut = cut;
    }
    if let Some(holdoff) = args.holdoff {
        settings.ring.holdoff = holdoff;
    }
    if args.print_after_unwind {
        settings.ring.print_after_unwind = true;
    }
    if args.ring_log.is_some() {
        settings.diagnostics.ring_log = args.ring_log;
    }
    if let Some(level) = args.log_level {
        settings.application.log_level = level;
    }
    if let Some(format) = args.log_format {
        settings.application.log_format = format;
    }
    settings.validate().context("Invalid configuration")?;

    tracing_setup::init_from_settings(&settings).map_err(anyhow::Error::msg)?;

    let mut source = MockPulseSource::new(args.seed, args.channels)
        .with_cuts(PulseCuts::from(settings.cuts.clone()));
    for trip in args.trips {
        source = source.with_trip(trip);
    }
    for sequence in args.dropouts {
        source = source.with_dropout(sequence);
    }

    let prototype = source.prototype();
    let accumulator = RollingAverage::for_prototype(&prototype, settings.rolling_average.clone());
    let mut ring = EventRing::new(&settings.ring, &prototype, accumulator)
        .context("Failed to create event ring")?;
    if let Some(path) = &settings.diagnostics.ring_log {
        let log = RingLog::create(path)
            .with_context(|| format!("Failed to create ring log {}", path.display()))?;
        ring = ring.with_ring_log(log);
    }

    log_run_start(&settings, args.pulses);

    let mut report = RunReport::default();
    run::process(&mut ring, source.take(args.pulses), &mut report);

    // Snapshot before unwinding empties the window.
    let summary = settings
        .ring
        .print_after_unwind
        .then(|| ring.accumulator().summary().clone());
    run::finish(&mut ring, &mut report);

    if args.json {
        let json = JsonReport {
            report: &report,
            rolling_average: summary.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        print!("{}", report);
        if let Some(summary) = &summary {
            println!();
            print!("{}", summary);
        }
    }

    Ok(())
}

fn log_run_start(settings: &Settings, pulses: usize) {
    info!(
        app = %settings.application.name,
        pulses,
        ring_size = settings.ring.size,
        holdoff = settings.ring.holdoff,
        stability = settings.ring.stability_enabled(),
        "Starting run"
    );
}

fn print_config(path: Option<PathBuf>) -> Result<()> {
    let settings = load_settings(path)?;
    settings.validate().context("Invalid configuration")?;
    print!(
        "{}",
        toml::to_string_pretty(&settings).context("Failed to render configuration")?
    );
    Ok(())
}
