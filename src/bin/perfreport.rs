#![forbid(unsafe_code)]

//! CLI binary: inspect and convert encoded performance reports.
//!
//! Usage:
//! ```text
//! perfreport decode payload.txt
//! adb logcat -d | grep ... | perfreport verify -
//! perfreport jank latency.txt --refresh-ms 16.67
//! perfreport convert payload.txt --to tagged
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use perfreport::config::PerfReportConfig;
use perfreport::jank::{
    DEFAULT_JANK_THRESHOLD_MS, JankStats, frame_intervals_ms, frame_jankiness, parse_latency_dump,
};
use perfreport::wire::{self, WireFormat};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "perfreport")]
#[command(about = "Decode, verify and convert performance report payloads")]
struct Args {
    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON config file.
    #[arg(long, global = true, env = "PERFREPORT_CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Decode a payload (either format) and print the report as JSON.
    Decode {
        /// Payload file, or `-` for stdin.
        input: PathBuf,
    },
    /// Decode a payload and recompute every array statistic from raw values.
    Verify {
        /// Payload file, or `-` for stdin.
        input: PathBuf,
    },
    /// Compute jank statistics from a frame latency dump.
    Jank {
        /// Latency dump file, or `-` for stdin.
        input: PathBuf,

        /// Refresh period in ms; defaults to the period in the dump header.
        #[arg(long)]
        refresh_ms: Option<f64>,

        /// Jitter below this many ms is not counted as frame jankiness.
        #[arg(long, default_value_t = DEFAULT_JANK_THRESHOLD_MS)]
        threshold_ms: f64,
    },
    /// Re-encode a payload in another wire format.
    Convert {
        /// Payload file, or `-` for stdin.
        input: PathBuf,

        /// Target format (`legacy` or `tagged`); defaults to the configured one.
        #[arg(long)]
        to: Option<WireFormat>,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    let config = PerfReportConfig::load(args.config.as_deref()).context("loading config")?;

    let output = match args.command {
        Command::Decode { input } => {
            let report = wire::decode(&read_input(&input)?).context("decoding payload")?;
            serde_json::to_string_pretty(&report)?
        }
        Command::Verify { input } => {
            let report = wire::decode(&read_input(&input)?).context("decoding payload")?;
            wire::verify_stats(&report).context("verifying statistics")?;
            let rows = report.measurements().count();
            tracing::info!(event = "cli.verify", rows, "All statistics agree with raw values");
            format!("ok: {rows} measurement(s) verified")
        }
        Command::Jank {
            input,
            refresh_ms,
            threshold_ms,
        } => jank_report(&read_input(&input)?, refresh_ms, threshold_ms)?,
        Command::Convert { input, to } => {
            let report = wire::decode(&read_input(&input)?).context("decoding payload")?;
            wire::encode(&report, to.unwrap_or(config.wire_format)).context("encoding payload")?
        }
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(())
}

fn jank_report(dump_text: &str, refresh_ms: Option<f64>, threshold_ms: f64) -> Result<String> {
    let dump = parse_latency_dump(dump_text).context("parsing latency dump")?;
    let refresh_ms = refresh_ms.unwrap_or_else(|| dump.refresh_period_ms());
    if !(refresh_ms.is_finite() && refresh_ms > 0.0) {
        bail!("refresh period must be positive, got {refresh_ms}");
    }

    let intervals_ms = frame_intervals_ms(&dump.present_timestamps_ns);
    let jank = JankStats::from_intervals(&intervals_ms, refresh_ms)?;
    let jankiness = frame_jankiness(&intervals_ms, refresh_ms, threshold_ms)?;

    Ok(serde_json::to_string_pretty(&json!({
        "frames": dump.present_timestamps_ns.len(),
        "refreshPeriodMs": refresh_ms,
        "jank": jank,
        "frameJankiness": jankiness,
    }))?)
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("reading stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn init_tracing(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}
