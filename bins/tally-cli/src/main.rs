//! tally: operator CLI for the vote-abuse engine.
//!
//! Replays newline-delimited JSON vote events through an in-memory engine,
//! printing one reward decision per vote and a statistics/health report at
//! the end. Also checks configuration files before they are deployed.
//!
//! Decisions and reports go to stdout as JSON; logs go to stderr.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

use tally_core::clock::{Clock, ManualClock, SystemClock};
use tally_core::health::SystemHealthSnapshot;
use tally_core::stats::{AbuseStatistics, StatsWindow};
use tally_core::types::{PlanTier, UserId, VoteEvent};
use tally_engine::{settings, AbuseEngine, StaticPlanDirectory};

/// Vote-abuse detection and reward gating.
#[derive(Parser)]
#[command(name = "tally", version, about = "Vote-abuse detection and reward gating")]
struct Cli {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a file of vote events through the engine.
    Replay(ReplayArgs),
    /// Load, validate and print the effective configuration.
    CheckConfig(CheckConfigArgs),
}

#[derive(Args)]
struct ReplayArgs {
    /// Newline-delimited JSON vote events.
    #[arg(short, long)]
    events: PathBuf,

    /// TOML configuration file; `TALLY__*` environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON object mapping user ids to plan tiers, e.g. {"alice": "pro"}.
    #[arg(short, long)]
    plans: Option<PathBuf>,

    /// Stamp cases with each vote's own timestamp instead of the wall clock.
    #[arg(long)]
    event_time: bool,

    /// Only print the final report.
    #[arg(short, long)]
    quiet: bool,

    /// Detection-time window for the final statistics.
    #[arg(long, value_enum, default_value_t = Window::All)]
    window: Window,
}

#[derive(Args)]
struct CheckConfigArgs {
    /// TOML configuration file; defaults and environment only if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Window {
    All,
    #[value(name = "24h")]
    Day,
    #[value(name = "7d")]
    Week,
    #[value(name = "30d")]
    Month,
}

impl From<Window> for StatsWindow {
    fn from(w: Window) -> Self {
        match w {
            Window::All => StatsWindow::All,
            Window::Day => StatsWindow::Last24Hours,
            Window::Week => StatsWindow::Last7Days,
            Window::Month => StatsWindow::Last30Days,
        }
    }
}

#[derive(Serialize)]
struct Report {
    votes: u64,
    credits_granted: u64,
    statistics: AbuseStatistics,
    health: SystemHealthSnapshot,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    match cli.command {
        Commands::Replay(args) => replay(args),
        Commands::CheckConfig(args) => check_config(args),
    }
}

fn replay(args: ReplayArgs) -> Result<()> {
    let config = settings::load(args.config.as_deref()).context("Failed to load configuration")?;

    let clock = Arc::new(ManualClock::new(SystemClock.now()));
    let mut builder = AbuseEngine::builder(config);
    if args.event_time {
        builder = builder.clock(clock.clone());
    }
    if let Some(path) = &args.plans {
        builder = builder.plans(Arc::new(load_plans(path)?));
    }
    let engine = builder.build().context("Failed to start engine")?;

    let file = File::open(&args.events)
        .with_context(|| format!("Failed to open events file: {}", args.events.display()))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut votes = 0u64;
    let mut credits_granted = 0u64;

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let lineno = idx + 1;
        let line = line.with_context(|| format!("Failed to read line {lineno}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let event: VoteEvent = serde_json::from_str(&line)
            .with_context(|| format!("Invalid vote event on line {lineno}"))?;
        if args.event_time {
            clock.set(event.timestamp);
        }

        let decision = engine
            .evaluate(&event)
            .with_context(|| format!("Failed to evaluate vote on line {lineno}"))?;
        votes += 1;
        credits_granted += u64::from(decision.credits);
        if !args.quiet {
            serde_json::to_writer(&mut out, &decision).context("Failed to write decision")?;
            writeln!(out)?;
        }
    }

    let report = Report {
        votes,
        credits_granted,
        statistics: engine.get_statistics(args.window.into())?,
        health: engine.get_health()?,
    };
    serde_json::to_writer_pretty(&mut out, &report).context("Failed to write report")?;
    writeln!(out)?;

    info!(
        votes,
        credits_granted,
        cases = report.statistics.total_cases,
        active = report.health.active_cases,
        "replay: complete"
    );
    if report.health.active_cases > 0 {
        warn!(active = report.health.active_cases, "replay: cases awaiting investigation");
    }
    Ok(())
}

fn load_plans(path: &Path) -> Result<StaticPlanDirectory> {
    let file = File::open(path).with_context(|| format!("Failed to open plans file: {}", path.display()))?;
    let plans: HashMap<String, PlanTier> =
        serde_json::from_reader(BufReader::new(file)).context("Invalid plans file")?;
    info!(users = plans.len(), "replay: plan directory loaded");
    Ok(plans.into_iter().map(|(user, tier)| (UserId::new(user), tier)).collect())
}

fn check_config(args: CheckConfigArgs) -> Result<()> {
    let config = settings::load(args.config.as_deref()).context("Configuration rejected")?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    info!("check-config: configuration is valid");
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Pass `format = "json"` for structured JSON output. Any other value
/// defaults to human-readable text. Both write to stderr.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(io::stderr))
            .init();
    }
}
