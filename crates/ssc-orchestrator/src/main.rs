//! ssc command line
//!
//! Runs a command, forwards the configured ports to it, and keeps it
//! stopped while nobody is connected.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ssc_core::config::{self, parse_duration, SupervisorConfig};
use ssc_core::PortMapping;
use ssc_orchestrator::signals::TerminationSignals;
use ssc_orchestrator::{Shutdown, Supervisor};

#[derive(Parser)]
#[command(name = "ssc")]
#[command(about = "Suspend a process while nobody is connected to it")]
#[command(version)]
struct Args {
    /// Port mappings, `listen=destination` separated by `;` (e.g. `:8080=:80`)
    #[arg(short, long, value_name = "MAPPINGS")]
    ports: Vec<String>,

    /// Idle time before the process is paused (e.g. `500ms`, `5s`, `1m`)
    #[arg(short = 'd', long, value_name = "DURATION", value_parser = duration_arg)]
    freeze_delay: Option<Duration>,

    /// Connections shorter than this re-pause without a full countdown
    #[arg(short = 'n', long = "nap", value_name = "DURATION", value_parser = duration_arg)]
    nap: Option<Duration>,

    /// Attach the process to a pseudo-terminal
    #[arg(short, long)]
    interactive: bool,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Verbose output (debug logging)
    #[arg(short, long)]
    verbose: bool,

    /// Command to run, followed by its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    command: Vec<String>,
}

fn duration_arg(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout belongs to the child
    let log_level = if args.verbose { "debug" } else { &args.log_level };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = build_config(args)?;
    if config.command.is_empty() {
        Args::command()
            .error(ErrorKind::MissingRequiredArgument, "no command given")
            .exit();
    }
    config.validate().context("Invalid configuration")?;

    tracing::info!(
        mappings = config.mappings.len(),
        freeze_delay = ?config.freeze_delay,
        nap = ?config.nap_duration,
        "ssc starting"
    );

    let mut signals =
        TerminationSignals::register().context("Failed to install signal handlers")?;

    let supervisor = Supervisor::launch(&config)
        .await
        .with_context(|| format!("Failed to supervise {:?}", config.command))?;

    let outcome = supervisor
        .run_until(async move { signals.recv().await })
        .await;

    match outcome {
        Shutdown::ProcessExited(Some(exit)) if exit.success() => {
            tracing::info!("Process finished, exiting")
        }
        Shutdown::ProcessExited(Some(exit)) => {
            tracing::warn!("Process finished ({}), exiting", exit)
        }
        Shutdown::ProcessExited(None) => tracing::info!("Process finished, exiting"),
        Shutdown::Signal(signal) => tracing::info!("Exiting after {}", signal),
    }

    // The stdin bridge may still be blocked in a read, so don't wait for the runtime
    std::process::exit(0);
}

/// Defaults, then the config file, then command-line flags
fn build_config(args: Args) -> Result<SupervisorConfig> {
    let mut config = if let Some(config_path) = &args.config {
        config::load_config(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        let default_path = config::default_config_path();
        if default_path.exists() {
            config::load_config(&default_path)
                .with_context(|| format!("Failed to load config from {:?}", default_path))?
        } else {
            SupervisorConfig::default()
        }
    };

    if !args.ports.is_empty() {
        let mut mappings = Vec::new();
        for list in &args.ports {
            let parsed = PortMapping::parse_list(list)
                .with_context(|| format!("Invalid port mappings {:?}", list))?;
            mappings.extend(parsed);
        }
        config.mappings = mappings;
    }
    if let Some(delay) = args.freeze_delay {
        config.freeze_delay = delay;
    }
    if let Some(nap) = args.nap {
        config.nap_duration = nap;
    }
    if args.interactive {
        config.interactive = true;
    }
    if !args.command.is_empty() {
        config.command = args.command;
    }

    Ok(config)
}
