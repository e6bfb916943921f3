//! torveil binary entry point.
//!
//! Handles CLI parsing, logging and telemetry initialization, and hands
//! off to the orchestrator. The child command inherits stdin/stdout/stderr,
//! so torveil's own diagnostics stay on stderr (tracing) and in syslog
//! (audit) where they cannot mix with the child's output.

use anyhow::{Context, Result};
use clap::Parser;
use torveil::{cli::Cli, cli_handler, orchestrator, telemetry};
use tracing::{debug, warn};

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("torveil: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    init_tracing(cli.verbose)?;
    debug!("Parsed CLI arguments: {:?}", cli);

    // A host without a syslog daemon still gets to run; it just loses the
    // audit trail.
    if let Err(e) = telemetry::init_logger() {
        warn!("Audit logging unavailable: {}", e);
        telemetry::init_null_logger();
    }

    if let Some(command) = cli.command {
        cli_handler::handle(command)?;
        return Ok(0);
    }

    orchestrator::run_redirected(&cli)
}

/// Initialize the tracing subscriber for diagnostics on stderr.
///
/// # Verbosity Levels
/// - 0 (default): Only warnings and errors
/// - 1 (-v): Info level
/// - 2 (-vv): Debug level
/// - 3+ (-vvv): Trace level
fn init_tracing(verbose: u8) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}
