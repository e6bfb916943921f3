//! Run orchestration.
//!
//! Composes the pieces into a complete redirected run: preflight checks,
//! interrupt registration, engine start, the child command (or the rotated
//! sequence of commands), and the single teardown both completion paths
//! share. The optional packet capture brackets all of it.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::capture::CaptureSession;
use crate::cli::Cli;
use crate::engine::{InterruptGuard, StateGuard};
use crate::net::{IptablesFirewall, RedirectPorts, ResolvConf, SystemExec};
use crate::preflight;
use crate::runner::CommandRunner;
use crate::telemetry::{self, AuditEvent, TeardownReason};
use crate::tor::{TorConfig, TorSupervisor};

/// Run the child command(s) under Tor redirection.
///
/// Returns the exit code the process should terminate with: the child's own
/// code on a normal run, 0 for an interrupted run that reached teardown.
pub fn run_redirected(cli: &Cli) -> Result<i32> {
    preflight::check().context("Preflight checks failed")?;

    let sequence = cli.sequence();
    if sequence.is_empty() {
        anyhow::bail!("No command given. Run 'torveil --help' for usage.");
    }

    let mut tor_config = TorConfig::default();
    if let Some(countries) = &cli.exit_countries {
        tor_config.set_exit_countries(countries);
        info!("Exit relays restricted to: {:?}", tor_config.exit_countries);
    }

    let ports = RedirectPorts {
        dns: tor_config.dns_port,
        trans: tor_config.trans_port,
    };
    let exec = Arc::new(SystemExec);
    let mut guard = StateGuard::new(
        IptablesFirewall::new(exec.clone(), ports),
        ResolvConf::new(),
        TorSupervisor::new(exec, tor_config),
    );

    // Registered before any state changes so an early ^C is not lost. The
    // handler only sets a flag; teardown always runs on this thread.
    let interrupt = InterruptGuard::install().context("Failed to install interrupt handler")?;

    telemetry::audit().log(AuditEvent::RunStart {
        user: whoami(),
        command: sequence[0].clone(),
        pid: std::process::id(),
    });
    let started = Instant::now();

    let capture = match &cli.capture {
        Some(path) => {
            Some(CaptureSession::start(path).context("Failed to start packet capture")?)
        }
        None => None,
    };

    if let Err(e) = guard.start() {
        // start() already unwound its own partial work.
        if let Some(capture) = capture {
            capture.stop();
        }
        telemetry::audit().log(AuditEvent::Restored {
            reason: TeardownReason::StartFailure,
        });
        return Err(anyhow::Error::new(e).context("Failed to bring redirection online"));
    }

    let mut exit_code = 0;
    for (index, argv) in sequence.iter().enumerate() {
        if interrupt.interrupted() {
            break;
        }

        if index > 0 {
            // Fresh circuit between sequenced commands.
            info!("Rotating circuit before command {}", index + 1);
            telemetry::audit().log(AuditEvent::CircuitRotate {
                command_index: index + 1,
            });
            guard.stop();
            if let Err(e) = guard.start() {
                error!("Failed to re-establish redirection: {:#}", anyhow::Error::new(e));
                exit_code = 1;
                break;
            }
        }

        match CommandRunner::run(argv) {
            Ok(status) => {
                exit_code = status.code().unwrap_or(1);
            }
            Err(e) => {
                // Reported, but the normal teardown below still runs.
                error!("{:#}", anyhow::Error::new(e));
                exit_code = 1;
            }
        }
    }

    interrupt.teardown_once(&mut guard);

    if let Some(capture) = capture {
        capture.stop();
    }

    let reason = if interrupt.interrupted() {
        TeardownReason::Interrupted
    } else {
        TeardownReason::Completed
    };
    telemetry::audit().log(AuditEvent::Restored { reason });

    // An interrupted run that reached teardown is a success.
    if interrupt.interrupted() {
        exit_code = 0;
    }

    telemetry::audit().log(AuditEvent::RunEnd {
        exit_code,
        duration_sec: started.elapsed().as_secs(),
    });

    Ok(exit_code)
}

/// Current username for audit logging.
fn whoami() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
