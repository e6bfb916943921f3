//! Tor daemon lifecycle management.
//!
//! The supervisor owns the relay process for the duration of a run: it
//! clears any stale instance a previous run left behind, writes the config
//! snapshot, launches the daemon under its dedicated low-privilege account,
//! and waits (bounded) for the control port to come up before declaring
//! the relay live. Stopping is a pattern kill and is idempotent.

use std::net::{Ipv4Addr, SocketAddr, TcpStream};
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nix::unistd::User;
use tracing::{debug, info, warn};

use super::config::TorConfig;
use super::error::TorError;
use crate::net::PrivilegedExec;

/// Name of the unprivileged account the daemon runs under.
pub const TOR_ACCOUNT: &str = "debian-tor";

/// Upper bound on the readiness poll.
const SETTLE_WINDOW: Duration = Duration::from_secs(10);

/// Interval between readiness probes.
const SETTLE_POLL: Duration = Duration::from_millis(250);

/// Manages the Tor daemon for one run.
pub struct TorSupervisor {
    exec: Arc<dyn PrivilegedExec>,
    config: TorConfig,
    account: String,
    settle_window: Duration,
}

impl TorSupervisor {
    /// Supervisor for the standard service account.
    pub fn new(exec: Arc<dyn PrivilegedExec>, config: TorConfig) -> Self {
        Self {
            exec,
            config,
            account: TOR_ACCOUNT.to_string(),
            settle_window: SETTLE_WINDOW,
        }
    }

    /// Override the settle window (tests use a short one).
    pub fn with_settle_window(mut self, window: Duration) -> Self {
        self.settle_window = window;
        self
    }

    /// Resolve the service account's uid and gid.
    pub fn service_ids(&self) -> Result<(u32, u32), TorError> {
        match User::from_name(&self.account) {
            Ok(Some(user)) => Ok((user.uid.as_raw(), user.gid.as_raw())),
            Ok(None) => Err(TorError::AccountLookup {
                account: self.account.clone(),
            }),
            Err(e) => Err(TorError::AccountQuery {
                account: self.account.clone(),
                source: e,
            }),
        }
    }

    /// Bring the relay up. Returns the service account uid so the caller
    /// can exempt relay-owned traffic from redirection.
    ///
    /// On failure everything this call did is unwound: the written config
    /// is removed and any spawned process killed, so aborting callers see
    /// no lingering side effects.
    pub fn start(&self) -> Result<u32, TorError> {
        // Idempotent: clear whatever a previous run left behind.
        self.kill_by_pattern();

        let (uid, gid) = self.service_ids()?;
        self.config.write()?;

        // A distro-managed instance would hold the ports we are about to
        // claim. Not every host runs systemd, so the outcome is advisory.
        if let Err(e) = self.exec.run("systemctl", &["stop", "tor"]) {
            debug!("systemctl stop tor: {}", e);
        }

        info!("Launching tor as uid {} (config {})", uid, self.config.path.display());
        let status = Command::new("tor")
            .arg("-f")
            .arg(&self.config.path)
            .uid(uid)
            .gid(gid)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        // RunAsDaemon makes the launcher fork and exit once the daemon has
        // detached, so this wait is short.
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => {
                self.config.remove();
                return Err(TorError::LaunchExit {
                    code: status.code().unwrap_or(-1),
                });
            }
            Err(e) => {
                self.config.remove();
                return Err(TorError::Launch(e));
            }
        }

        if let Err(e) = self.await_ready() {
            warn!("Tor never became ready: {}", e);
            self.kill_by_pattern();
            self.config.remove();
            return Err(e);
        }

        info!("Tor is live on control port {}", self.config.control_port);
        Ok(uid)
    }

    /// Poll the control port until it accepts a connection or the settle
    /// window runs out.
    fn await_ready(&self) -> Result<(), TorError> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, self.config.control_port));
        let started = Instant::now();

        loop {
            if TcpStream::connect_timeout(&addr, SETTLE_POLL).is_ok() {
                return Ok(());
            }
            if started.elapsed() >= self.settle_window {
                return Err(TorError::StartTimeout {
                    port: self.config.control_port,
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
            std::thread::sleep(SETTLE_POLL);
        }
    }

    /// Terminate the relay. Succeeds silently when nothing is running.
    pub fn stop(&self) {
        self.kill_by_pattern();
    }

    /// Kill any process launched from our config path.
    fn kill_by_pattern(&self) {
        let pattern = format!("tor -f {}", self.config.path.display());
        // pkill exits 1 when nothing matched; that is the idempotent case,
        // so only spawn failures are worth reporting.
        match self.exec.run("pkill", &["-f", &pattern]) {
            Ok(outcome) if outcome.success => debug!("Killed relay matching '{}'", pattern),
            Ok(_) => {}
            Err(e) => warn!("Failed to run pkill: {}", e),
        }
    }
}
