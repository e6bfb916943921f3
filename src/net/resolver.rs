//! Resolver configuration swap with backup and restore.
//!
//! While a run is anonymized the live resolv.conf points every lookup at
//! 127.0.0.1, where an iptables rule redirects it into Tor's DNSPort. The
//! original file is kept at a fixed sibling backup path for the duration.
//!
//! Backups do not stack: `backup()` overwrites whatever backup a previous
//! run left behind, and `restore()` consumes the backup by renaming it over
//! the live path.

use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::error::ResolverError;

/// Live resolver configuration path.
pub const RESOLV_CONF: &str = "/etc/resolv.conf";

/// Backup path, sibling of the live file.
pub const RESOLV_CONF_BACKUP: &str = "/etc/resolv.conf.bak";

/// What `restore()` found on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The backup was moved back over the live file.
    Restored,
    /// No backup existed; the live file was left as-is.
    BackupMissing,
}

/// Swaps the host resolver configuration for the duration of a run.
pub struct ResolvConf {
    live: PathBuf,
    backup: PathBuf,
    nameserver: String,
}

impl ResolvConf {
    /// Resolver configurator for the standard host paths.
    pub fn new() -> Self {
        Self::at(RESOLV_CONF, RESOLV_CONF_BACKUP, "127.0.0.1")
    }

    /// Resolver configurator over explicit paths (tests use temp files).
    pub fn at(
        live: impl Into<PathBuf>,
        backup: impl Into<PathBuf>,
        nameserver: impl Into<String>,
    ) -> Self {
        Self {
            live: live.into(),
            backup: backup.into(),
            nameserver: nameserver.into(),
        }
    }

    /// Copy the live file to the backup path, overwriting a previous backup.
    pub fn backup(&self) -> Result<(), ResolverError> {
        debug!("Backing up {} to {}", self.live.display(), self.backup.display());
        fs::copy(&self.live, &self.backup).map_err(|e| ResolverError::Backup {
            path: self.live.clone(),
            source: e,
        })?;
        Ok(())
    }

    /// Overwrite the live file with a single entry pointing at the relay's
    /// local DNS redirection address.
    pub fn configure(&self) -> Result<(), ResolverError> {
        let content = format!("nameserver {}\n", self.nameserver);
        fs::write(&self.live, content).map_err(|e| ResolverError::Configure {
            path: self.live.clone(),
            source: e,
        })?;
        info!("Resolver now points at {}", self.nameserver);
        Ok(())
    }

    /// Move the backup back over the live path, consuming it.
    ///
    /// A missing backup is not an error: teardown must keep going, so it is
    /// reported as [`RestoreOutcome::BackupMissing`] and logged.
    pub fn restore(&self) -> Result<RestoreOutcome, ResolverError> {
        if !self.backup.exists() {
            warn!("No resolver backup at {}, leaving live file alone", self.backup.display());
            return Ok(RestoreOutcome::BackupMissing);
        }

        fs::rename(&self.backup, &self.live).map_err(|e| ResolverError::Restore {
            path: self.live.clone(),
            source: e,
        })?;
        info!("Resolver configuration restored");
        Ok(RestoreOutcome::Restored)
    }
}

impl Default for ResolvConf {
    fn default() -> Self {
        Self::new()
    }
}
