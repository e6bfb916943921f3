//! Host checks performed before any privileged state change.
//!
//! Everything here must pass before the first mutation: a run that aborts
//! in preflight has touched nothing: no backup, no relay, no rules.

use std::path::Path;
use thiserror::Error;
use which::which;

use crate::net::RESOLV_CONF;

/// Errors that abort the run before any state change.
#[derive(Debug, Error)]
pub enum PreflightError {
    /// Not running with elevated privileges.
    #[error("torveil must be run as root")]
    Privilege,

    /// A required host binary is missing.
    #[error("Required binary '{binary}' not found in PATH")]
    MissingBinary {
        /// The binary that could not be found.
        binary: String,
    },

    /// A required host file is missing.
    #[error("Required file {path} not found")]
    MissingFile {
        /// The file that was expected.
        path: String,
    },
}

/// Binaries the run shells out to.
const REQUIRED_BINARIES: &[&str] = &["tor", "iptables"];

/// Verify privileges and host prerequisites.
pub fn check() -> Result<(), PreflightError> {
    verify(
        nix::unistd::geteuid().is_root(),
        REQUIRED_BINARIES,
        Path::new(RESOLV_CONF),
    )
}

fn verify(
    privileged: bool,
    binaries: &[&str],
    resolv_conf: &Path,
) -> Result<(), PreflightError> {
    if !privileged {
        return Err(PreflightError::Privilege);
    }

    for binary in binaries {
        which(binary).map_err(|_| PreflightError::MissingBinary {
            binary: binary.to_string(),
        })?;
    }

    if !resolv_conf.exists() {
        return Err(PreflightError::MissingFile {
            path: resolv_conf.display().to_string(),
        });
    }

    Ok(())
}
