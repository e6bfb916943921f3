//! Error types for Tor daemon supervision.

use std::path::PathBuf;
use thiserror::Error;

use crate::net::ExecError;

/// Errors from configuring or supervising the Tor daemon.
#[derive(Debug, Error)]
pub enum TorError {
    /// The dedicated service account does not exist on this host.
    #[error("Service account '{account}' not found. Install the tor package or create the account.")]
    AccountLookup {
        /// The account name that was looked up.
        account: String,
    },

    /// The account database could not be queried.
    #[error("Failed to look up account '{account}': {source}")]
    AccountQuery {
        /// The account name that was looked up.
        account: String,
        /// The underlying errno.
        #[source]
        source: nix::Error,
    },

    /// The generated configuration could not be written.
    #[error("Failed to write Tor configuration {path}: {source}")]
    ConfigWrite {
        /// The configuration path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The daemon binary could not be spawned.
    #[error("Failed to launch tor: {0}")]
    Launch(#[source] std::io::Error),

    /// The daemon launcher exited with an error before daemonizing.
    #[error("tor exited with code {code} during startup")]
    LaunchExit {
        /// The launcher's exit code.
        code: i32,
    },

    /// The daemon never became reachable within the settle window.
    #[error("Tor control port {port} not reachable after {waited_ms} ms")]
    StartTimeout {
        /// The control port that was polled.
        port: u16,
        /// How long the poll ran before giving up.
        waited_ms: u64,
    },

    /// A process-control command failed.
    #[error(transparent)]
    Exec(#[from] ExecError),
}
