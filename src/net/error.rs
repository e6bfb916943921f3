//! Error types for host network mutation.

use std::path::PathBuf;
use thiserror::Error;

use super::exec::ExecError;

/// Errors from programming the packet filter.
#[derive(Debug, Error)]
pub enum FirewallError {
    /// A table flush command failed.
    #[error("Failed to flush firewall tables: {0}")]
    Flush(#[source] ExecError),

    /// A redirection rule could not be installed. By the time this surfaces
    /// the partially-applied set has already been rolled back.
    #[error("Failed to install rule '{rule}': {source}")]
    RuleInstall {
        /// The iptables rule arguments that failed.
        rule: String,
        /// The underlying command error.
        #[source]
        source: ExecError,
    },
}

/// Errors from resolver reconfiguration.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// The live resolver file could not be copied to the backup path.
    #[error("Failed to back up {path}: {source}")]
    Backup {
        /// The live resolver path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The live resolver file could not be rewritten.
    #[error("Failed to write {path}: {source}")]
    Configure {
        /// The live resolver path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The backup could not be moved back over the live path.
    #[error("Failed to restore {path}: {source}")]
    Restore {
        /// The live resolver path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
