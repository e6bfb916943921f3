//! Telemetry error types.

use thiserror::Error;

/// Errors from audit logging setup.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to connect to the local syslog daemon.
    #[error("Failed to connect to syslog: {0}")]
    SyslogConnection(String),

    /// The global logger was initialized twice.
    #[error("Audit logger already initialized")]
    AlreadyInitialized,
}
