//! Syslog sink for audit events.

use std::sync::{Mutex, OnceLock};

use syslog::{Facility, Formatter3164};
use tracing::{debug, error};

use super::error::TelemetryError;
use super::events::AuditEvent;

/// Syslog tag for all audit events.
pub const SYSLOG_TAG: &str = "TORVEIL";

/// Global audit logger instance.
static AUDIT_LOGGER: OnceLock<AuditLogger> = OnceLock::new();

/// Audit logger that writes structured JSON events to syslog.
///
/// Held in a global `OnceLock`, so the writer sits behind a mutex for
/// interior mutability. A `None` writer is the null logger used by tests
/// and by hosts without a syslog daemon.
pub struct AuditLogger {
    writer: Option<Mutex<syslog::Logger<syslog::LoggerBackend, Formatter3164>>>,
}

impl AuditLogger {
    /// Connect to the local syslog daemon.
    pub fn new() -> Result<Self, TelemetryError> {
        let formatter = Formatter3164 {
            facility: Facility::LOG_USER,
            hostname: None,
            process: SYSLOG_TAG.to_string(),
            pid: std::process::id(),
        };

        let writer = syslog::unix(formatter)
            .map_err(|e| TelemetryError::SyslogConnection(e.to_string()))?;

        debug!("Connected to syslog with tag '{}'", SYSLOG_TAG);
        Ok(Self {
            writer: Some(Mutex::new(writer)),
        })
    }

    /// A logger that discards every event.
    pub fn new_null() -> Self {
        Self { writer: None }
    }

    /// Whether this is a null logger.
    pub fn is_null(&self) -> bool {
        self.writer.is_none()
    }

    /// Serialize `event` with a timestamp and write it at INFO level.
    ///
    /// Logging must never take a run down, so every failure in here is
    /// reported on stderr and swallowed.
    pub fn log(&self, event: AuditEvent) {
        let Some(ref writer) = self.writer else {
            return;
        };

        let json = match serde_json::to_string(&event.with_timestamp()) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize audit event: {}", e);
                return;
            }
        };

        match writer.lock() {
            Ok(mut writer) => {
                if let Err(e) = writer.info(&json) {
                    error!("Failed to write to syslog: {}", e);
                }
            }
            Err(e) => error!("Failed to acquire syslog writer lock: {}", e),
        }
    }
}

/// Initialize the global audit logger against syslog.
pub fn init_logger() -> Result<(), TelemetryError> {
    let logger = AuditLogger::new()?;
    AUDIT_LOGGER
        .set(logger)
        .map_err(|_| TelemetryError::AlreadyInitialized)
}

/// Initialize the global audit logger as a null logger.
///
/// Fallback for hosts without a reachable syslog daemon; a missing audit
/// sink should not block a run.
pub fn init_null_logger() {
    let _ = AUDIT_LOGGER.set(AuditLogger::new_null());
}

/// Get the global audit logger, falling back to a null logger if neither
/// `init_logger` nor `init_null_logger` ran.
pub fn audit() -> &'static AuditLogger {
    AUDIT_LOGGER.get_or_init(AuditLogger::new_null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syslog_tag() {
        assert_eq!(SYSLOG_TAG, "TORVEIL");
    }

    #[test]
    fn test_null_logger_discards() {
        let logger = AuditLogger::new_null();
        assert!(logger.is_null());
        // Must not panic.
        logger.log(AuditEvent::RunEnd {
            exit_code: 0,
            duration_sec: 0,
        });
    }

    #[test]
    #[ignore = "Requires running syslog daemon"]
    fn test_logger_creation() {
        assert!(AuditLogger::new().is_ok());
    }
}
