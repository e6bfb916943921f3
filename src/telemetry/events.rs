//! Audit event types for structured logging.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Audit events emitted over a run's lifetime.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A redirected run started.
    RunStart {
        /// User who launched the run.
        user: String,
        /// The child command argv.
        command: Vec<String>,
        /// Process ID of the orchestrator.
        pid: u32,
    },

    /// A circuit rotation between sequenced commands.
    CircuitRotate {
        /// 1-based index of the command about to run.
        command_index: usize,
    },

    /// Teardown completed; the host is back in its original state.
    Restored {
        /// Why teardown ran.
        reason: TeardownReason,
    },

    /// The run finished.
    RunEnd {
        /// Exit code the process terminates with.
        exit_code: i32,
        /// Wall-clock duration of the run in seconds.
        duration_sec: u64,
    },
}

/// Why teardown ran.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownReason {
    /// The child command completed.
    Completed,
    /// An interrupt was delivered during the run.
    Interrupted,
    /// Bringing redirection online failed and partial work was unwound.
    StartFailure,
}

/// Wrapper for serializing events with a timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct TimestampedEvent<'a> {
    /// ISO8601 timestamp.
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,

    /// The actual event, flattened into this struct.
    #[serde(flatten)]
    pub event: &'a AuditEvent,
}

impl AuditEvent {
    /// Wrap this event with a timestamp for serialization.
    pub fn with_timestamp(&self) -> TimestampedEvent<'_> {
        TimestampedEvent {
            timestamp: Utc::now(),
            event: self,
        }
    }
}
