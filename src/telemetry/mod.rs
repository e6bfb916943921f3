//! Audit logging for torveil.
//!
//! Runs that rewrite a host's firewall and resolver deserve a trail. Every
//! state transition is logged as structured JSON to syslog under the
//! `TORVEIL` tag, separate from the `tracing` diagnostics on stderr: the
//! audit trail is for the host's records, the diagnostics for the operator
//! at the terminal.
//!
//! ```json
//! {"ts":"2026-08-06T14:32:01Z","event":"run_start","user":"root","command":["curl","https://example.org"],"pid":4242}
//! ```

mod error;
mod events;
mod syslog;

pub use error::TelemetryError;
pub use events::{AuditEvent, TeardownReason};
pub use syslog::{audit, init_logger, init_null_logger, AuditLogger, SYSLOG_TAG};
