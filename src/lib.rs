//! torveil: transparent Tor routing for a single command.
//!
//! torveil runs an arbitrary command with all of its network traffic forced
//! through Tor. For the duration of the command the host resolver points at
//! Tor's DNSPort, iptables NAT rules redirect new outbound TCP into Tor's
//! TransPort, and a fail-closed filter rejects everything that is neither
//! exempt nor redirected. When the command exits, or the run is
//! interrupted, the original configuration is restored.
//!
//! # Architecture
//!
//! - **engine**: the state-transition core. `StateGuard` sequences the
//!   privileged mutations with unwind-on-failure; `InterruptGuard` makes
//!   teardown exactly-once under SIGINT.
//! - **net**: iptables rule programming and resolv.conf swapping, behind
//!   the `PrivilegedExec` seam for testability.
//! - **tor**: torrc generation and daemon supervision with a bounded
//!   readiness poll on the control port.
//! - **runner**: child command execution with inherited stdio.
//! - **identity / capture**: profile persistence and tcpdump bracketing,
//!   layered beside the engine without participating in its invariants.
//! - **telemetry**: structured audit events to syslog.
//!
//! # Limitations
//!
//! One run per host at a time: the firewall tables and resolver file are
//! exclusively owned for the run's lifetime, and concurrent runs are
//! undefined behavior by design.

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod capture;
pub mod cli;
pub mod cli_handler;
pub mod engine;
pub mod identity;
pub mod net;
pub mod orchestrator;
pub mod preflight;
pub mod runner;
pub mod telemetry;
pub mod tor;
