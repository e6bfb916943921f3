//! The network state-transition engine.
//!
//! Two small pieces with strict contracts:
//!
//! - [`StateGuard`] sequences the privileged mutations that move the host
//!   between its normal and anonymized network states, unwinding partial
//!   work on any failure.
//! - [`InterruptGuard`] guarantees that teardown runs exactly once even
//!   when a SIGINT races the normal completion path.
//!
//! Concurrent overlapping runs on one host are unsupported: the firewall
//! tables and resolver file are exclusively owned for a run's lifetime,
//! and a second run's behavior is undefined.

pub mod guard;
pub mod interrupt;

pub use guard::{EngineError, Firewall, NetworkState, Relay, Resolver, StateGuard};
pub use interrupt::InterruptGuard;
