//! Atomic start/stop transitions over the host network state.
//!
//! `StateGuard` is the only place the host moves between its two network
//! states. The backends it drives are injected as traits so the transition
//! logic can be exercised against fakes; the real implementations are
//! [`crate::net::IptablesFirewall`], [`crate::net::ResolvConf`] and
//! [`crate::tor::TorSupervisor`].
//!
//! # Ordering
//!
//! Going up: resolver backup, resolver configure, relay start, firewall
//! flush, firewall install. The relay must be live before any rule exists:
//! rules redirect traffic into it, and fail-closed rules without a relay
//! would black-hole the host. Coming down runs the reverse: rules out first
//! (traffic flows normally again), relay stopped, resolver restored.

use thiserror::Error;
use tracing::{info, warn};

use crate::net::{FirewallError, ResolverError, RestoreOutcome};
use crate::tor::TorError;

/// Host network state as seen by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    /// Original host configuration.
    Normal,
    /// Resolver and firewall redirect everything through the relay.
    Anonymized,
}

/// Firewall backend driven by the guard.
pub trait Firewall {
    /// Clear all tables back to the clean baseline.
    fn flush(&self) -> Result<(), FirewallError>;

    /// Install the redirection rule set, exempting traffic owned by
    /// `relay_uid`. Implementations roll back on partial failure.
    fn install(&self, relay_uid: u32) -> Result<(), FirewallError>;

    /// Remove everything `install()` created.
    fn uninstall(&self) -> Result<(), FirewallError>;
}

/// Resolver backend driven by the guard.
pub trait Resolver {
    /// Snapshot the live configuration.
    fn backup(&self) -> Result<(), ResolverError>;

    /// Point the live configuration at the relay's DNS port.
    fn configure(&self) -> Result<(), ResolverError>;

    /// Put the snapshot back, consuming it.
    fn restore(&self) -> Result<RestoreOutcome, ResolverError>;
}

/// Relay backend driven by the guard.
pub trait Relay {
    /// Bring the relay up; returns the service account uid whose traffic
    /// the firewall must exempt.
    fn start(&self) -> Result<u32, TorError>;

    /// Take the relay down. Idempotent.
    fn stop(&self);
}

impl Firewall for crate::net::IptablesFirewall {
    fn flush(&self) -> Result<(), FirewallError> {
        Self::flush(self)
    }
    fn install(&self, relay_uid: u32) -> Result<(), FirewallError> {
        Self::install(self, relay_uid)
    }
    fn uninstall(&self) -> Result<(), FirewallError> {
        Self::uninstall(self)
    }
}

impl Resolver for crate::net::ResolvConf {
    fn backup(&self) -> Result<(), ResolverError> {
        Self::backup(self)
    }
    fn configure(&self) -> Result<(), ResolverError> {
        Self::configure(self)
    }
    fn restore(&self) -> Result<RestoreOutcome, ResolverError> {
        Self::restore(self)
    }
}

impl Relay for crate::tor::TorSupervisor {
    fn start(&self) -> Result<u32, TorError> {
        Self::start(self)
    }
    fn stop(&self) {
        Self::stop(self)
    }
}

/// Errors surfaced by a failed `start()` transition.
///
/// By the time one of these is returned, every step that had already been
/// applied has been unwound.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Resolver backup or configure failed.
    #[error(transparent)]
    Resolver(#[from] ResolverError),

    /// The relay failed to come up.
    #[error(transparent)]
    Relay(#[from] TorError),

    /// The firewall rules could not be installed.
    #[error(transparent)]
    Firewall(#[from] FirewallError),
}

/// Composes the firewall, resolver and relay into atomic transitions.
pub struct StateGuard<F, R, T>
where
    F: Firewall,
    R: Resolver,
    T: Relay,
{
    firewall: F,
    resolver: R,
    relay: T,
    state: NetworkState,
}

impl<F, R, T> StateGuard<F, R, T>
where
    F: Firewall,
    R: Resolver,
    T: Relay,
{
    /// Build a guard in the `Normal` state.
    pub fn new(firewall: F, resolver: R, relay: T) -> Self {
        Self {
            firewall,
            resolver,
            relay,
            state: NetworkState::Normal,
        }
    }

    /// Current state.
    pub fn state(&self) -> NetworkState {
        self.state
    }

    /// Transition `Normal` → `Anonymized`.
    ///
    /// Any step failure unwinds the steps already applied before the error
    /// surfaces, so a failed start leaves the host as it was found, with
    /// one deliberate exception: if overwriting the live resolver fails,
    /// the backup made just before stays on disk for a future run instead
    /// of being consumed by a restore over a file of unknown content.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.resolver.backup()?;
        self.resolver.configure()?;

        let relay_uid = match self.relay.start() {
            Ok(uid) => uid,
            Err(e) => {
                // No rules exist yet; only the resolver needs undoing.
                self.restore_resolver();
                return Err(e.into());
            }
        };

        if let Err(e) = self.flush_then_install(relay_uid) {
            self.relay.stop();
            self.restore_resolver();
            return Err(e);
        }

        self.state = NetworkState::Anonymized;
        info!("Network state: anonymized");
        Ok(())
    }

    fn flush_then_install(&self, relay_uid: u32) -> Result<(), EngineError> {
        // Clean baseline first so install appends onto empty tables.
        self.firewall.flush()?;
        // install() rolls its own partial work back on failure.
        self.firewall.install(relay_uid)?;
        Ok(())
    }

    /// Transition back to `Normal`.
    ///
    /// Every step is individually idempotent and failures are logged rather
    /// than returned: teardown must always run to completion, and calling
    /// it again is safe.
    pub fn stop(&mut self) {
        if let Err(e) = self.firewall.uninstall() {
            warn!("Failed to remove firewall rules: {}", e);
        }
        self.relay.stop();
        self.restore_resolver();

        self.state = NetworkState::Normal;
        info!("Network state: normal");
    }

    fn restore_resolver(&self) {
        match self.resolver.restore() {
            Ok(RestoreOutcome::Restored) => {}
            Ok(RestoreOutcome::BackupMissing) => {
                warn!("Resolver backup missing, nothing to restore");
            }
            Err(e) => warn!("Failed to restore resolver: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Shared journal of backend calls, in order.
    type Journal = Arc<Mutex<Vec<&'static str>>>;

    struct FakeFirewall {
        journal: Journal,
        fail_install: bool,
    }

    impl Firewall for FakeFirewall {
        fn flush(&self) -> Result<(), FirewallError> {
            self.journal.lock().unwrap().push("fw.flush");
            Ok(())
        }
        fn install(&self, _relay_uid: u32) -> Result<(), FirewallError> {
            if self.fail_install {
                // Mirrors the real implementation: rollback runs before the
                // error is returned.
                self.journal.lock().unwrap().push("fw.rollback");
                return Err(FirewallError::RuleInstall {
                    rule: "-A OUTPUT -j REJECT".to_string(),
                    source: crate::net::ExecError::CommandFailed {
                        cmd: "iptables".to_string(),
                        stderr: "injected".to_string(),
                    },
                });
            }
            self.journal.lock().unwrap().push("fw.install");
            Ok(())
        }
        fn uninstall(&self) -> Result<(), FirewallError> {
            self.journal.lock().unwrap().push("fw.uninstall");
            Ok(())
        }
    }

    struct FakeResolver {
        journal: Journal,
        backed_up: AtomicBool,
    }

    impl Resolver for FakeResolver {
        fn backup(&self) -> Result<(), ResolverError> {
            self.journal.lock().unwrap().push("resolver.backup");
            self.backed_up.store(true, Ordering::SeqCst);
            Ok(())
        }
        fn configure(&self) -> Result<(), ResolverError> {
            self.journal.lock().unwrap().push("resolver.configure");
            Ok(())
        }
        fn restore(&self) -> Result<RestoreOutcome, ResolverError> {
            self.journal.lock().unwrap().push("resolver.restore");
            if self.backed_up.swap(false, Ordering::SeqCst) {
                Ok(RestoreOutcome::Restored)
            } else {
                Ok(RestoreOutcome::BackupMissing)
            }
        }
    }

    struct FakeRelay {
        journal: Journal,
        fail_start: bool,
    }

    impl Relay for FakeRelay {
        fn start(&self) -> Result<u32, TorError> {
            if self.fail_start {
                return Err(TorError::StartTimeout {
                    port: 9051,
                    waited_ms: 10_000,
                });
            }
            self.journal.lock().unwrap().push("relay.start");
            Ok(108)
        }
        fn stop(&self) {
            self.journal.lock().unwrap().push("relay.stop");
        }
    }

    fn guard(
        fail_install: bool,
        fail_start: bool,
    ) -> (Journal, StateGuard<FakeFirewall, FakeResolver, FakeRelay>) {
        let journal: Journal = Arc::new(Mutex::new(Vec::new()));
        let guard = StateGuard::new(
            FakeFirewall {
                journal: journal.clone(),
                fail_install,
            },
            FakeResolver {
                journal: journal.clone(),
                backed_up: AtomicBool::new(false),
            },
            FakeRelay {
                journal: journal.clone(),
                fail_start,
            },
        );
        (journal, guard)
    }

    #[test]
    fn test_start_sequences_resolver_relay_rules() {
        let (journal, mut guard) = guard(false, false);
        guard.start().unwrap();

        assert_eq!(guard.state(), NetworkState::Anonymized);
        assert_eq!(
            *journal.lock().unwrap(),
            vec![
                "resolver.backup",
                "resolver.configure",
                "relay.start",
                "fw.flush",
                "fw.install",
            ]
        );
    }

    #[test]
    fn test_stop_reverses_in_order() {
        let (journal, mut guard) = guard(false, false);
        guard.start().unwrap();
        journal.lock().unwrap().clear();

        guard.stop();
        assert_eq!(guard.state(), NetworkState::Normal);
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["fw.uninstall", "relay.stop", "resolver.restore"]
        );
    }

    #[test]
    fn test_relay_failure_installs_no_rules_and_restores_resolver() {
        let (journal, mut guard) = guard(false, true);
        let err = guard.start().unwrap_err();

        assert!(matches!(err, EngineError::Relay(_)));
        assert_eq!(guard.state(), NetworkState::Normal);

        let journal = journal.lock().unwrap();
        assert!(!journal.iter().any(|op| op.starts_with("fw.")));
        assert_eq!(*journal.last().unwrap(), "resolver.restore");
    }

    #[test]
    fn test_install_failure_stops_relay_and_restores_resolver() {
        let (journal, mut guard) = guard(true, false);
        let err = guard.start().unwrap_err();

        assert!(matches!(err, EngineError::Firewall(_)));
        let journal = journal.lock().unwrap();
        assert!(journal.contains(&"relay.stop"));
        assert_eq!(*journal.last().unwrap(), "resolver.restore");
    }

    #[test]
    fn test_stop_twice_equals_stop_once() {
        let (journal, mut guard) = guard(false, false);
        guard.start().unwrap();

        guard.stop();
        let after_first: Vec<_> = journal.lock().unwrap().clone();

        guard.stop();
        assert_eq!(guard.state(), NetworkState::Normal);

        // The second stop runs the same idempotent steps; the resolver
        // reports its backup missing instead of failing.
        let after_second = journal.lock().unwrap();
        assert_eq!(after_second.len(), after_first.len() + 3);
    }
}
