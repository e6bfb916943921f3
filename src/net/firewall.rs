//! iptables NAT and filter redirection rules.
//!
//! The rule set turns the host fail-closed: DNS is redirected into Tor's
//! DNSPort, new outbound TCP into its TransPort, and anything that is neither
//! exempt nor already redirected is rejected.
//!
//! # Rule ordering
//!
//! Rules append in a fixed order and the order is load-bearing. The
//! owner-exemption for the Tor service account MUST be the first NAT rule:
//! once the generic TCP redirect is in place, any Tor-owned packet that is
//! not exempt would be redirected back into Tor itself and loop.
//!
//! `flush()` is the one reset primitive. It runs before `install()` to get a
//! clean baseline and again as `uninstall()` for rollback, so a failed
//! install can always fall back to a known-empty table state.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::error::FirewallError;
use super::exec::PrivilegedExec;

/// Ports the redirection rules target.
#[derive(Debug, Clone, Copy)]
pub struct RedirectPorts {
    /// Local port Tor answers DNS queries on.
    pub dns: u16,
    /// Tor's transparent proxy port for redirected TCP.
    pub trans: u16,
}

impl Default for RedirectPorts {
    fn default() -> Self {
        Self {
            dns: crate::tor::DNS_PORT,
            trans: crate::tor::TRANS_PORT,
        }
    }
}

/// Programs the host packet filter via the `iptables` binary.
pub struct IptablesFirewall {
    exec: Arc<dyn PrivilegedExec>,
    ports: RedirectPorts,
}

impl IptablesFirewall {
    /// Create a firewall programmer shelling out through `exec`.
    pub fn new(exec: Arc<dyn PrivilegedExec>, ports: RedirectPorts) -> Self {
        Self { exec, ports }
    }

    /// Clear the filter, nat and mangle tables plus user-defined chains.
    pub fn flush(&self) -> Result<(), FirewallError> {
        debug!("Flushing iptables tables");
        for args in [
            &["-F"][..],
            &["-t", "nat", "-F"][..],
            &["-t", "mangle", "-F"][..],
            &["-X"][..],
        ] {
            self.exec
                .run_checked("iptables", args)
                .map_err(FirewallError::Flush)?;
        }
        Ok(())
    }

    /// Install the full redirection rule set for a relay running as
    /// `relay_uid`.
    ///
    /// A half-installed set is fail-open, so any step failure rolls the
    /// tables all the way back before the error surfaces.
    pub fn install(&self, relay_uid: u32) -> Result<(), FirewallError> {
        let uid = relay_uid.to_string();
        let dns = self.ports.dns.to_string();
        let trans = self.ports.trans.to_string();

        // NAT: owner exemption first (see module docs), then DNS redirect,
        // loopback exemption, generic TCP redirect. Filter: allow what the
        // NAT rules produce, reject the rest.
        let rules: [&[&str]; 8] = [
            &["-t", "nat", "-A", "OUTPUT", "-m", "owner", "--uid-owner", &uid, "-j", "RETURN"],
            &["-t", "nat", "-A", "OUTPUT", "-p", "udp", "--dport", "53", "-j", "REDIRECT", "--to-ports", &dns],
            &["-t", "nat", "-A", "OUTPUT", "-d", "127.0.0.0/8", "-j", "RETURN"],
            &["-t", "nat", "-A", "OUTPUT", "-p", "tcp", "--syn", "-j", "REDIRECT", "--to-ports", &trans],
            &["-A", "OUTPUT", "-m", "state", "--state", "ESTABLISHED,RELATED", "-j", "ACCEPT"],
            &["-A", "OUTPUT", "-d", "127.0.0.0/8", "-j", "ACCEPT"],
            &["-A", "OUTPUT", "-m", "owner", "--uid-owner", &uid, "-j", "ACCEPT"],
            &["-A", "OUTPUT", "-j", "REJECT"],
        ];

        for rule in rules {
            if let Err(e) = self.exec.run_checked("iptables", rule) {
                warn!("Rule install failed, rolling back: {}", e);
                if let Err(rollback) = self.uninstall() {
                    warn!("Rollback after failed install also failed: {}", rollback);
                }
                return Err(FirewallError::RuleInstall {
                    rule: rule.join(" "),
                    source: e,
                });
            }
        }

        info!("iptables redirection rules installed (relay uid {})", relay_uid);
        Ok(())
    }

    /// Remove everything `install()` created. Equivalent to `flush()` and
    /// safe to call at any point, installed or not.
    pub fn uninstall(&self) -> Result<(), FirewallError> {
        self.flush()
    }
}
