//! Generated Tor configuration snapshot.
//!
//! The daemon runs from a fixed-template torrc regenerated on every run.
//! Nothing from a previous run survives: the file is overwritten on start
//! and removed again if startup fails, so a failed run never leaves the
//! config as its only side effect.

use std::fs;
use std::path::PathBuf;

use super::error::TorError;

/// Path the generated configuration is written to.
pub const TORRC_PATH: &str = "/etc/tor/torrc";

/// Virtual address network Tor maps resolved hosts into.
pub const VIRTUAL_ADDR_NETWORK: &str = "10.0.0.0/10";

/// Local port Tor answers redirected DNS queries on.
pub const DNS_PORT: u16 = 5353;

/// Transparent proxy port redirected TCP lands on.
pub const TRANS_PORT: u16 = 9040;

/// Control port, used as the readiness probe target.
pub const CONTROL_PORT: u16 = 9051;

/// Parameters for the generated Tor configuration.
#[derive(Debug, Clone)]
pub struct TorConfig {
    /// Where the rendered file is written.
    pub path: PathBuf,
    /// Virtual address network for automapped hosts.
    pub virtual_net: String,
    /// DNS redirection port.
    pub dns_port: u16,
    /// Transparent proxy port.
    pub trans_port: u16,
    /// Control port.
    pub control_port: u16,
    /// Restrict exit relays to these country codes (lower-case, no braces).
    pub exit_countries: Vec<String>,
}

impl Default for TorConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(TORRC_PATH),
            virtual_net: VIRTUAL_ADDR_NETWORK.to_string(),
            dns_port: DNS_PORT,
            trans_port: TRANS_PORT,
            control_port: CONTROL_PORT,
            exit_countries: Vec::new(),
        }
    }
}

impl TorConfig {
    /// Parse a comma-separated country list (`us,de`) into the exit-relay
    /// restriction. Empty entries are dropped.
    pub fn set_exit_countries(&mut self, list: &str) {
        self.exit_countries = list
            .split(',')
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
    }

    /// Render the torrc content.
    pub fn render(&self) -> String {
        let mut out = format!(
            "VirtualAddrNetwork {}\n\
             AutomapHostsOnResolve 1\n\
             TransPort {}\n\
             DNSPort {}\n\
             ControlPort {}\n\
             RunAsDaemon 1\n",
            self.virtual_net, self.trans_port, self.dns_port, self.control_port
        );
        if !self.exit_countries.is_empty() {
            out.push_str(&format!("ExitNodes {{{}}}\n", self.exit_countries.join(",")));
        }
        out
    }

    /// Write the rendered configuration to its path, overwriting.
    pub fn write(&self) -> Result<(), TorError> {
        fs::write(&self.path, self.render()).map_err(|e| TorError::ConfigWrite {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Remove the generated configuration. Missing file is fine.
    pub fn remove(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_default_template() {
        let rendered = TorConfig::default().render();
        assert!(rendered.contains("VirtualAddrNetwork 10.0.0.0/10"));
        assert!(rendered.contains("AutomapHostsOnResolve 1"));
        assert!(rendered.contains("TransPort 9040"));
        assert!(rendered.contains("DNSPort 5353"));
        assert!(rendered.contains("ControlPort 9051"));
        assert!(rendered.contains("RunAsDaemon 1"));
        assert!(!rendered.contains("ExitNodes"));
    }

    #[test]
    fn test_render_exit_countries() {
        let mut config = TorConfig::default();
        config.set_exit_countries("US, de,,ch");
        assert_eq!(config.exit_countries, vec!["us", "de", "ch"]);
        assert!(config.render().contains("ExitNodes {us,de,ch}"));
    }

    #[test]
    fn test_write_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let config = TorConfig {
            path: dir.path().join("torrc"),
            ..Default::default()
        };

        config.write().unwrap();
        assert_eq!(fs::read_to_string(&config.path).unwrap(), config.render());

        config.remove();
        assert!(!config.path.exists());

        // Removing again is a no-op.
        config.remove();
    }

    #[test]
    fn test_write_to_missing_directory_errors() {
        let config = TorConfig {
            path: PathBuf::from("/nonexistent-torveil-dir/torrc"),
            ..Default::default()
        };
        assert!(matches!(
            config.write().unwrap_err(),
            TorError::ConfigWrite { .. }
        ));
    }
}
