//! Command-line interface definitions for torveil.
//!
//! Uses clap's derive API for type-safe argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Transparent Tor routing for a single command.
///
/// torveil rewrites the host resolver and firewall so that every connection
/// the wrapped command makes leaves through the Tor network, then restores
/// the original configuration when the command exits, including when the
/// run is interrupted.
#[derive(Parser, Debug)]
#[command(name = "torveil")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to run (or omit to execute a command under redirection).
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Command to execute under Tor redirection.
    ///
    /// Everything after the options is passed through unmodified. With
    /// --rotate, each argument is instead treated as a complete command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub child: Vec<String>,

    /// Restrict Tor exit relays to these countries.
    ///
    /// Comma-separated two-letter codes, e.g. "us,de".
    #[arg(long = "exit-countries", value_name = "LIST")]
    pub exit_countries: Option<String>,

    /// Write a packet capture of the whole run to this file.
    #[arg(long = "capture", value_name = "PATH")]
    pub capture: Option<PathBuf>,

    /// Treat each trailing argument as a complete command and run them in
    /// sequence, renegotiating the Tor circuit between commands.
    #[arg(long = "rotate")]
    pub rotate: bool,

    /// Increase log verbosity.
    ///
    /// Can be specified multiple times:
    /// -v    = info level
    /// -vv   = debug level
    /// -vvv  = trace level
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Subcommands for torveil.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage saved identity profiles.
    Identity {
        /// Identity store operation.
        #[command(subcommand)]
        action: IdentityAction,
    },
}

/// Identity store operations.
#[derive(Subcommand, Debug)]
pub enum IdentityAction {
    /// Save the current identity under a profile name.
    Save {
        /// Profile name.
        name: String,
    },
    /// Load a saved identity profile.
    Load {
        /// Profile name.
        name: String,
    },
    /// List saved identity profiles.
    List,
}

impl Cli {
    /// The command(s) to run, as argv vectors.
    ///
    /// Normally the trailing arguments form a single argv. In rotate mode
    /// each trailing argument is whitespace-split into its own command;
    /// empty entries are dropped.
    pub fn sequence(&self) -> Vec<Vec<String>> {
        if self.rotate {
            self.child
                .iter()
                .map(|entry| {
                    entry
                        .split_whitespace()
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .filter(|argv| !argv.is_empty())
                .collect()
        } else if self.child.is_empty() {
            Vec::new()
        } else {
            vec![self.child.clone()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_command() {
        let cli = Cli::parse_from(["torveil", "curl", "https://example.org"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.child, vec!["curl", "https://example.org"]);
        assert!(!cli.rotate);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn test_parse_child_flags_pass_through() {
        let cli = Cli::parse_from(["torveil", "curl", "-s", "https://example.org"]);
        assert_eq!(cli.child, vec!["curl", "-s", "https://example.org"]);
    }

    #[test]
    fn test_parse_options() {
        let cli = Cli::parse_from([
            "torveil",
            "--exit-countries",
            "us,de",
            "--capture",
            "/tmp/run.pcap",
            "-vv",
            "wget",
            "example.org",
        ]);

        assert_eq!(cli.exit_countries.as_deref(), Some("us,de"));
        assert_eq!(cli.capture, Some(PathBuf::from("/tmp/run.pcap")));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.child, vec!["wget", "example.org"]);
    }

    #[test]
    fn test_sequence_single_command() {
        let cli = Cli::parse_from(["torveil", "echo", "hi"]);
        assert_eq!(cli.sequence(), vec![vec!["echo", "hi"]]);
    }

    #[test]
    fn test_sequence_empty() {
        let cli = Cli::parse_from(["torveil"]);
        assert!(cli.sequence().is_empty());
    }

    #[test]
    fn test_sequence_rotate_splits_each_argument() {
        let cli = Cli::parse_from(["torveil", "--rotate", "curl -s example.org", "echo done"]);
        assert_eq!(
            cli.sequence(),
            vec![vec!["curl", "-s", "example.org"], vec!["echo", "done"]]
        );
    }

    #[test]
    fn test_identity_subcommands() {
        let cli = Cli::parse_from(["torveil", "identity", "save", "work"]);
        match cli.command {
            Some(Commands::Identity {
                action: IdentityAction::Save { name },
            }) => assert_eq!(name, "work"),
            _ => panic!("Expected identity save"),
        }

        let cli = Cli::parse_from(["torveil", "identity", "list"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Identity {
                action: IdentityAction::List
            })
        ));
    }
}
