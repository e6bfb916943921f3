//! Subcommand handling for torveil.
//!
//! Everything that is not a redirected run lives here, out of main.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

use crate::cli::{Commands, IdentityAction};
use crate::identity::IdentityStore;
use crate::net::SystemExec;
use crate::tor::{TorConfig, TorSupervisor};

/// Handle a parsed subcommand.
pub fn handle(command: Commands) -> Result<()> {
    match command {
        Commands::Identity { action } => handle_identity(action),
    }
}

/// Handle the `identity` subcommand.
///
/// The store itself never touches network state. After the operation a
/// best-effort relay stop clears anything a previous run left behind, but
/// only when running with the privileges to do so.
fn handle_identity(action: IdentityAction) -> Result<()> {
    let store = IdentityStore::new();

    match action {
        IdentityAction::Save { name } => {
            store
                .save(&name)
                .with_context(|| format!("Failed to save identity '{}'", name))?;
            println!("Identity saved as {}", name);
        }
        IdentityAction::Load { name } => {
            let profile = store
                .get(&name)
                .with_context(|| format!("Failed to load identity '{}'", name))?;
            println!("Loaded identity: {} (saved {})", name, profile.timestamp);
        }
        IdentityAction::List => {
            let names = store.list().context("Failed to read identity store")?;
            if names.is_empty() {
                println!("No saved identities found.");
            } else {
                for name in names {
                    println!("Saved identity: {}", name);
                }
            }
        }
    }

    if nix::unistd::geteuid().is_root() {
        debug!("Stopping any stray relay after identity operation");
        TorSupervisor::new(Arc::new(SystemExec), TorConfig::default()).stop();
    }

    Ok(())
}
