//! Named identity profiles persisted across runs.
//!
//! A thin JSON store keyed by profile name. Profiles only record when they
//! were saved; the store never touches network state. The subcommand layer
//! decides when a relay teardown accompanies a store operation.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default store location, next to the Tor configuration.
pub const IDENTITY_STORE_PATH: &str = "/etc/tor/identities.json";

/// Errors from the identity store.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The store file could not be read.
    #[error("Failed to read identity store {path}: {source}")]
    Read {
        /// Store path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The store file could not be written.
    #[error("Failed to write identity store {path}: {source}")]
    Write {
        /// Store path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The store file is not valid JSON.
    #[error("Identity store {path} is corrupt: {source}")]
    Parse {
        /// Store path.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// No profile with the given name.
    #[error("Identity '{name}' not found")]
    NotFound {
        /// The requested profile name.
        name: String,
    },
}

/// A saved identity profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProfile {
    /// When the profile was saved.
    pub timestamp: DateTime<Utc>,
}

/// File-backed identity store.
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    /// Store at the standard location.
    pub fn new() -> Self {
        Self::at(IDENTITY_STORE_PATH)
    }

    /// Store at an explicit path (tests use temp files).
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<BTreeMap<String, IdentityProfile>, IdentityError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(IdentityError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        serde_json::from_str(&content).map_err(|e| IdentityError::Parse {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Save (or overwrite) a profile under `name`.
    pub fn save(&self, name: &str) -> Result<(), IdentityError> {
        let mut profiles = self.load()?;
        profiles.insert(
            name.to_string(),
            IdentityProfile {
                timestamp: Utc::now(),
            },
        );

        let json = serde_json::to_string_pretty(&profiles).map_err(|e| IdentityError::Parse {
            path: self.path.clone(),
            source: e,
        })?;
        fs::write(&self.path, json).map_err(|e| IdentityError::Write {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Fetch a profile by name.
    pub fn get(&self, name: &str) -> Result<IdentityProfile, IdentityError> {
        self.load()?
            .remove(name)
            .ok_or_else(|| IdentityError::NotFound {
                name: name.to_string(),
            })
    }

    /// All saved profile names, sorted.
    pub fn list(&self) -> Result<Vec<String>, IdentityError> {
        Ok(self.load()?.into_keys().collect())
    }
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, IdentityStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = IdentityStore::at(dir.path().join("identities.json"));
        (dir, store)
    }

    #[test]
    fn test_empty_store_lists_nothing() {
        let (_dir, store) = store();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_get() {
        let (_dir, store) = store();
        store.save("home").unwrap();

        let profile = store.get("home").unwrap();
        assert!(profile.timestamp <= Utc::now());
    }

    #[test]
    fn test_get_missing_profile() {
        let (_dir, store) = store();
        assert!(matches!(
            store.get("nope").unwrap_err(),
            IdentityError::NotFound { .. }
        ));
    }

    #[test]
    fn test_list_is_sorted() {
        let (_dir, store) = store();
        store.save("zeta").unwrap();
        store.save("alpha").unwrap();
        assert_eq!(store.list().unwrap(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_save_overwrites_existing() {
        let (_dir, store) = store();
        store.save("home").unwrap();
        let first = store.get("home").unwrap();

        store.save("home").unwrap();
        let second = store.get("home").unwrap();

        assert!(second.timestamp >= first.timestamp);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_store_is_reported() {
        let (_dir, store) = store();
        fs::write(&store.path, "not json").unwrap();
        assert!(matches!(
            store.list().unwrap_err(),
            IdentityError::Parse { .. }
        ));
    }
}
