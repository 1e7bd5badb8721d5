//! Token persistence.
//!
//! The API token lives in a small JSON file under the user's home directory
//! (`~/.chatexec/token.json`). Loading is tolerant: a missing or unreadable
//! file just means an empty config. Saving reports its errors so a freshly
//! supplied `--token` is never silently lost.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CONFIG_DIR: &str = ".chatexec";
pub const CONFIG_FILE: &str = "token.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub token: String,
}

impl Config {
    /// Default location: `~/.chatexec/token.json`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR)
            .join(CONFIG_FILE)
    }

    /// Load from `path`, falling back to defaults on any error.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(config) => config,
                Err(e) => {
                    warn!("ignoring malformed config {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                debug!("no config at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Persist to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let raw = serde_json::to_string(self)?;
        std::fs::write(path, raw).with_context(|| format!("writing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("token.json");

        let config = Config {
            token: "xoxb-secret".to_string(),
        };
        config.save(&path).expect("save");

        let loaded = Config::load(&path);
        assert_eq!(loaded.token, "xoxb-secret");
    }

    #[test]
    fn test_missing_file_loads_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = Config::load(&dir.path().join("absent.json"));
        assert!(loaded.token.is_empty());
    }

    #[test]
    fn test_malformed_file_loads_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{not json").expect("write");
        let loaded = Config::load(&path);
        assert!(loaded.token.is_empty());
    }
}
