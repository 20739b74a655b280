// Store configuration
// Loaded from an optional JSON file, then overridden from the environment.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the database path
pub const DB_ENV: &str = "MEETING_STORE_DB";
/// Environment variable overriding the log filter
pub const LOG_ENV: &str = "MEETING_STORE_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    pub database_path: PathBuf,
    /// Enforce foreign keys on every connection
    pub foreign_keys: bool,
    /// How long SQLite waits on a locked database
    pub busy_timeout_ms: u64,
    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            foreign_keys: true,
            busy_timeout_ms: 5000,
            log_level: "info".to_string(),
        }
    }
}

/// `<data_dir>/meeting-store/meetings.db`, relative to the working directory when
/// the platform has no data directory
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("meeting-store")
        .join("meetings.db")
}

impl StoreConfig {
    /// Read a JSON config file; missing fields take their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: StoreConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Defaults or the given file, with environment overrides applied
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides looked up by variable name
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(DB_ENV).filter(|p| !p.is_empty()) {
            self.database_path = PathBuf::from(path);
        }
        if let Some(level) = lookup(LOG_ENV).filter(|l| !l.is_empty()) {
            self.log_level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            bail!("databasePath must not be empty");
        }
        if self.log_level.trim().is_empty() {
            bail!("logLevel must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert!(config.foreign_keys);
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.log_level, "info");
        assert!(config.database_path.ends_with("meeting-store/meetings.db"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, r#"{"databasePath": "/tmp/m.db", "busyTimeoutMs": 250}"#).unwrap();

        let config = StoreConfig::from_file(&path).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/m.db"));
        assert_eq!(config.busy_timeout_ms, 250);
        assert!(config.foreign_keys);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_bad_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(StoreConfig::from_file(&path).is_err());
        assert!(StoreConfig::from_file(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = StoreConfig::default();
        config.apply_overrides(|key| match key {
            DB_ENV => Some("/var/lib/meetings.db".to_string()),
            LOG_ENV => Some("debug".to_string()),
            _ => None,
        });
        assert_eq!(config.database_path, PathBuf::from("/var/lib/meetings.db"));
        assert_eq!(config.log_level, "debug");

        // Empty values are ignored
        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_validate() {
        let mut config = StoreConfig::default();
        assert!(config.validate().is_ok());
        config.database_path = PathBuf::new();
        assert!(config.validate().is_err());
    }
}
