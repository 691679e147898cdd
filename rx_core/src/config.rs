//! Configuration file support for rxledger.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/rxledger/config.toml`.

use crate::engine::{PrescriptionEngine, DEFAULT_PROBE_KEY, DEFAULT_REGISTRY_KEY};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Ledger layout configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Ledger file name inside the data directory
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Key holding the prescription registry
    #[serde(default = "default_registry_key")]
    pub registry_key: String,

    /// Key written by `init`
    #[serde(default = "default_probe_key")]
    pub probe_key: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            registry_key: default_registry_key(),
            probe_key: default_probe_key(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("rxledger")
}

fn default_file_name() -> String {
    "ledger.json".into()
}

fn default_registry_key() -> String {
    DEFAULT_REGISTRY_KEY.into()
}

fn default_probe_key() -> String {
    DEFAULT_PROBE_KEY.into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("rxledger").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject layouts where the registry would collide with other keys
    pub fn validate(&self) -> Result<()> {
        let ledger = &self.ledger;
        if ledger.file_name.trim().is_empty() {
            return Err(Error::Config("ledger.file_name must not be empty".into()));
        }
        if ledger.registry_key.is_empty() {
            return Err(Error::Config("ledger.registry_key must not be empty".into()));
        }
        if ledger.registry_key == ledger.probe_key {
            return Err(Error::Config(format!(
                "ledger.registry_key and ledger.probe_key are both {:?}",
                ledger.registry_key
            )));
        }
        Ok(())
    }

    /// Path of the ledger file
    pub fn ledger_path(&self) -> PathBuf {
        self.data.data_dir.join(&self.ledger.file_name)
    }

    /// Engine configured with this ledger layout
    pub fn engine(&self) -> PrescriptionEngine {
        PrescriptionEngine::new(self.ledger.registry_key.clone())
            .with_probe_key(self.ledger.probe_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ledger.registry_key, "_prescriptions");
        assert_eq!(config.ledger.probe_key, "abc");
        assert!(config.ledger_path().ends_with("rxledger/ledger.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.ledger.registry_key = "_rx".into();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.ledger.registry_key, "_rx");
        assert_eq!(loaded.data.data_dir, config.data.data_dir);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[ledger]
registry_key = "_scripts"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ledger.registry_key, "_scripts");
        assert_eq!(config.ledger.file_name, "ledger.json"); // default
        assert_eq!(config.engine().registry_key(), "_scripts");
    }

    #[test]
    fn test_colliding_keys_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[ledger]\nregistry_key = \"abc\"\nprobe_key = \"abc\"\n",
        )
        .unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
