//! Configuration loading and validation

use anyhow::{Context, Result};
use keybridge_device::{DebugDeviceSource, Enumerator};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub debug_device: DebugDeviceConfig,
}

/// Software debug device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugDeviceConfig {
    /// Expose the debug device alongside real hardware
    #[serde(default)]
    pub enabled: bool,
    /// BIP32 seed as hex
    #[serde(default = "default_seed")]
    pub seed: String,
    /// Network used for extended key prefixes (bitcoin, testnet, signet, regtest)
    #[serde(default = "default_network")]
    pub network: String,
}

impl Default for DebugDeviceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            seed: default_seed(),
            network: default_network(),
        }
    }
}

fn default_seed() -> String {
    // BIP32 test vector 1
    "000102030405060708090a0b0c0d0e0f".to_string()
}

fn default_network() -> String {
    "bitcoin".to_string()
}

impl Config {
    /// Build the device enumerator described by this configuration
    pub fn build_enumerator(&self) -> Result<Enumerator> {
        let mut enumerator = Enumerator::new();
        if self.debug_device.enabled {
            let source =
                DebugDeviceSource::from_hex(&self.debug_device.seed, &self.debug_device.network)
                    .context("Invalid [debug_device] configuration")?;
            enumerator.add_source(source);
        }
        Ok(enumerator)
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keybridge_device::Enumerate;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(&temp_dir.path().join("keybridge.toml")).unwrap();
        assert!(!config.debug_device.enabled);
        assert_eq!(config.debug_device.network, "bitcoin");
        assert_eq!(config.build_enumerator().unwrap().source_count(), 0);
    }

    #[test]
    fn test_load_debug_device_section() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("keybridge.toml");
        std::fs::write(
            &path,
            "[debug_device]\nenabled = true\nnetwork = \"regtest\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert!(config.debug_device.enabled);
        assert_eq!(config.debug_device.seed, default_seed());

        let enumerator = config.build_enumerator().unwrap();
        assert_eq!(enumerator.enumerate().len(), 1);
    }

    #[test]
    fn test_invalid_seed_is_rejected() {
        let config = Config {
            debug_device: DebugDeviceConfig {
                enabled: true,
                seed: "not-hex".to_string(),
                ..DebugDeviceConfig::default()
            },
        };
        assert!(config.build_enumerator().is_err());
    }

    #[test]
    fn test_malformed_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("keybridge.toml");
        std::fs::write(&path, "[debug_device\nenabled = yes").unwrap();
        assert!(load_config(&path).is_err());
    }
}
