use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use turnkit_core::memory::DEFAULT_LOOKBACK;
use turnkit_property::PropertySetterConfig;

const CONFIG_DIR: &str = "turnkit";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub property: PropertySetterConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct MemoryConfig {
    /// Previous turns visible to look-back rules.
    #[serde(default = "MemoryConfig::default_lookback")]
    pub lookback: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            lookback: Self::default_lookback(),
        }
    }
}

impl MemoryConfig {
    const fn default_lookback() -> usize {
        DEFAULT_LOOKBACK
    }
}

impl Config {
    /// Load `~/turnkit/config.json`.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_dir()?.join(CONFIG_FILE);

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'turnkit init' to create config.",
                config_path.display()
            );
        }

        Self::from_path(&config_path)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read config {}: {e}", path.display()))?;
        let config: Self = serde_json::from_str(&content)?;
        info!("Loaded config from {}", path.display());

        Ok(config)
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = Self::config_dir()?;
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<PathBuf> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join(CONFIG_FILE);
        Self::write_template(&config_path)?;
        Ok(config_path)
    }

    /// Write the starter configuration, refusing to overwrite.
    pub fn write_template(config_path: &Path) -> anyhow::Result<()> {
        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        let config_template = r#"{
  "memory": {
    "lookback": 10
  },
  "property": {
    "setOnActions": [
      {
        "actions": "greet",
        "setProperties": [
          { "name": "lang", "value": "en" }
        ]
      },
      {
        "actions": ["ask_city", "confirm_city"],
        "setProperties": [
          { "name": "city", "path": "memory.current.input", "scope": "longTerm" }
        ]
      }
    ]
  }
}"#;

        std::fs::write(config_path, config_template)?;
        Ok(())
    }

    fn config_dir() -> anyhow::Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(CONFIG_DIR))
    }
}
