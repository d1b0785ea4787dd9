//! Configuration file support for fitlog.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/fitlog/config.toml`.

use crate::summary::AverageScope;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub summary: SummaryConfig,

    #[serde(default)]
    pub export: ExportConfig,
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

/// Chart summary configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct SummaryConfig {
    /// Average over every entry (`all_entries`) or only the selected range (`in_range`)
    #[serde(default)]
    pub average_scope: AverageScope,
}

/// CSV export configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ExportConfig {
    /// Defaults to `<data_dir>/exports`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("fitlog")
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("fitlog").join("config.toml")
    }

    /// Where CSV exports go unless overridden
    pub fn export_dir(&self) -> PathBuf {
        self.export
            .output_dir
            .clone()
            .unwrap_or_else(|| self.data.data_dir.join("exports"))
    }

    /// Render as the TOML written by [`Config::save_to`]
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, self.to_toml()?)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.data.data_dir.ends_with("fitlog"));
        assert_eq!(config.summary.average_scope, AverageScope::AllEntries);
        assert!(config.export.output_dir.is_none());
        assert_eq!(config.export_dir(), config.data.data_dir.join("exports"));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.summary.average_scope = AverageScope::InRange;
        config.export.output_dir = Some(PathBuf::from("/tmp/fitlog-exports"));

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.summary.average_scope, AverageScope::InRange);
        assert_eq!(parsed.export_dir(), PathBuf::from("/tmp/fitlog-exports"));
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[summary]
average_scope = "in_range"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.summary.average_scope, AverageScope::InRange);
        assert!(config.data.data_dir.ends_with("fitlog")); // default
    }

    #[test]
    fn test_save_and_load_from_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.data.data_dir = temp_dir.path().join("data");
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.data.data_dir, temp_dir.path().join("data"));
    }

    #[test]
    fn test_to_toml_renders_defaults() {
        let rendered = Config::default().to_toml().unwrap();
        assert!(rendered.contains("[data]"));
        assert!(rendered.contains("average_scope = \"all_entries\""));
    }

    #[test]
    fn test_unknown_average_scope_is_rejected() {
        let toml_str = r#"
[summary]
average_scope = "weekly"
"#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }
}
