use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{KakuError, KakuResult};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Analysis service
    pub analysis_url: String,
    pub analysis_timeout_secs: u64,

    // Page coordination
    pub probe_timeout_ms: u64,
    pub failure_notice: String,

    // Meta
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            analysis_url: "http://localhost:3001".to_string(),
            analysis_timeout_secs: 10,
            probe_timeout_ms: 1000,
            failure_notice: "Could not highlight the selected text. Reload the page and try again, or check the extension permissions.".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load config from the default location, or fall back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(config) => Ok(config),
            Err(e) => {
                // Graceful degradation: log warning and use defaults
                tracing::warn!("⚠️ Config file corrupted or invalid, using defaults: {}", e);
                let backup_path = path.with_extension("json.corrupt");
                let _ = std::fs::rename(path, &backup_path);
                Ok(Self::default())
            }
        }
    }

    /// Save config to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Reject values that would make every activation fail
    pub fn validate(&self) -> KakuResult<()> {
        if !(self.analysis_url.starts_with("http://") || self.analysis_url.starts_with("https://")) {
            return Err(KakuError::Config(format!(
                "analysis_url must be an http(s) URL, got {:?}",
                self.analysis_url
            )));
        }
        if self.probe_timeout_ms == 0 {
            return Err(KakuError::Config("probe_timeout_ms must be positive".to_string()));
        }
        if self.analysis_timeout_secs == 0 {
            return Err(KakuError::Config(
                "analysis_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kakuyaku")
        .join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analysis_url, "http://localhost:3001");
        assert_eq!(config.probe_timeout(), Duration::from_millis(1000));
        assert_eq!(config.analysis_timeout(), Duration::from_secs(10));
        assert!(!config.failure_notice.is_empty());
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());

        let config = Config {
            analysis_url: "localhost:3001".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(KakuError::Config(_))));

        let config = Config {
            probe_timeout_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_partial_file_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"analysis_url": "http://nlp.local:8080"}"#).unwrap();
        assert_eq!(config.analysis_url, "http://nlp.local:8080");
        assert_eq!(config.probe_timeout_ms, 1000);
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.probe_timeout_ms = 250;
        config.save_to(&path).unwrap();

        let restored = Config::load_from(&path).unwrap();
        assert_eq!(restored.probe_timeout_ms, 250);
    }

    #[test]
    fn test_config_corrupt_file_is_backed_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not valid json").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.log_level, "info");
        assert!(!path.exists());
        assert!(dir.path().join("config.json.corrupt").exists());
    }
}
