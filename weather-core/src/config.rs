use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::provider::ProviderId;

pub const DEFAULT_TIMEOUT_MS: u64 = 300;
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

/// Configuration for a single provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,

    /// How many times this provider appears in the aggregated set.
    /// `0` keeps the credential but leaves the provider out.
    #[serde(default = "default_repeat")]
    pub repeat: usize,
}

fn default_repeat() -> usize {
    1
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Deadline for one aggregated query, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Address the HTTP server binds to.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Example TOML:
    /// [providers.weatherstack]
    /// api_key = "..."
    /// repeat = 1
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            listen: default_listen(),
            providers: HashMap::new(),
        }
    }
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Load config from the default location, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    /// Load config from an explicit path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;
        self.save_to(&path)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set or replace a provider API key. An existing repeat count is kept.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers
            .entry(provider_id.as_str().to_string())
            .and_modify(|cfg| cfg.api_key = api_key.clone())
            .or_insert(ProviderConfig { api_key, repeat: default_repeat() });
    }

    /// Set the repeat count of an already configured provider.
    /// Returns `false` if the provider has no entry yet.
    pub fn set_repeat(&mut self, provider_id: ProviderId, repeat: usize) -> bool {
        match self.providers.get_mut(provider_id.as_str()) {
            Some(cfg) => {
                cfg.repeat = repeat;
                true
            }
            None => false,
        }
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.providers.get(provider_id.as_str()).map(|cfg| cfg.api_key.as_str())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderId;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();

        assert_eq!(cfg.timeout(), Duration::from_millis(300));
        assert_eq!(cfg.listen, "0.0.0.0:8080");
        assert!(cfg.providers.is_empty());
    }

    #[test]
    fn set_api_key_for_provider() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::OpenWeatherMap, "OPEN_KEY".into());

        let key = cfg.provider_api_key(ProviderId::OpenWeatherMap);
        assert_eq!(key, Some("OPEN_KEY"));
        assert!(cfg.is_provider_configured(ProviderId::OpenWeatherMap));
        assert!(!cfg.is_provider_configured(ProviderId::WeatherStack));
        assert_eq!(cfg.provider_config(ProviderId::OpenWeatherMap).unwrap().repeat, 1);
    }

    #[test]
    fn upsert_keeps_existing_repeat() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::WeatherStack, "OLD".into());
        assert!(cfg.set_repeat(ProviderId::WeatherStack, 4));
        cfg.upsert_provider_api_key(ProviderId::WeatherStack, "NEW".into());

        let entry = cfg.provider_config(ProviderId::WeatherStack).unwrap();
        assert_eq!(entry.api_key, "NEW");
        assert_eq!(entry.repeat, 4);
    }

    #[test]
    fn set_repeat_requires_existing_entry() {
        let mut cfg = Config::default();
        assert!(!cfg.set_repeat(ProviderId::OpenWeatherMap, 2));
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [providers.weatherstack]
            api_key = "WS"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(cfg.listen, DEFAULT_LISTEN);
        let entry = cfg.provider_config(ProviderId::WeatherStack).unwrap();
        assert_eq!(entry.api_key, "WS");
        assert_eq!(entry.repeat, 1);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config { timeout_ms: 450, ..Config::default() };
        cfg.upsert_provider_api_key(ProviderId::OpenWeatherMap, "OWM".into());
        cfg.set_repeat(ProviderId::OpenWeatherMap, 2);
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.timeout(), Duration::from_millis(450));
        assert_eq!(loaded.provider_api_key(ProviderId::OpenWeatherMap), Some("OWM"));
        assert_eq!(loaded.provider_config(ProviderId::OpenWeatherMap).unwrap().repeat, 2);
    }

    #[test]
    fn load_from_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert!(cfg.providers.is_empty());
    }

    #[test]
    fn load_from_invalid_toml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "timeout_ms = \"soon\"").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
