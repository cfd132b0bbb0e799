//! Application configuration.
//!
//! Settings come from `lobby.json` in the platform config directory (or a
//! file given with `--config-file`); command-line flags override them. Every
//! field has a default, so a partial or missing file is fine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::catalog::{
    DEFAULT_SEARCH_PAGE_SIZE, EndpointClassifier, FetchOrchestrator, RetryPolicy,
};
use crate::model::Category;

pub const CONFIG_FILE_NAME: &str = "lobby.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
            backoff_factor: policy.backoff_factor,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_factor: self.backoff_factor,
        }
    }
}

/// Token bucket limits applied per client id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub capacity: u32,
    pub refill_per_sec: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 20,
            refill_per_sec: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    pub api_base_url: String,
    /// Path of the lobby configuration (category menu) endpoint.
    pub config_path: String,
    /// Canonical paginating listing endpoint.
    pub tiles_path: String,
    /// Whether the tiles endpoint honours `search`.
    pub tiles_server_search: bool,
    /// Locale segment of the localized lobby root (`/<locale>`).
    pub locale: String,
    pub page_size: u32,
    /// Page size fetched from page 1 when searching locally.
    pub search_page_size: u32,
    pub search_debounce_ms: u64,
    pub request_timeout_secs: u64,
    pub retry: RetryConfig,
    /// Response cache lifetime; 0 disables the cache.
    pub cache_ttl_secs: u64,
    pub rate_limit: RateLimitConfig,
    pub client_id: String,
    pub theme: String,
    /// Categories shown before the config endpoint answers.
    pub categories: Vec<Category>,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            config_path: "/lobby/config".to_string(),
            tiles_path: "/games/tiles".to_string(),
            tiles_server_search: true,
            locale: "en".to_string(),
            page_size: 24,
            search_page_size: DEFAULT_SEARCH_PAGE_SIZE,
            search_debounce_ms: 300,
            request_timeout_secs: 15,
            retry: RetryConfig::default(),
            cache_ttl_secs: 60,
            rate_limit: RateLimitConfig::default(),
            client_id: "lobby-tui".to_string(),
            theme: "dracula".to_string(),
            categories: Vec::new(),
        }
    }
}

impl LobbyConfig {
    /// Loads `path`, or the default location when `path` is `None`.
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            anyhow::bail!("page_size must be at least 1");
        }
        if self.api_base_url.trim().is_empty() {
            anyhow::bail!("api_base_url must not be empty");
        }
        if !(self.rate_limit.refill_per_sec.is_finite() && self.rate_limit.refill_per_sec > 0.0) {
            anyhow::bail!("rate_limit.refill_per_sec must be a positive number");
        }
        if self.retry.backoff_factor < 1.0 {
            anyhow::bail!("retry.backoff_factor must be >= 1.0");
        }
        Ok(())
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }

    pub fn classifier(&self) -> EndpointClassifier {
        EndpointClassifier::new(&self.tiles_path, &self.locale)
            .with_server_search(self.tiles_server_search)
    }

    pub fn orchestrator(&self) -> FetchOrchestrator {
        FetchOrchestrator::new(self.classifier(), &self.config_path, self.search_page_size)
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "lobby", "lobby-tui")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

pub fn get_data_dir() -> Result<PathBuf> {
    let dirs = project_dirs().ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    let data_dir = dirs.data_dir().to_path_buf();
    fs::create_dir_all(&data_dir)?;
    Ok(data_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"page_size": 12, "retry": {{"max_retries": 5}},
                "categories": [{{"id": "all", "name": "All", "getPage": "/en"}}]}}"#
        )
        .unwrap();

        let config = LobbyConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.page_size, 12);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_delay_ms, 500);
        assert_eq!(config.tiles_path, "/games/tiles");
        assert_eq!(config.categories[0].get_page, "/en");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"page_size": 0}}"#).unwrap();
        assert!(LobbyConfig::load(Some(file.path())).is_err());

        let mut frozen = tempfile::NamedTempFile::new().unwrap();
        write!(frozen, r#"{{"rate_limit": {{"capacity": 5, "refill_per_sec": 0}}}}"#).unwrap();
        assert!(LobbyConfig::load(Some(frozen.path())).is_err());

        let missing = Path::new("/definitely/not/here/lobby.json");
        assert!(LobbyConfig::load(Some(missing)).is_err());
    }

    #[test]
    fn test_derived_settings() {
        let mut config = LobbyConfig::default();
        assert_eq!(config.retry.policy(), RetryPolicy::default());
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(60)));
        config.cache_ttl_secs = 0;
        assert_eq!(config.cache_ttl(), None);

        config.tiles_server_search = false;
        let caps = config.classifier().classify("/en");
        assert!(caps.supports_pagination && !caps.supports_search);
    }
}
