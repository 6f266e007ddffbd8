use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use flowmd_llm::client::{DEFAULT_MODEL, GEMINI_ENDPOINT};
use flowmd_llm::{GeminiClient, InferenceGateway, InferenceResult, ResponseCache, RetryPolicy};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variables checked, in order, for the model API key.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlowMdConfig {
    pub schema_version: u32,
    pub model: String,
    pub endpoint: String,
    pub request_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub retry_jitter_ms: u64,
    /// Quiet period before symptom and finding changes refresh the context
    pub symptom_debounce_ms: u64,
    /// Quiet period before note edits refresh the context
    pub notes_debounce_ms: u64,
    /// Session database; in-memory when unset
    pub store_path: Option<PathBuf>,
}

impl Default for FlowMdConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            model: DEFAULT_MODEL.to_string(),
            endpoint: GEMINI_ENDPOINT.to_string(),
            request_timeout_secs: 30,
            cache_ttl_secs: 300,
            max_retries: 2,
            retry_base_delay_ms: 500,
            retry_max_delay_ms: 5000,
            retry_jitter_ms: 100,
            symptom_debounce_ms: 1000,
            notes_debounce_ms: 2000,
            store_path: None,
        }
    }
}

impl FlowMdConfig {
    /// Get the default config directory
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".flowmd"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from file or return default
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                debug!("Failed to load config, using default: {}", e);
                Self::default()
            }
        }
    }

    /// Load config from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: FlowMdConfig = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// API key from the environment, if set.
    pub fn api_key() -> Option<String> {
        API_KEY_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .map(|key| key.trim().to_string())
            .find(|key| !key.is_empty())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            max_jitter: Duration::from_millis(self.retry_jitter_ms),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn symptom_debounce(&self) -> Duration {
        Duration::from_millis(self.symptom_debounce_ms)
    }

    pub fn notes_debounce(&self) -> Duration {
        Duration::from_millis(self.notes_debounce_ms)
    }

    /// Gateway over the configured Gemini model.
    pub fn gemini_gateway(&self, api_key: &str) -> InferenceResult<InferenceGateway> {
        let client = GeminiClient::with_endpoint(
            api_key,
            &self.model,
            &self.endpoint,
            Duration::from_secs(self.request_timeout_secs),
        )?;
        Ok(InferenceGateway::new(
            Arc::new(client),
            Arc::new(ResponseCache::new(self.cache_ttl())),
            self.retry_policy(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FlowMdConfig::default();
        assert_eq!(config.schema_version, 1);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.cache_ttl(), flowmd_llm::DEFAULT_CACHE_TTL);
        assert_eq!(config.symptom_debounce(), Duration::from_secs(1));
        assert_eq!(config.notes_debounce(), Duration::from_secs(2));
        assert!(config.store_path.is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = FlowMdConfig::default();
        config.model = "gemini-test".into();
        config.store_path = Some(dir.path().join("flowmd.db"));
        config.save_to(&path).unwrap();

        assert_eq!(FlowMdConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_and_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(FlowMdConfig::load_from(&path).unwrap(), FlowMdConfig::default());

        std::fs::write(&path, r#"{"notes_debounce_ms": 3000}"#).unwrap();
        let config = FlowMdConfig::load_from(&path).unwrap();
        assert_eq!(config.notes_debounce_ms, 3000);
        assert_eq!(config.symptom_debounce_ms, 1000);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = FlowMdConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_gateway_requires_key() {
        assert!(FlowMdConfig::default().gemini_gateway("  ").is_err());
        assert!(FlowMdConfig::default().gemini_gateway("test-key").is_ok());
    }
}
