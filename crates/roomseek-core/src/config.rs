//! Runtime configuration: optional JSON file, then environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 5005;
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_CHAT_MODEL: &str = "llama3.2:latest";
pub const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text:latest";
pub const DEFAULT_BACKEND_API_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_PROVINCES_URL: &str = "https://vietnamlabs.com/api/vietnamprovince";

/// Inference service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Model-backed extraction is opt-in.
    pub enabled: bool,
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub probe_timeout_secs: u64,
    pub generate_timeout_secs: u64,
    pub num_ctx: u32,
    pub num_predict: u32,
    pub top_p: f64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: DEFAULT_OLLAMA_URL.into(),
            chat_model: DEFAULT_CHAT_MODEL.into(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.into(),
            probe_timeout_secs: 5,
            generate_timeout_secs: 60,
            num_ctx: 2048,
            num_predict: 400,
            top_p: 0.5,
        }
    }
}

impl InferenceConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_secs)
    }
}

/// Reference data source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub provinces_url: String,
    pub amenities_url: String,
    pub timeout_secs: u64,
    pub ttl_hours: u64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            provinces_url: DEFAULT_PROVINCES_URL.into(),
            amenities_url: amenities_url(DEFAULT_BACKEND_API_BASE_URL),
            timeout_secs: 5,
            ttl_hours: 24,
        }
    }
}

impl ReferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 3600)
    }
}

/// In-process semantic cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl_secs: 24 * 3600,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Top-level RoomSeek configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomSeekConfig {
    /// HTTP server port.
    pub port: u16,
    pub inference: InferenceConfig,
    pub reference: ReferenceConfig,
    pub cache: CacheConfig,
    /// Refinement turns merged before a conversation starts fresh.
    pub max_refinement_turns: u32,
}

impl Default for RoomSeekConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            inference: InferenceConfig::default(),
            reference: ReferenceConfig::default(),
            cache: CacheConfig::default(),
            max_refinement_turns: 5,
        }
    }
}

impl RoomSeekConfig {
    /// Load config from file (if present), then apply environment overrides.
    pub fn load(config_path: &Path) -> Self {
        let mut config = match std::fs::read_to_string(config_path) {
            Ok(raw) => match serde_json::from_str::<RoomSeekConfig>(&raw) {
                Ok(c) => {
                    info!("Loaded config from {}", config_path.display());
                    c
                }
                Err(e) => {
                    warn!(
                        "Ignoring invalid config {}: {}",
                        config_path.display(),
                        e
                    );
                    RoomSeekConfig::default()
                }
            },
            Err(_) => RoomSeekConfig::default(),
        };

        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Override fields from environment-style key lookups.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Some(enabled) = lookup("MCP_ENABLED") {
            self.inference.enabled = enabled == "true";
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.inference.base_url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.inference.chat_model = model;
        }
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.inference.embedding_model = model;
        }
        if let Some(base) = lookup("BACKEND_API_BASE_URL") {
            self.reference.amenities_url = amenities_url(&base);
        }
        if let Some(url) = lookup("PROVINCES_API_URL") {
            self.reference.provinces_url = url;
        }
    }

    /// Reject settings that would make the pipeline unusable.
    pub fn validate(&self) -> Result<()> {
        if self.inference.enabled && self.inference.base_url.trim().is_empty() {
            return Err(Error::Config("inference.base_url is empty".into()));
        }
        if self.inference.probe_timeout_secs == 0 || self.inference.generate_timeout_secs == 0 {
            return Err(Error::Config("inference timeouts must be non-zero".into()));
        }
        if self.reference.timeout_secs == 0 {
            return Err(Error::Config("reference.timeout_secs must be non-zero".into()));
        }
        if self.cache.max_entries == 0 {
            return Err(Error::Config("cache.max_entries must be non-zero".into()));
        }
        Ok(())
    }
}

fn amenities_url(api_base: &str) -> String {
    format!("{}/amenities/all", api_base.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = RoomSeekConfig::default();
        assert_eq!(config.port, 5005);
        assert!(!config.inference.enabled);
        assert_eq!(config.inference.chat_model, "llama3.2:latest");
        assert_eq!(config.inference.generate_timeout(), Duration::from_secs(60));
        assert_eq!(config.reference.ttl(), Duration::from_secs(86_400));
        assert_eq!(
            config.reference.amenities_url,
            "http://localhost:5000/api/amenities/all"
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roomseek.json");
        std::fs::write(
            &path,
            r#"{"port": 8080, "inference": {"enabled": true, "num_predict": 512}}"#,
        )
        .unwrap();

        let config = RoomSeekConfig::load(&path);
        assert!(config.inference.num_predict == 512);
        assert_eq!(config.inference.num_ctx, 2048);
        assert_eq!(config.max_refinement_turns, 5);
    }

    #[test]
    fn test_load_missing_or_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = RoomSeekConfig::load(&dir.path().join("nope.json"));
        assert_eq!(missing.cache.max_entries, 1000);

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let broken = RoomSeekConfig::load(&path);
        assert_eq!(broken.inference.top_p, 0.5);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "9000"),
            ("MCP_ENABLED", "true"),
            ("OLLAMA_URL", "http://gpu-box:11434"),
            ("BACKEND_API_BASE_URL", "http://api.local/api/"),
        ]
        .into_iter()
        .collect();

        let mut config = RoomSeekConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.port, 9000);
        assert!(config.inference.enabled);
        assert_eq!(config.inference.base_url, "http://gpu-box:11434");
        assert_eq!(
            config.reference.amenities_url,
            "http://api.local/api/amenities/all"
        );
        assert_eq!(config.inference.chat_model, DEFAULT_CHAT_MODEL);
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut config = RoomSeekConfig::default();
        config.reference.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
