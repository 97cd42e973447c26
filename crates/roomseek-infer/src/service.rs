//! Inference service trait and shared request/response types.

use std::time::Duration;

use async_trait::async_trait;
use roomseek_core::{Error, InferenceConfig, Result};
use serde::Serialize;

/// Outcome of probing the inference service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HealthStatus {
    pub fn available() -> Self {
        Self {
            available: true,
            reason: None,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: Some(reason.into()),
        }
    }
}

/// Decoding settings for a single generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodingOptions {
    pub temperature: f64,
    pub top_p: f64,
    /// Context window, in tokens.
    pub num_ctx: u32,
    /// Output ceiling, in tokens.
    pub num_predict: u32,
    /// Ask the service to constrain output to JSON.
    pub json_output: bool,
    pub timeout: Duration,
}

impl DecodingOptions {
    /// Deterministic JSON decoding with the configured limits.
    pub fn deterministic(config: &InferenceConfig) -> Self {
        Self {
            temperature: 0.0,
            top_p: config.top_p,
            num_ctx: config.num_ctx,
            num_predict: config.num_predict,
            json_output: true,
            timeout: config.generate_timeout(),
        }
    }
}

impl Default for DecodingOptions {
    fn default() -> Self {
        Self::deterministic(&InferenceConfig::default())
    }
}

/// Trait for language-inference backends.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Check that both the generation and embedding capabilities are ready.
    async fn health_probe(&self) -> HealthStatus;

    /// Generate text for a prompt. Network errors and timeouts are errors.
    async fn generate(&self, prompt: &str, options: &DecodingOptions) -> Result<String>;
}

/// Inference service that is switched off; every probe reports unavailable.
pub struct DisabledInference {
    reason: String,
}

impl DisabledInference {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl InferenceService for DisabledInference {
    async fn health_probe(&self) -> HealthStatus {
        HealthStatus::unavailable(self.reason.clone())
    }

    async fn generate(&self, _prompt: &str, _options: &DecodingOptions) -> Result<String> {
        Err(Error::ServiceUnavailable(self.reason.clone()))
    }
}
