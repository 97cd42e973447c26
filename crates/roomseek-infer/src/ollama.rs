//! Ollama HTTP client: `/api/tags` health probe and `/api/generate`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use roomseek_core::{Error, InferenceConfig, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::service::{DecodingOptions, HealthStatus, InferenceService};

/// Client for a local or remote Ollama server.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    chat_model: String,
    embedding_model: String,
    probe_timeout: Duration,
    client: Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_ctx: u32,
    top_p: f64,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    pub fn new(
        base_url: impl Into<String>,
        chat_model: impl Into<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            chat_model: chat_model.into(),
            embedding_model: embedding_model.into(),
            probe_timeout: Duration::from_secs(5),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &InferenceConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            config.chat_model.clone(),
            config.embedding_model.clone(),
        )
        .with_probe_timeout(config.probe_timeout())
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }
}

#[async_trait]
impl InferenceService for OllamaClient {
    async fn health_probe(&self) -> HealthStatus {
        let url = format!("{}/api/tags", self.base_url);

        let response = match self
            .client
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                debug!("Ollama probe failed: {}", e);
                return HealthStatus::unavailable(e.to_string());
            }
        };

        if !response.status().is_success() {
            return HealthStatus::unavailable(format!("probe returned {}", response.status()));
        }

        let tags: TagsResponse = match response.json().await {
            Ok(t) => t,
            Err(e) => return HealthStatus::unavailable(format!("unreadable model list: {}", e)),
        };

        let installed = |model: &str| tags.models.iter().any(|m| m.name.contains(model));

        if !installed(&self.chat_model) {
            return HealthStatus::unavailable(format!(
                "{} model not found for chat",
                self.chat_model
            ));
        }
        if !installed(&self.embedding_model) {
            return HealthStatus::unavailable(format!(
                "{} model not found for embeddings",
                self.embedding_model
            ));
        }

        HealthStatus::available()
    }

    async fn generate(&self, prompt: &str, options: &DecodingOptions) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: &self.chat_model,
            prompt,
            stream: false,
            format: options.json_output.then_some("json"),
            options: GenerateOptions {
                temperature: options.temperature,
                num_ctx: options.num_ctx,
                top_p: options.top_p,
                num_predict: options.num_predict,
            },
        };

        debug!("Generating with model {}", self.chat_model);

        let response = self
            .client
            .post(&url)
            .timeout(options.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::ServiceUnavailable(format!(
                        "generation timed out after {}s",
                        options.timeout.as_secs_f64()
                    ))
                } else {
                    Error::Http(format!("Request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Ollama returned {}: {}", status, body);
            return Err(Error::Http(format!("API error {}: {}", status, body)));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Invalid response from Ollama: {}", e)))?;

        let text = parsed.response.trim();
        if text.is_empty() {
            return Err(Error::Inference("Empty response from Ollama".into()));
        }

        Ok(text.to_string())
    }
}
