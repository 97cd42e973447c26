//! RoomSeek Infer: language-inference service client.
//!
//! Provides the `InferenceService` trait used by the structured extractor.
//! When model extraction is enabled, `OllamaClient` talks to an Ollama
//! server. Otherwise `DisabledInference` is used and every extraction falls
//! back to the rule-based extractor.

pub mod ollama;
pub mod service;

pub use ollama::OllamaClient;
pub use service::{DecodingOptions, DisabledInference, HealthStatus, InferenceService};

use std::sync::Arc;

use roomseek_core::InferenceConfig;

/// Create the inference service described by the configuration.
pub fn create_inference(config: &InferenceConfig) -> Arc<dyn InferenceService> {
    if config.enabled {
        tracing::info!(
            "Using Ollama at {} (chat={}, embed={})",
            config.base_url,
            config.chat_model,
            config.embedding_model
        );
        return Arc::new(OllamaClient::from_config(config));
    }

    tracing::info!("Model extraction disabled. Using rule-based extraction only.");
    Arc::new(DisabledInference::new("MCP disabled"))
}
