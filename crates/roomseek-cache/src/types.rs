//! Semantic cache interface.

use async_trait::async_trait;
use roomseek_core::{ConversationState, Result, SearchParameters};
use serde_json::Value;

/// What the semantic cache returned for a message.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookupResult {
    Miss,
    /// A stored result for a similar message.
    DirectHit {
        payload: Value,
        metadata: Value,
        similarity: f64,
    },
    /// A cached query's parameters combined with the current turn's constraints.
    MergedHit {
        merged: SearchParameters,
        confidence: f64,
        source_cached: SearchParameters,
        source_user: SearchParameters,
    },
}

/// Near-duplicate query cache.
#[async_trait]
pub trait SemanticCache: Send + Sync {
    async fn lookup(
        &self,
        message: &str,
        prior: Option<&ConversationState>,
    ) -> Result<CacheLookupResult>;

    async fn write(&self, message: &str, payload: &Value, metadata: &Value) -> Result<()>;
}
