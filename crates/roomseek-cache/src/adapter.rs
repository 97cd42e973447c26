//! Interpretation of semantic cache results.

use std::sync::Arc;

use roomseek_core::{ConversationState, ExtractionRecord, SearchParameters};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::types::{CacheLookupResult, SemanticCache};

/// What the pipeline should do with a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheDecision {
    Miss,
    /// Cached final parameters for a room search.
    Search {
        params: SearchParameters,
        similarity: f64,
    },
    /// A cached extraction record that still needs canonicalizing.
    Record {
        record: ExtractionRecord,
        similarity: f64,
    },
    /// A cached non-search answer, returned verbatim.
    Answer { payload: Value, similarity: f64 },
    /// Parameters merged from a cached query and the current turn.
    Merged {
        params: SearchParameters,
        confidence: f64,
        cached: SearchParameters,
        user: SearchParameters,
    },
}

/// Wraps a [`SemanticCache`]; cache failures are treated as misses.
pub struct SemanticCacheAdapter {
    cache: Arc<dyn SemanticCache>,
}

impl SemanticCacheAdapter {
    pub fn new(cache: Arc<dyn SemanticCache>) -> Self {
        Self { cache }
    }

    pub async fn lookup(&self, message: &str, prior: Option<&ConversationState>) -> CacheDecision {
        let result = match self.cache.lookup(message, prior).await {
            Ok(r) => r,
            Err(e) => {
                warn!("Semantic cache lookup failed: {}", e);
                return CacheDecision::Miss;
            }
        };

        match result {
            CacheLookupResult::Miss => {
                debug!("Semantic cache miss");
                CacheDecision::Miss
            }
            CacheLookupResult::MergedHit {
                merged,
                confidence,
                source_cached,
                source_user,
            } => {
                info!("Merged-parameters cache hit (confidence {:.2})", confidence);
                CacheDecision::Merged {
                    params: merged,
                    confidence,
                    cached: source_cached,
                    user: source_user,
                }
            }
            CacheLookupResult::DirectHit {
                payload,
                metadata,
                similarity,
            } => {
                info!("Semantic cache hit (similarity {:.2})", similarity);
                interpret_direct_hit(payload, &metadata, similarity)
            }
        }
    }

    /// Store a final result. Failures are logged and ignored.
    pub async fn write(&self, message: &str, payload: &Value, metadata: &Value) {
        if let Err(e) = self.cache.write(message, payload, metadata).await {
            warn!("Semantic cache write failed: {}", e);
        }
    }
}

fn interpret_direct_hit(payload: Value, metadata: &Value, similarity: f64) -> CacheDecision {
    let flagged_search = |v: &Value| v.get("isRoomSearchQuery").and_then(Value::as_bool) == Some(true);

    if flagged_search(metadata) || flagged_search(&payload) {
        let params = metadata
            .get("searchParams")
            .or_else(|| payload.get("searchParams"))
            .filter(|p| p.is_object())
            .and_then(|p| serde_json::from_value::<SearchParameters>(p.clone()).ok());
        if let Some(params) = params {
            return CacheDecision::Search { params, similarity };
        }

        if let Ok(record) = serde_json::from_value::<ExtractionRecord>(payload.clone()) {
            if record.is_room_search_query {
                return CacheDecision::Record { record, similarity };
            }
        }
    }

    CacheDecision::Answer {
        payload,
        similarity,
    }
}
