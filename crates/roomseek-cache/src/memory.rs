//! In-process cache implementations.
//!
//! `MemorySemanticCache` is an LRU with TTL over exact (normalized) messages.
//! Default: 1000 entries, 24-hour TTL.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use roomseek_core::{CacheConfig, ConversationState, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::types::{CacheLookupResult, SemanticCache};

/// Hex SHA-256 of the lowercased, whitespace-collapsed message.
pub fn cache_key(message: &str) -> String {
    let normalized = message
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// A stored interpretation and the bookkeeping eviction needs.
struct StoredAnswer {
    payload: Value,
    metadata: Value,
    stored_at: Instant,
    /// Value of the store clock at the last read or write.
    last_used: u64,
}

/// Answers keyed by [`cache_key`], evicting expired entries first and then
/// the least recently used one.
struct AnswerStore {
    answers: HashMap<String, StoredAnswer>,
    clock: u64,
    capacity: usize,
    ttl: Duration,
}

impl AnswerStore {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn fetch(&mut self, key: &str) -> Option<(Value, Value)> {
        if self.answers.get(key)?.stored_at.elapsed() >= self.ttl {
            self.answers.remove(key);
            return None;
        }

        let now = self.tick();
        let answer = self.answers.get_mut(key)?;
        answer.last_used = now;
        Some((answer.payload.clone(), answer.metadata.clone()))
    }

    fn store(&mut self, key: String, payload: Value, metadata: Value) {
        let now = self.tick();
        if !self.answers.contains_key(&key) && self.answers.len() >= self.capacity {
            self.make_room();
        }
        self.answers.insert(
            key,
            StoredAnswer {
                payload,
                metadata,
                stored_at: Instant::now(),
                last_used: now,
            },
        );
    }

    fn make_room(&mut self) {
        let ttl = self.ttl;
        self.answers.retain(|_, a| a.stored_at.elapsed() < ttl);
        if self.answers.len() < self.capacity {
            return;
        }

        let stalest = self
            .answers
            .iter()
            .min_by_key(|(_, a)| a.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = stalest {
            debug!("Semantic cache full, evicting least recently used answer");
            self.answers.remove(&key);
        }
    }
}

/// Thread-safe exact-match cache.
pub struct MemorySemanticCache {
    store: Mutex<AnswerStore>,
}

impl MemorySemanticCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            store: Mutex::new(AnswerStore {
                answers: HashMap::new(),
                clock: 0,
                capacity,
                ttl,
            }),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl())
    }

    /// Number of stored answers, expired ones included until evicted.
    pub fn len(&self) -> usize {
        self.store.lock().answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SemanticCache for MemorySemanticCache {
    async fn lookup(
        &self,
        message: &str,
        _prior: Option<&ConversationState>,
    ) -> Result<CacheLookupResult> {
        let hit = self.store.lock().fetch(&cache_key(message));
        Ok(match hit {
            Some((payload, metadata)) => CacheLookupResult::DirectHit {
                payload,
                metadata,
                similarity: 1.0,
            },
            None => CacheLookupResult::Miss,
        })
    }

    async fn write(&self, message: &str, payload: &Value, metadata: &Value) -> Result<()> {
        self.store
            .lock()
            .store(cache_key(message), payload.clone(), metadata.clone());
        Ok(())
    }
}

/// Cache that stores nothing.
pub struct NoopSemanticCache;

#[async_trait]
impl SemanticCache for NoopSemanticCache {
    async fn lookup(
        &self,
        _message: &str,
        _prior: Option<&ConversationState>,
    ) -> Result<CacheLookupResult> {
        Ok(CacheLookupResult::Miss)
    }

    async fn write(&self, _message: &str, _payload: &Value, _metadata: &Value) -> Result<()> {
        Ok(())
    }
}
