//! RoomSeek Cache: short-circuiting repeated queries.
//!
//! The similarity cache itself lives behind the `SemanticCache` trait.
//! `SemanticCacheAdapter` interprets what it returns; `MemorySemanticCache`
//! is an exact-match stand-in keyed by the normalized message.

pub mod adapter;
pub mod memory;
pub mod types;

pub use adapter::{CacheDecision, SemanticCacheAdapter};
pub use memory::{cache_key, MemorySemanticCache, NoopSemanticCache};
pub use types::{CacheLookupResult, SemanticCache};
