//! RoomSeek Reference: slowly-changing lookup tables.
//!
//! `ReferenceCache` keeps the province list and the amenity catalog in
//! memory for a fixed TTL, fetching from a `ReferenceDataSource` on miss.
//! Fetch failures degrade to static data instead of failing the caller.

pub mod cache;
pub mod source;

pub use cache::{
    fallback_amenities, ReferenceCache, ReferenceCacheEntry, ReferenceData, ReferenceStatus,
    ReferenceTable,
};
pub use source::{HttpReferenceSource, ReferenceDataSource};
