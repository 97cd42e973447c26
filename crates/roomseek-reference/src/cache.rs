//! Process-wide reference data cache.
//!
//! One entry per table, replaced wholesale on refresh. Concurrent refreshes
//! of the same expired table are allowed; the last write wins.
//! Default TTL: 24 hours.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use roomseek_core::{Amenity, Province};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::source::ReferenceDataSource;

/// Cached lookup tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceTable {
    Provinces,
    Amenities,
}

impl std::fmt::Display for ReferenceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provinces => write!(f, "provinces"),
            Self::Amenities => write!(f, "amenities"),
        }
    }
}

/// Table contents; shared immutably once stored.
#[derive(Debug, Clone)]
pub enum ReferenceData {
    Provinces(Arc<Vec<Province>>),
    Amenities(Arc<Vec<Amenity>>),
}

impl ReferenceData {
    pub fn len(&self) -> usize {
        match self {
            Self::Provinces(p) => p.len(),
            Self::Amenities(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A cached table with the time it was fetched.
#[derive(Debug, Clone)]
pub struct ReferenceCacheEntry {
    pub data: ReferenceData,
    pub fetched_at: DateTime<Utc>,
}

/// Observability snapshot of one cached table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceStatus {
    pub table: ReferenceTable,
    pub entries: usize,
    pub fetched_at: DateTime<Utc>,
    pub stale: bool,
}

/// Amenities substituted when the catalog is empty or unreachable.
pub fn fallback_amenities() -> Vec<Amenity> {
    vec![
        Amenity::new("68c6bab2ab13f9d982ee9995", "WiFi"),
        Amenity::new("68be84191b3b9b4fa53e7d57", "Điều hòa"),
        Amenity::new("68b95b0e4bad16608dbefad8", "Ban công"),
        Amenity::new("68be84191b3b9b4fa53e7d58", "Tủ lạnh"),
        Amenity::new("68be84191b3b9b4fa53e7d59", "Thang máy"),
        Amenity::new("68be84191b3b9b4fa53e7d60", "Bảo vệ 24/7"),
    ]
}

/// TTL cache over a [`ReferenceDataSource`].
pub struct ReferenceCache {
    source: Arc<dyn ReferenceDataSource>,
    entries: RwLock<HashMap<ReferenceTable, ReferenceCacheEntry>>,
    ttl: Duration,
}

impl ReferenceCache {
    pub fn new(source: Arc<dyn ReferenceDataSource>, ttl: Duration) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Create a cache with the default 24-hour TTL.
    pub fn with_default_ttl(source: Arc<dyn ReferenceDataSource>) -> Self {
        Self::new(source, Duration::from_secs(24 * 3600))
    }

    /// Province list; empty when the source is unreachable.
    pub async fn provinces(&self) -> Arc<Vec<Province>> {
        if let Some(ReferenceData::Provinces(p)) = self.fresh(ReferenceTable::Provinces) {
            return p;
        }

        match self.source.fetch_provinces().await {
            Ok(provinces) => {
                debug!("Loaded {} provinces", provinces.len());
                let provinces = Arc::new(provinces);
                self.store(
                    ReferenceTable::Provinces,
                    ReferenceData::Provinces(provinces.clone()),
                );
                provinces
            }
            Err(e) => {
                error!("Error fetching provinces: {}", e);
                Arc::new(Vec::new())
            }
        }
    }

    /// Amenity catalog; the fallback list when the source is empty or unreachable.
    pub async fn amenities(&self) -> Arc<Vec<Amenity>> {
        if let Some(ReferenceData::Amenities(a)) = self.fresh(ReferenceTable::Amenities) {
            return a;
        }

        match self.source.fetch_amenities().await {
            Ok(amenities) => {
                let amenities = if amenities.is_empty() {
                    debug!("Amenity catalog empty, using fallback list");
                    fallback_amenities()
                } else {
                    amenities
                };
                let amenities = Arc::new(amenities);
                self.store(
                    ReferenceTable::Amenities,
                    ReferenceData::Amenities(amenities.clone()),
                );
                amenities
            }
            Err(e) => {
                warn!("Error fetching amenities, using fallback list: {}", e);
                Arc::new(fallback_amenities())
            }
        }
    }

    /// Drop a table so the next read refetches it.
    pub fn invalidate(&self, table: ReferenceTable) {
        self.entries.write().remove(&table);
    }

    /// Current entries, for status reporting.
    pub fn snapshot(&self) -> Vec<ReferenceStatus> {
        let entries = self.entries.read();
        let mut status: Vec<ReferenceStatus> = entries
            .iter()
            .map(|(table, entry)| ReferenceStatus {
                table: *table,
                entries: entry.data.len(),
                fetched_at: entry.fetched_at,
                stale: !self.is_fresh(entry.fetched_at),
            })
            .collect();
        status.sort_by_key(|s| s.table.to_string());
        status
    }

    fn fresh(&self, table: ReferenceTable) -> Option<ReferenceData> {
        let entries = self.entries.read();
        entries
            .get(&table)
            .filter(|entry| self.is_fresh(entry.fetched_at))
            .map(|entry| entry.data.clone())
    }

    fn store(&self, table: ReferenceTable, data: ReferenceData) {
        self.entries.write().insert(
            table,
            ReferenceCacheEntry {
                data,
                fetched_at: Utc::now(),
            },
        );
    }

    fn is_fresh(&self, fetched_at: DateTime<Utc>) -> bool {
        match (Utc::now() - fetched_at).to_std() {
            Ok(age) => age < self.ttl,
            // Clock moved backwards; keep the entry.
            Err(_) => true,
        }
    }
}
