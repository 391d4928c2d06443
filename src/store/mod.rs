// Record keeping for readings, camera captures and trigger outcomes.
//
// Storage sits behind `ReadingStore` so a database-backed store can replace the
// in-memory one. Nothing here survives a restart.

mod images;
mod trigger_log;

pub use images::{ImageFilter, ImageStore, MemoryImageStore, NewImage, StoredImage};
pub use trigger_log::{TriggerEvent, TriggerLog};

use crate::detector::Reading;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Rows returned when a query gives no limit.
pub const DEFAULT_QUERY_LIMIT: usize = 10;
/// Upper bound on a single query.
pub const MAX_QUERY_LIMIT: usize = 1000;

/// A reading as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    pub id: u64,
    #[serde(flatten)]
    pub reading: Reading,
    pub received_at: DateTime<Utc>,
}

/// Query filter, newest first.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadingFilter {
    pub device_id: Option<String>,
    pub limit: Option<usize>,
}

impl ReadingFilter {
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_QUERY_LIMIT)
            .min(MAX_QUERY_LIMIT)
    }
}

/// append/query contract of the persistence collaborator.
pub trait ReadingStore: Send + Sync {
    /// Persist a reading and return its id.
    fn append(&self, reading: Reading) -> u64;

    /// Matching readings, newest `observed_at` first.
    fn query(&self, filter: &ReadingFilter) -> Vec<StoredReading>;

    fn get(&self, id: u64) -> Option<StoredReading>;
}

/// Bounded in-memory reading store. Oldest rows are dropped past `max_rows`.
pub struct MemoryReadingStore {
    rows: RwLock<VecDeque<StoredReading>>,
    next_id: AtomicU64,
    max_rows: usize,
}

impl MemoryReadingStore {
    pub fn new(max_rows: usize) -> Self {
        Self {
            rows: RwLock::new(VecDeque::new()),
            next_id: AtomicU64::new(1),
            max_rows: max_rows.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryReadingStore {
    fn default() -> Self {
        Self::new(100_000)
    }
}

impl ReadingStore for MemoryReadingStore {
    fn append(&self, reading: Reading) -> u64 {
        let mut rows = self.rows.write().unwrap_or_else(PoisonError::into_inner);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        rows.push_back(StoredReading {
            id,
            reading,
            received_at: Utc::now(),
        });
        while rows.len() > self.max_rows {
            rows.pop_front();
        }
        id
    }

    fn query(&self, filter: &ReadingFilter) -> Vec<StoredReading> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        let mut matched: Vec<StoredReading> = rows
            .iter()
            .filter(|r| {
                filter
                    .device_id
                    .as_deref()
                    .map_or(true, |id| r.reading.device_id == id)
            })
            .cloned()
            .collect();
        drop(rows);

        matched.sort_by(|a, b| {
            b.reading
                .observed_at
                .cmp(&a.reading.observed_at)
                .then(b.id.cmp(&a.id))
        });
        matched.truncate(filter.effective_limit());
        matched
    }

    fn get(&self, id: u64) -> Option<StoredReading> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        // Ids are taken under the write lock, so rows stay sorted by id
        rows.binary_search_by_key(&id, |r| r.id)
            .ok()
            .and_then(|i| rows.get(i).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    }

    fn reading(device: &str, secs: i64) -> Reading {
        Reading {
            device_id: device.to_string(),
            temperature: 21.0,
            humidity: 45.0,
            pressure: 1012.0,
            observed_at: base() + Duration::seconds(secs),
        }
    }

    fn offset(row: &StoredReading) -> i64 {
        (row.reading.observed_at - base()).num_seconds()
    }

    #[test]
    fn test_append_assigns_increasing_ids() {
        let store = MemoryReadingStore::default();
        let a = store.append(reading("s1", 0));
        let b = store.append(reading("s1", 1));
        assert!(b > a);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_query_filters_and_orders_newest_first() {
        let store = MemoryReadingStore::default();
        store.append(reading("s1", 10));
        store.append(reading("s2", 20));
        store.append(reading("s1", 30));
        // Late arrival for s1
        store.append(reading("s1", 5));

        let rows = store.query(&ReadingFilter {
            device_id: Some("s1".to_string()),
            limit: None,
        });
        let secs: Vec<i64> = rows.iter().map(offset).collect();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.reading.device_id == "s1"));
        assert_eq!(secs, vec![30, 10, 5]);
    }

    #[test]
    fn test_query_limit() {
        let store = MemoryReadingStore::default();
        for i in 0..25 {
            store.append(reading("s1", i));
        }
        assert_eq!(store.query(&ReadingFilter::default()).len(), DEFAULT_QUERY_LIMIT);
        assert_eq!(
            store
                .query(&ReadingFilter {
                    device_id: None,
                    limit: Some(3)
                })
                .len(),
            3
        );
    }

    #[test]
    fn test_max_rows_drops_oldest() {
        let store = MemoryReadingStore::new(2);
        store.append(reading("s1", 0));
        store.append(reading("s1", 1));
        store.append(reading("s1", 2));
        assert_eq!(store.len(), 2);
        let rows = store.query(&ReadingFilter::default());
        assert_eq!(offset(rows.last().unwrap()), 1);
    }

    #[test]
    fn test_get_by_id() {
        let store = MemoryReadingStore::new(2);
        let first = store.append(reading("s1", 0));
        let second = store.append(reading("s2", 1));
        let third = store.append(reading("s1", 2));

        assert_eq!(store.get(second).unwrap().reading.device_id, "s2");
        assert_eq!(offset(&store.get(third).unwrap()), 2);
        // Dropped past max_rows
        assert!(store.get(first).is_none());
        assert!(store.get(999).is_none());
    }

    #[test]
    fn test_stored_reading_serializes_flat() {
        let stored = StoredReading {
            id: 7,
            reading: reading("s1", 0),
            received_at: Utc::now(),
        };
        let json = serde_json::to_value(&stored).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["device_id"], "s1");
        assert_eq!(json["temperature"], 21.0);
    }
}
