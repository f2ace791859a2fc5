// =============================================================================
// TTL cache — typed get-or-compute over per-category lifetimes
// =============================================================================
//
// Every upstream fetch goes through `TtlCache::get_or_compute`, which bounds
// the request rate against the data provider. Entries expire lazily at read
// time; there is no background sweeper.
//
// Locking discipline: the map lock is held only for point lookups and
// insertions, never across the async producer. Two tasks racing on the same
// key may therefore both run the producer; the last successful write wins and
// entries are never observed partially written.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

// =============================================================================
// Categories & TTL table
// =============================================================================

/// Data category, determining an entry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheCategory {
    /// Spot quotes and intraday snapshots.
    Realtime,
    /// Historical kline series.
    Historical,
    /// Macro-economic indicator tables.
    Macro,
    /// Economic calendar events.
    Calendar,
}

impl CacheCategory {
    pub const ALL: [CacheCategory; 4] = [
        Self::Realtime,
        Self::Historical,
        Self::Macro,
        Self::Calendar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::Historical => "historical",
            Self::Macro => "macro",
            Self::Calendar => "calendar",
        }
    }
}

fn default_realtime_secs() -> u64 {
    60
}

fn default_historical_secs() -> u64 {
    300
}

fn default_macro_secs() -> u64 {
    3600
}

fn default_calendar_secs() -> u64 {
    3600
}

/// Per-category entry lifetimes, in seconds. Configuration data, not code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtlConfig {
    #[serde(default = "default_realtime_secs")]
    pub realtime_secs: u64,

    #[serde(default = "default_historical_secs")]
    pub historical_secs: u64,

    #[serde(default = "default_macro_secs")]
    pub macro_secs: u64,

    #[serde(default = "default_calendar_secs")]
    pub calendar_secs: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            realtime_secs: default_realtime_secs(),
            historical_secs: default_historical_secs(),
            macro_secs: default_macro_secs(),
            calendar_secs: default_calendar_secs(),
        }
    }
}

impl TtlConfig {
    pub fn ttl_for(&self, category: CacheCategory) -> Duration {
        let secs = match category {
            CacheCategory::Realtime => self.realtime_secs,
            CacheCategory::Historical => self.historical_secs,
            CacheCategory::Macro => self.macro_secs,
            CacheCategory::Calendar => self.calendar_secs,
        };
        Duration::from_secs(secs)
    }
}

// =============================================================================
// Cache internals
// =============================================================================

struct CacheEntry {
    /// Type-erased payload; `get_or_compute` downcasts back to the caller's
    /// concrete type. A type mismatch on the same key is treated as a miss.
    value: Arc<dyn Any + Send + Sync>,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) >= self.ttl
    }
}

/// Snapshot of cache occupancy and cumulative hit/miss counters.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub entries_by_category: HashMap<String, usize>,
    pub hits: u64,
    pub misses: u64,
}

/// Shared in-process cache with per-category TTLs.
pub struct TtlCache {
    entries: RwLock<HashMap<(CacheCategory, String), CacheEntry>>,
    ttls: TtlConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TtlCache {
    pub fn new(ttls: TtlConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttls,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Return the cached value for `(category, key)` or run `producer` to
    /// compute, store, and return a fresh one.
    ///
    /// # Edge cases
    /// - An expired entry is removed at read time and counts as a miss.
    /// - Producer errors propagate to the caller and never populate the cache.
    /// - The map lock is dropped before awaiting the producer; concurrent
    ///   same-key calls may each produce once, and the last write wins.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        category: CacheCategory,
        key: &str,
        producer: F,
    ) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let map_key = (category, key.to_string());
        let now = Instant::now();

        // Fast path: fresh entry of the right type.
        {
            let entries = self.entries.read();
            if let Some(entry) = entries.get(&map_key) {
                if !entry.is_expired(now) {
                    if let Some(value) = entry.value.downcast_ref::<T>() {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        return Ok(value.clone());
                    }
                }
            }
        }

        // Lazy expiry: drop the stale entry before producing.
        {
            let mut entries = self.entries.write();
            if let Some(entry) = entries.get(&map_key) {
                if entry.is_expired(now) {
                    entries.remove(&map_key);
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(category = category.as_str(), key, "cache miss, producing");

        // No lock held here. Producer failures leave the cache untouched.
        let value = producer().await?;

        let entry = CacheEntry {
            value: Arc::new(value.clone()),
            created_at: Instant::now(),
            ttl: self.ttls.ttl_for(category),
        };
        self.entries.write().insert(map_key, entry);

        Ok(value)
    }

    /// Remove one entry. Removing an absent key is a no-op.
    pub fn invalidate(&self, category: CacheCategory, key: &str) {
        self.entries.write().remove(&(category, key.to_string()));
    }

    /// Drop every entry in one category.
    pub fn clear_category(&self, category: CacheCategory) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(cat, _), _| *cat != category);
        before - entries.len()
    }

    /// Drop all entries. Counters are cumulative and survive the clear.
    pub fn clear_all(&self) -> usize {
        let mut entries = self.entries.write();
        let n = entries.len();
        entries.clear();
        n
    }

    /// Occupancy and hit/miss counters. Expired-but-unswept entries still
    /// count toward occupancy until their next read.
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let mut by_category: HashMap<String, usize> = CacheCategory::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), 0))
            .collect();
        for (cat, _) in entries.keys() {
            *by_category.entry(cat.as_str().to_string()).or_insert(0) += 1;
        }
        CacheStats {
            total_entries: entries.len(),
            entries_by_category: by_category,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Test hook: shift an entry's creation instant into the past so that
    /// expiry can be exercised without sleeping.
    #[cfg(test)]
    fn backdate(&self, category: CacheCategory, key: &str, by: Duration) {
        let mut entries = self.entries.write();
        if let Some(entry) = entries.get_mut(&(category, key.to_string())) {
            if let Some(past) = entry.created_at.checked_sub(by) {
                entry.created_at = past;
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;

    fn upstream_err(detail: &str) -> AnalysisError {
        AnalysisError::Upstream(detail.to_string())
    }

    fn cache() -> TtlCache {
        TtlCache::new(TtlConfig::default())
    }

    #[tokio::test]
    async fn second_read_is_a_hit() {
        let c = cache();
        let v1: i64 = c
            .get_or_compute(CacheCategory::Realtime, "q:510300", || async { Ok(42) })
            .await
            .unwrap();
        let v2: i64 = c
            .get_or_compute(CacheCategory::Realtime, "q:510300", || async {
                Err(upstream_err("should not be called"))
            })
            .await
            .unwrap();
        assert_eq!(v1, 42);
        assert_eq!(v2, 42);
        let stats = c.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn expired_entry_is_recomputed() {
        let c = cache();
        let _: i64 = c
            .get_or_compute(CacheCategory::Realtime, "q", || async { Ok(1) })
            .await
            .unwrap();
        c.backdate(CacheCategory::Realtime, "q", Duration::from_secs(61));
        let v: i64 = c
            .get_or_compute(CacheCategory::Realtime, "q", || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!(v, 2);
        assert_eq!(c.stats().misses, 2);
    }

    #[tokio::test]
    async fn producer_error_is_not_cached() {
        let c = cache();
        let r: Result<i64> = c
            .get_or_compute(CacheCategory::Historical, "h", || async {
                Err(upstream_err("boom"))
            })
            .await;
        assert!(r.is_err());
        assert_eq!(c.stats().total_entries, 0);

        // A later successful producer fills the entry normally.
        let v: i64 = c
            .get_or_compute(CacheCategory::Historical, "h", || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(v, 7);
        assert_eq!(c.stats().total_entries, 1);
    }

    #[tokio::test]
    async fn same_key_race_produces_twice_and_last_write_wins() {
        let c = cache();
        let fast = c.get_or_compute(CacheCategory::Realtime, "k", || async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(1i64)
        });
        let slow = c.get_or_compute(CacheCategory::Realtime, "k", || async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Ok(2i64)
        });

        // Both start before either writes, so both producers run.
        let (a, b) = tokio::join!(fast, slow);
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 2);
        assert_eq!(c.stats().misses, 2);

        // The slower writer's value is what remains.
        let v: i64 = c
            .get_or_compute(CacheCategory::Realtime, "k", || async {
                Err(upstream_err("no production expected"))
            })
            .await
            .unwrap();
        assert_eq!(v, 2);
    }

    #[tokio::test]
    async fn same_key_different_categories_are_distinct() {
        let c = cache();
        let a: i64 = c
            .get_or_compute(CacheCategory::Realtime, "k", || async { Ok(1) })
            .await
            .unwrap();
        let b: i64 = c
            .get_or_compute(CacheCategory::Macro, "k", || async { Ok(2) })
            .await
            .unwrap();
        assert_eq!((a, b), (1, 2));
        assert_eq!(c.stats().total_entries, 2);
        assert_eq!(c.stats().entries_by_category["realtime"], 1);
        assert_eq!(c.stats().entries_by_category["macro"], 1);
    }

    #[tokio::test]
    async fn invalidate_and_clear() {
        let c = cache();
        for key in ["a", "b"] {
            let _: i64 = c
                .get_or_compute(CacheCategory::Calendar, key, || async { Ok(0) })
                .await
                .unwrap();
        }
        c.invalidate(CacheCategory::Calendar, "a");
        assert_eq!(c.stats().total_entries, 1);
        c.invalidate(CacheCategory::Calendar, "absent");
        assert_eq!(c.stats().total_entries, 1);
        assert_eq!(c.clear_all(), 1);
        assert_eq!(c.stats().total_entries, 0);
    }

    #[tokio::test]
    async fn clear_category_leaves_others() {
        let c = cache();
        let _: i64 = c
            .get_or_compute(CacheCategory::Realtime, "r", || async { Ok(0) })
            .await
            .unwrap();
        let _: i64 = c
            .get_or_compute(CacheCategory::Macro, "m", || async { Ok(0) })
            .await
            .unwrap();
        assert_eq!(c.clear_category(CacheCategory::Realtime), 1);
        assert_eq!(c.stats().total_entries, 1);
        assert_eq!(c.stats().entries_by_category["macro"], 1);
    }

    #[test]
    fn ttl_table_defaults() {
        let t = TtlConfig::default();
        assert_eq!(t.ttl_for(CacheCategory::Realtime), Duration::from_secs(60));
        assert_eq!(
            t.ttl_for(CacheCategory::Historical),
            Duration::from_secs(300)
        );
        assert_eq!(t.ttl_for(CacheCategory::Macro), Duration::from_secs(3600));
        assert_eq!(
            t.ttl_for(CacheCategory::Calendar),
            Duration::from_secs(3600)
        );
    }

    #[test]
    fn ttl_table_deserialises_partial_json() {
        let t: TtlConfig = serde_json::from_str(r#"{ "realtime_secs": 10 }"#).unwrap();
        assert_eq!(t.realtime_secs, 10);
        assert_eq!(t.historical_secs, 300);
    }
}
