//! Record cache with TTL and statistics
//!
//! One entry per `(kind, owner)` pair. An entry holds the last-loaded
//! value, which may be `None` (confirmed absent), and the instant it
//! was refreshed. Entries older than the TTL read as misses.
//!
//! The map and its counters share one mutex, so a write path can
//! invalidate and repopulate an entry in a single critical section and
//! readers never observe a half-invalidated state.

use entry_core::{Record, RecordKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default cache TTL
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

struct CacheEntry {
    value: Option<Record>,
    refreshed_at: Instant,
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    invalidations: u64,
}

struct CacheInner {
    entries: HashMap<(RecordKind, String), CacheEntry>,
    counters: Counters,
    since: String,
}

/// Cache statistics snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    /// Fresh-entry reads
    pub hits: u64,
    /// Absent or stale-entry reads
    pub misses: u64,
    /// Entries invalidated by writes
    pub invalidations: u64,
    /// Hits plus misses
    pub total_requests: u64,
    /// Hit percentage over all requests, 0.0 when none were made
    pub hit_rate: f64,
    /// When counting started (RFC 3339)
    pub since: String,
}

/// TTL cache over the three record kinds, partitioned by owner
pub struct RecordCache {
    ttl: Duration,
    inner: Mutex<CacheInner>,
}

impl RecordCache {
    /// Create with the default TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create with an explicit TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                counters: Counters::default(),
                since: entry_core::models::now_rfc3339(),
            }),
        }
    }

    /// Configured TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh cached value for `(kind, owner)`, recording a hit or miss.
    ///
    /// `Some(None)` is a hit on a confirmed-absent record; `None` means
    /// the caller must load from storage and [`RecordCache::store`] the
    /// result.
    pub fn lookup(&self, kind: RecordKind, owner_id: &str) -> Option<Option<Record>> {
        let mut inner = self.inner.lock();
        let fresh = match inner.entries.get(&(kind, owner_id.to_string())) {
            Some(entry) if entry.refreshed_at.elapsed() < self.ttl => Some(entry.value.clone()),
            _ => None,
        };
        match &fresh {
            Some(_) => inner.counters.hits += 1,
            None => inner.counters.misses += 1,
        }
        fresh
    }

    /// Populate `(kind, owner)` with a freshly loaded value
    pub fn store(&self, kind: RecordKind, owner_id: &str, value: Option<Record>) {
        let mut inner = self.inner.lock();
        inner.entries.insert(
            (kind, owner_id.to_string()),
            CacheEntry {
                value,
                refreshed_at: Instant::now(),
            },
        );
    }

    /// Invalidate `(kind, owner)` and repopulate it with the value just
    /// written, in one critical section, so the very next read is a
    /// warm hit on the new data.
    pub fn invalidate_and_store(&self, kind: RecordKind, owner_id: &str, value: Option<Record>) {
        let mut inner = self.inner.lock();
        inner.counters.invalidations += 1;
        inner.entries.insert(
            (kind, owner_id.to_string()),
            CacheEntry {
                value,
                refreshed_at: Instant::now(),
            },
        );
    }

    /// Drop every entry belonging to one owner
    pub fn remove_owner(&self, owner_id: &str) {
        let mut inner = self.inner.lock();
        inner.entries.retain(|(_, owner), _| owner != owner_id);
    }

    /// Drop all entries for all owners. Counters are untouched.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
        tracing::debug!("record cache cleared");
    }

    /// Statistics snapshot
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let total = inner.counters.hits + inner.counters.misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            inner.counters.hits as f64 / total as f64 * 100.0
        };
        CacheStats {
            hits: inner.counters.hits,
            misses: inner.counters.misses,
            invalidations: inner.counters.invalidations,
            total_requests: total,
            hit_rate,
            since: inner.since.clone(),
        }
    }

    /// Zero all counters and restart the window. Cached data stays.
    pub fn reset_stats(&self) {
        let mut inner = self.inner.lock();
        inner.counters = Counters::default();
        inner.since = entry_core::models::now_rfc3339();
    }
}

impl Default for RecordCache {
    fn default() -> Self {
        Self::new()
    }
}
