//! Content-addressed response cache
//!
//! Maps the SHA-256 of sanitized resume text to its validated
//! [`AnalysisResult`]. Bounded, least-recently-used eviction.
//!
//! The cache is a latency optimization only: a miss or an eviction costs an
//! extra upstream call, never a wrong answer. State is process-local.
//!
//! # Concurrency
//!
//! All state sits behind one `std::sync::Mutex`. The lock is held only for
//! the map operation itself and never across an `.await`, so contention is
//! limited to a few hundred nanoseconds per request.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sha2::{Digest, Sha256};

use crate::analysis::AnalysisResult;

/// Default number of cached analyses
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Hex-encoded SHA-256 digest of sanitized text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for a piece of sanitized text
    ///
    /// Pure: the same text always yields the same key.
    pub fn for_text(sanitized: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(sanitized.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// The full hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: Arc<AnalysisResult>,
    last_access: u64,
}

#[derive(Debug, Default)]
struct LruState {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Monotonic access counter; strictly increasing, so no two entries tie
    clock: u64,
}

impl LruState {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_oldest(&mut self) -> Option<CacheKey> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&oldest);
        Some(oldest)
    }
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub capacity: usize,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// Bounded LRU cache of validated analyses
///
/// Capacity 0 disables caching: `put` is a no-op and `get` always misses.
#[derive(Debug)]
pub struct ResponseCache {
    capacity: usize,
    state: Mutex<LruState>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ResponseCache {
    /// Create an empty cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(LruState {
                entries: HashMap::with_capacity(capacity),
                clock: 0,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up a key, refreshing its recency on hit
    pub fn get(&self, key: &CacheKey) -> Option<Arc<AnalysisResult>> {
        let mut state = self.lock();
        let now = state.tick();

        match state.entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(&entry.value))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or replace a value, evicting the least recently used entry
    /// when the cache is full
    pub fn put(&self, key: CacheKey, value: Arc<AnalysisResult>) {
        if self.capacity == 0 {
            return;
        }

        let mut state = self.lock();
        let now = state.tick();

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.value = value;
            entry.last_access = now;
            return;
        }

        while state.entries.len() >= self.capacity {
            match state.evict_oldest() {
                Some(evicted) => {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(cache_key = %evicted.short(), "Evicted least recently used analysis");
                }
                None => break,
            }
        }

        state.entries.insert(
            key,
            CacheEntry {
                value,
                last_access: now,
            },
        );
    }

    /// Whether `key` is cached, without touching its recency
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            capacity: self.capacity,
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    // Every critical section leaves the map consistent, so a panic elsewhere
    // while the lock was held doesn't invalidate the data.
    fn lock(&self) -> MutexGuard<'_, LruState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
