//! Bounded LRU cache of recommendation results.
//!
//! Keys are `(movie_id, k)`. Every entry belongs to the catalogue generation
//! that was current when it was inserted; `invalidate` drops all entries and
//! moves to the next generation, and inserts computed against an older
//! generation are discarded.
//!
//! Two threads missing on the same key may both compute. Results for one
//! generation are deterministic, so whichever insert lands last is identical
//! to the other.

use crate::service::MovieRecommendation;
use data_loader::MovieId;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

pub type CacheKey = (MovieId, usize);

/// Shared, immutable cached result
pub type CachedResult = Arc<[MovieRecommendation]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

/// Thread-safe LRU cache shared by every request
///
/// Rust concepts:
/// - `Mutex<LruCache>` because even a lookup reorders the LRU list
/// - Atomics for counters that are read without taking the lock
/// - `Arc<[T]>` values so a hit is a reference-count bump, not a deep copy
pub struct RecommendationCache {
    /// `None` when caching is disabled
    entries: Option<Mutex<LruCache<CacheKey, CachedResult>>>,
    /// Only advanced while holding the `entries` lock (when there is one)
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RecommendationCache {
    /// A cache holding at most `capacity` results; 0 disables caching
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedResult> {
        let entries = self.entries.as_ref()?;
        let hit = entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned();

        let counter = if hit.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        hit
    }

    /// Store a result computed against `generation`.
    ///
    /// Returns false (and stores nothing) if the cache has been invalidated
    /// since that generation was read, or if caching is disabled.
    pub fn insert(&self, key: CacheKey, generation: u64, value: CachedResult) -> bool {
        let Some(entries) = self.entries.as_ref() else {
            return false;
        };
        let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
        if generation != self.generation.load(Ordering::SeqCst) {
            debug!(
                "Discarding result for movie {} from superseded generation {}",
                key.0, generation
            );
            return false;
        }
        entries.put(key, value);
        true
    }

    /// Drop every entry and start a new generation, which is returned
    pub fn invalidate(&self) -> u64 {
        let Some(entries) = self.entries.as_ref() else {
            return self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        };
        let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
        let dropped = entries.len();
        entries.clear();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            "Cache invalidated: dropped {} entries, now at generation {}",
            dropped, generation
        );
        generation
    }

    pub fn stats(&self) -> CacheStats {
        let (entries, capacity) = match self.entries.as_ref() {
            Some(entries) => {
                let entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
                (entries.len(), entries.cap().get())
            }
            None => (0, 0),
        };
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
            capacity,
        }
    }
}
