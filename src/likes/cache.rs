use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::types::{ContentRef, LikeStatusResponse};

/// Cache key for a batch: the comma-joined `type:id` list.
pub fn cache_key(items: &[ContentRef]) -> String {
    items
        .iter()
        .map(ContentRef::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

struct CachedStatus {
    response: LikeStatusResponse,
    stored_at: Instant,
    generation: u64,
}

/// Short-lived cache of batched status responses.
///
/// Every `clear` starts a new generation. Entries from an older generation
/// are never served, so a response fetched before a toggle cannot outlive it.
pub struct LikeStatusCache {
    ttl: Duration,
    generation: AtomicU64,
    entries: DashMap<String, CachedStatus>,
}

impl LikeStatusCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            generation: AtomicU64::new(0),
            entries: DashMap::new(),
        }
    }

    /// Current generation; pass it back to `insert_if_current` once the
    /// response it guards arrives.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &str) -> Option<LikeStatusResponse> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &str, now: Instant) -> Option<LikeStatusResponse> {
        let generation = self.generation();
        let stale = match self.entries.get(key) {
            Some(entry) if self.is_live(&entry, generation, now) => {
                return Some(entry.response.clone());
            }
            Some(_) => true,
            None => false,
        };
        // The read guard is released above; removing while holding it deadlocks.
        if stale {
            self.entries.remove(key);
        }
        None
    }

    pub fn insert(&self, key: String, response: LikeStatusResponse) {
        self.insert_at(key, response, Instant::now());
    }

    pub fn insert_at(&self, key: String, response: LikeStatusResponse, now: Instant) {
        self.store(key, response, self.generation(), now);
    }

    /// Store only if no `clear` happened since `generation` was read.
    pub fn insert_if_current(
        &self,
        key: String,
        response: LikeStatusResponse,
        generation: u64,
    ) -> bool {
        if generation != self.generation() {
            return false;
        }
        self.store(key, response, generation, Instant::now());
        true
    }

    /// Drop every entry. Any toggle may change counts in any batch.
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_live(&self, entry: &CachedStatus, generation: u64, now: Instant) -> bool {
        entry.generation == generation
            && now.saturating_duration_since(entry.stored_at) < self.ttl
    }

    fn store(&self, key: String, response: LikeStatusResponse, generation: u64, now: Instant) {
        // Batches that are never queried again would otherwise stay forever.
        let current = self.generation();
        self.entries.retain(|_, entry| self.is_live(entry, current, now));
        self.entries.insert(
            key,
            CachedStatus {
                response,
                stored_at: now,
                generation,
            },
        );
    }
}
