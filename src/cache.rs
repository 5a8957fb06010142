//! Per-user cache of generated insights.
//!
//! Entries are valid for a fixed TTL and the map can be capped; when full,
//! expired entries are purged first and then the oldest entry is evicted.
//! [`InsightCache::single_flight`] serializes generation for one user so
//! concurrent requests wait for the first one instead of repeating it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedInsight {
    pub text: String,
    /// Model that produced `text`.
    pub model: String,
}

struct Entry {
    insight: CachedInsight,
    created_at: Instant,
}

pub struct InsightCache {
    ttl: Duration,
    max_entries: Option<usize>,
    entries: Mutex<HashMap<i64, Entry>>,
    flights: Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl InsightCache {
    /// `max_entries` of `None` leaves the cache unbounded; `Some(0)`
    /// disables caching entirely.
    pub fn new(ttl: Duration, max_entries: Option<usize>) -> Self {
        Self {
            ttl,
            max_entries,
            entries: Mutex::new(HashMap::new()),
            flights: Mutex::new(HashMap::new()),
        }
    }

    /// Return the entry for `user_id` if it is younger than the TTL.
    /// An expired entry is dropped on the way out.
    pub fn get(&self, user_id: i64) -> Option<CachedInsight> {
        let mut entries = lock(&self.entries);
        let entry = entries.get(&user_id)?;
        if entry.created_at.elapsed() < self.ttl {
            return Some(entry.insight.clone());
        }
        entries.remove(&user_id);
        None
    }

    /// Store a fresh entry, replacing any previous one for this user.
    pub fn insert(&self, user_id: i64, text: String, model: String) {
        let mut entries = lock(&self.entries);

        if let Some(max) = self.max_entries {
            if max == 0 {
                return;
            }
            if !entries.contains_key(&user_id) && entries.len() >= max {
                let ttl = self.ttl;
                entries.retain(|_, e| e.created_at.elapsed() < ttl);
                while entries.len() >= max {
                    let oldest = entries
                        .iter()
                        .min_by_key(|(_, e)| e.created_at)
                        .map(|(id, _)| *id);
                    match oldest {
                        Some(id) => {
                            entries.remove(&id);
                            tracing::debug!(user_id = id, "Evicted oldest insight cache entry");
                        }
                        None => break,
                    }
                }
            }
        }

        entries.insert(
            user_id,
            Entry {
                insight: CachedInsight { text, model },
                created_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, user_id: i64) {
        lock(&self.entries).remove(&user_id);
    }

    /// Number of stored entries, expired ones included until they are touched.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until no other caller holds the generation lock for `user_id`.
    pub async fn single_flight(&self, user_id: i64) -> FlightGuard<'_> {
        let flight = lock(&self.flights).entry(user_id).or_default().clone();
        let guard = flight.lock_owned().await;
        FlightGuard {
            cache: self,
            user_id,
            guard: Some(guard),
        }
    }

    /// Users with a generation lock currently held or awaited.
    pub fn in_flight(&self) -> usize {
        lock(&self.flights).len()
    }
}

/// Held while generating an insight for one user.
pub struct FlightGuard<'a> {
    cache: &'a InsightCache,
    user_id: i64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl std::fmt::Debug for FlightGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightGuard")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut flights = lock(&self.cache.flights);
        let idle = flights
            .get(&self.user_id)
            .is_some_and(|f| Arc::strong_count(f) == 1);
        if idle {
            flights.remove(&self.user_id);
        }
    }
}
