//! Query result cache.
//!
//! An explicit store owned by the client. Each key holds the last fetched
//! value as JSON. Concurrent reads of one key wait on that key's lock, so a
//! single fetch serves all of them. Mutations invalidate keys by prefix;
//! invalidated values are kept and served as stale data if the refetch fails.
//! The number of keys is bounded; the least recently read key is evicted.

use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use spacenote_core::defaults::QUERY_CACHE_CAPACITY;
use spacenote_core::{Error, Result};

/// Value returned by [`QueryCache::fetch`].
#[derive(Debug)]
pub struct Fetched<T> {
    pub value: T,
    /// Set when a refetch failed and `value` is the previous (stale) data.
    pub refetch_error: Option<Error>,
}

struct Entry {
    value: JsonValue,
    generation: u64,
}

#[derive(Default)]
struct Slot {
    /// Bumped on every invalidation; an entry is fresh while it matches.
    generation: AtomicU64,
    entry: tokio::sync::Mutex<Option<Entry>>,
}

#[derive(Clone)]
pub struct QueryCache {
    slots: Arc<Mutex<LruCache<String, Arc<Slot>>>>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::with_capacity(QUERY_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("keys", &self.len())
            .finish()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `capacity` keys. Zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cap()
            .get()
    }

    fn slot(&self, key: &str) -> Arc<Slot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get(key) {
            return slot.clone();
        }
        let slot = Arc::new(Slot::default());
        if let Some((evicted, _)) = slots.push(key.to_string(), slot.clone()) {
            tracing::debug!(
                subsystem = "client",
                component = "cache",
                query_key = %evicted,
                "Evicted least recently used key"
            );
        }
        slot
    }

    /// Return the cached value for `key`, or run `fetch` to get it.
    ///
    /// If the key was invalidated and `fetch` fails, the stale value is
    /// returned along with the error. With nothing cached the error is
    /// returned as-is.
    pub async fn fetch<T, F, Fut>(&self, key: &str, fetch: F) -> Result<Fetched<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let slot = self.slot(key);
        let mut entry = slot.entry.lock().await;
        let generation = slot.generation.load(Ordering::SeqCst);

        if let Some(cached) = entry.as_ref().filter(|e| e.generation == generation) {
            tracing::trace!(
                subsystem = "client",
                component = "cache",
                query_key = key,
                "Cache hit"
            );
            return Ok(Fetched {
                value: serde_json::from_value(cached.value.clone())?,
                refetch_error: None,
            });
        }

        tracing::debug!(
            subsystem = "client",
            component = "cache",
            query_key = key,
            stale = entry.is_some(),
            "Cache miss, fetching"
        );
        match fetch().await {
            Ok(value) => {
                *entry = Some(Entry {
                    value: serde_json::to_value(&value)?,
                    generation,
                });
                Ok(Fetched {
                    value,
                    refetch_error: None,
                })
            }
            Err(error) => match entry.as_ref() {
                Some(stale) => {
                    tracing::warn!(
                        subsystem = "client",
                        component = "cache",
                        query_key = key,
                        error = %error,
                        "Refetch failed, serving stale data"
                    );
                    Ok(Fetched {
                        value: serde_json::from_value(stale.value.clone())?,
                        refetch_error: Some(error),
                    })
                }
                None => Err(error),
            },
        }
    }

    /// Mark every key starting with `prefix` stale. Returns how many matched.
    pub fn invalidate(&self, prefix: &str) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let mut count = 0;
        for (key, slot) in slots.iter() {
            if key.starts_with(prefix) {
                slot.generation.fetch_add(1, Ordering::SeqCst);
                count += 1;
            }
        }
        tracing::debug!(
            subsystem = "client",
            component = "cache",
            prefix,
            count,
            "Invalidated cache keys"
        );
        count
    }

    /// Drop everything (e.g. on logout).
    pub fn clear(&self) {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
