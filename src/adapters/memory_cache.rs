//! In-process TTL cache.
//!
//! Entries carry their own deadline and are evicted lazily when read after
//! expiry; there is no background sweep.
use std::time::{Duration, Instant};

use async_trait::async_trait;
use scc::HashMap;

use crate::ports::{CacheResult, CacheStore};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Cache store backed by a concurrent hash map
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: HashMap<String, CacheEntry>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove `key` only if the stored entry is still expired, so a value
    /// written after the expired read survives.
    async fn evict_expired(&self, key: &str) -> bool {
        self.entries
            .remove_if_async(key, |entry| entry.is_expired(Instant::now()))
            .await
            .is_some()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let Some(entry) = self
            .entries
            .get_async(key)
            .await
            .map(|entry| entry.get().clone())
        else {
            return Ok(None);
        };

        if entry.is_expired(Instant::now()) {
            tracing::debug!(cache_key = %key, "Evicting expired entry");
            self.evict_expired(key).await;
            return Ok(None);
        }
        Ok(Some(entry.value))
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> CacheResult<()> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.upsert_async(key.to_string(), entry).await;
        Ok(())
    }
}
