//! In-process cache backend.
//!
//! Entries live in a `DashMap`, which shards its locks so reads and writes
//! of one key are atomic without a global lock.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use livery_core::{LiveryResult, StorageError};
use serde_json::Value;

use super::tenant_key::TenantScopedKey;
use super::traits::{CacheBackend, CacheStats, CacheableEntity};

/// Cache backend holding serialized entries in memory.
#[derive(Debug, Default)]
pub struct InMemoryCacheBackend {
    entries: DashMap<Vec<u8>, (Value, DateTime<Utc>)>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a key is currently cached, without touching hit statistics.
    pub fn contains(&self, key: &TenantScopedKey) -> bool {
        self.entries.contains_key(&key.encode())
    }
}

impl CacheBackend for InMemoryCacheBackend {
    fn get<T: CacheableEntity>(
        &self,
        key: &TenantScopedKey,
    ) -> LiveryResult<Option<(T, DateTime<Utc>)>> {
        let entry = self
            .entries
            .get(&key.encode())
            .map(|entry| entry.value().clone());

        match entry {
            Some((value, cached_at)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                let value: T = serde_json::from_value(value).map_err(|e| StorageError::Cache {
                    reason: format!("cannot decode cached {}: {}", T::LABEL, e),
                })?;
                Ok(Some((value, cached_at)))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    fn put<T: CacheableEntity>(
        &self,
        key: &TenantScopedKey,
        value: &T,
        cached_at: DateTime<Utc>,
    ) -> LiveryResult<()> {
        let value = serde_json::to_value(value).map_err(|e| StorageError::Cache {
            reason: format!("cannot encode {}: {}", T::LABEL, e),
        })?;
        self.entries.insert(key.encode(), (value, cached_at));
        Ok(())
    }

    fn delete(&self, key: &TenantScopedKey) -> LiveryResult<bool> {
        Ok(self.entries.remove(&key.encode()).is_some())
    }

    fn delete_prefix(&self, prefix: &[u8]) -> LiveryResult<u64> {
        let mut removed = 0u64;
        self.entries.retain(|key, _| {
            if key.starts_with(prefix) {
                removed += 1;
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    fn stats(&self) -> LiveryResult<CacheStats> {
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.entries.len() as u64,
        })
    }
}
