//! Cache backend traits and cacheable entity marker.

use chrono::{DateTime, Utc};
use livery_core::{CustomLayoutContent, LiveryResult};
use serde::{de::DeserializeOwned, Serialize};

use super::tenant_key::TenantScopedKey;

/// Marker trait for types that can be cached.
///
/// Implementations must be `Clone`, `Serialize` and `DeserializeOwned` so
/// backends can store them out of process.
pub trait CacheableEntity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Short label used in log fields.
    const LABEL: &'static str;
}

impl CacheableEntity for CustomLayoutContent {
    const LABEL: &'static str = "custom_layout";
}

/// Cache backend trait for pluggable cache implementations.
///
/// Implementations must be thread-safe. A single key is read and written
/// atomically; there is no cross-key locking.
pub trait CacheBackend: Send + Sync {
    /// Get a value and the time it was cached, or None if absent.
    fn get<T: CacheableEntity>(
        &self,
        key: &TenantScopedKey,
    ) -> LiveryResult<Option<(T, DateTime<Utc>)>>;

    /// Put a value, replacing any previous value for the key.
    fn put<T: CacheableEntity>(
        &self,
        key: &TenantScopedKey,
        value: &T,
        cached_at: DateTime<Utc>,
    ) -> LiveryResult<()>;

    /// Delete a single key. Returns whether an entry was removed.
    fn delete(&self, key: &TenantScopedKey) -> LiveryResult<bool>;

    /// Delete every key starting with `prefix`. Returns the number removed.
    ///
    /// Prefixes come from [`TenantScopedKey::tenant_prefix`],
    /// [`TenantScopedKey::namespace_prefix`] or
    /// [`TenantScopedKey::owner_prefix`].
    fn delete_prefix(&self, prefix: &[u8]) -> LiveryResult<u64>;

    /// Get cache statistics.
    fn stats(&self) -> LiveryResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries currently in cache.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.8).abs() < 0.001);

        let empty_stats = CacheStats::default();
        assert!((empty_stats.hit_rate() - 0.0).abs() < 0.001);
    }
}
