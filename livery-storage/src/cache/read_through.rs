//! Read-through cache over a pluggable backend.
//!
//! Entries older than the configured TTL are treated as absent and removed
//! on the lookup that finds them. Lookup failures in the backend degrade to
//! a miss; invalidation failures are returned to the caller, since a stale
//! entry left behind would be served as truth.
//!
//! Every invalidation bumps a generation counter shared by all clones. A
//! value read from the source of truth is only kept in the cache if no
//! invalidation happened between the read and the put, so a writer that
//! invalidates while a reader is loading can never be overwritten with the
//! reader's stale value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use livery_core::{LiveryConfig, LiveryResult};
use tracing::{debug, warn};

use super::tenant_key::TenantScopedKey;
use super::traits::{CacheBackend, CacheStats, CacheableEntity};

/// Configuration for the read-through cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Lifetime of an entry.
    pub entry_ttl: Duration,
    /// When false every lookup misses and puts are dropped.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entry_ttl: livery_core::config::DEFAULT_CACHE_TTL,
            enabled: true,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the entry TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }

    /// Enable or disable caching.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Settings for resolution caches.
    pub fn for_resolution(config: &LiveryConfig) -> Self {
        Self::new()
            .with_ttl(config.resolution_cache_ttl)
            .with_enabled(config.cache_enabled)
    }

    /// Settings for custom layout content caches.
    pub fn for_content(config: &LiveryConfig) -> Self {
        Self::new()
            .with_ttl(config.content_cache_ttl)
            .with_enabled(config.cache_enabled)
    }
}

/// Read-through cache.
///
/// Cloning is cheap and clones share the backend and the generation.
pub struct ReadThroughCache<C: CacheBackend> {
    backend: Arc<C>,
    config: CacheConfig,
    generation: Arc<AtomicU64>,
}

impl<C: CacheBackend> Clone for ReadThroughCache<C> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
            generation: Arc::clone(&self.generation),
        }
    }
}

impl<C: CacheBackend> ReadThroughCache<C> {
    pub fn new(backend: Arc<C>, config: CacheConfig) -> Self {
        Self {
            backend,
            config,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_defaults(backend: Arc<C>) -> Self {
        Self::new(backend, CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backend(&self) -> &C {
        &self.backend
    }

    /// Look up a live entry.
    pub fn lookup<T: CacheableEntity>(&self, key: &TenantScopedKey) -> Option<T> {
        if !self.config.enabled {
            return None;
        }

        let (value, cached_at) = match self.backend.get::<T>(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(
                    tenant = %key.tenant(),
                    owner_id = %key.owner_id(),
                    entity = T::LABEL,
                    error = %e,
                    "Cache lookup failed, treating as miss"
                );
                return None;
            }
        };

        let age = Utc::now()
            .signed_duration_since(cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        if age >= self.config.entry_ttl {
            debug!(
                tenant = %key.tenant(),
                owner_id = %key.owner_id(),
                entity = T::LABEL,
                age_secs = age.as_secs(),
                "Cache entry expired"
            );
            if let Err(e) = self.backend.delete(key) {
                warn!(error = %e, "Failed to remove expired cache entry");
            }
            return None;
        }

        Some(value)
    }

    /// Store an entry. Failures are logged and swallowed.
    pub fn put<T: CacheableEntity>(&self, key: &TenantScopedKey, value: &T) {
        if !self.config.enabled {
            return;
        }
        if let Err(e) = self.backend.put(key, value, Utc::now()) {
            warn!(
                tenant = %key.tenant(),
                owner_id = %key.owner_id(),
                entity = T::LABEL,
                error = %e,
                "Cache put failed"
            );
        }
    }

    /// Number of invalidations so far. Read it before loading a value that
    /// will be passed to [`put_if_current`](Self::put_if_current).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Store an entry loaded while the generation was `observed`.
    ///
    /// Nothing is stored if an invalidation happened since. An invalidation
    /// that lands between the put and the re-check removes the entry here,
    /// in case the invalidating delete ran before the put.
    pub fn put_if_current<T: CacheableEntity>(
        &self,
        key: &TenantScopedKey,
        value: &T,
        observed: u64,
    ) {
        if !self.config.enabled {
            return;
        }
        if self.generation() != observed {
            debug!(
                tenant = %key.tenant(),
                owner_id = %key.owner_id(),
                entity = T::LABEL,
                "Skipping cache put, invalidated during load"
            );
            return;
        }

        self.put(key, value);

        if self.generation() != observed {
            if let Err(e) = self.backend.delete(key) {
                warn!(
                    tenant = %key.tenant(),
                    owner_id = %key.owner_id(),
                    entity = T::LABEL,
                    error = %e,
                    "Failed to withdraw cache entry invalidated during load"
                );
            }
        }
    }

    /// Return the cached value or fetch, cache and return it.
    ///
    /// `Ok(None)` from the fetcher is returned as is and not cached. A value
    /// fetched while the entry was invalidated is returned but not cached.
    pub fn get_or_fetch<T, F>(&self, key: &TenantScopedKey, fetch: F) -> LiveryResult<Option<T>>
    where
        T: CacheableEntity,
        F: FnOnce() -> LiveryResult<Option<T>>,
    {
        let observed = self.generation();
        if let Some(value) = self.lookup::<T>(key) {
            return Ok(Some(value));
        }

        let fetched = fetch()?;
        if let Some(value) = &fetched {
            self.put_if_current(key, value, observed);
        }
        Ok(fetched)
    }

    /// Remove a single entry.
    pub fn invalidate(&self, key: &TenantScopedKey) -> LiveryResult<bool> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.backend.delete(key)
    }

    /// Remove every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &[u8]) -> LiveryResult<u64> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.backend.delete_prefix(prefix)
    }

    pub fn stats(&self) -> LiveryResult<CacheStats> {
        self.backend.stats()
    }
}
