//! LMDB-backed cache implementation with tenant isolation.
//!
//! Uses the heed crate (Rust bindings for LMDB) to keep resolution entries
//! and custom layout content in a memory-mapped store shared by every
//! process on the host.
//!
//! # Value Format
//!
//! ```text
//! [cached_at: 8 bytes, little-endian millis][json value]
//! ```
//!
//! Keys longer than LMDB's 511 byte limit are never stored; lookups for
//! them always miss.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use livery_core::{LiveryError, LiveryResult, StorageError};
use tracing::debug;

use super::tenant_key::TenantScopedKey;
use super::traits::{CacheBackend, CacheStats, CacheableEntity};

/// Largest key LMDB accepts with its default build options.
const MAX_KEY_BYTES: usize = 511;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    #[error("Failed to open database: {0}")]
    DbOpen(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for LiveryError {
    fn from(e: LmdbCacheError) -> Self {
        LiveryError::Storage(StorageError::Cache {
            reason: e.to_string(),
        })
    }
}

fn txn_error(e: heed::Error) -> LmdbCacheError {
    LmdbCacheError::Transaction(e.to_string())
}

/// LMDB-backed cache with tenant isolation.
///
/// ```ignore
/// let backend = LmdbCacheBackend::new("/var/cache/livery", 64)?;
/// let cache = ReadThroughCache::new(Arc::new(backend), CacheConfig::default());
/// ```
pub struct LmdbCacheBackend {
    env: Env,
    db: Database<Bytes, Bytes>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LmdbCacheBackend {
    /// Open (or create) a cache in `path` with a map of `max_size_mb`.
    pub fn new<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per backend and the files
        // are not modified by anything other than LMDB itself.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(max_size_mb * 1024 * 1024)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_error)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_error)?;

        Ok(Self {
            env,
            db,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    fn encode_value(value: &[u8], cached_at: DateTime<Utc>) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + value.len());
        bytes.extend_from_slice(&cached_at.timestamp_millis().to_le_bytes());
        bytes.extend_from_slice(value);
        bytes
    }

    fn decode_value(bytes: &[u8]) -> Result<(DateTime<Utc>, &[u8]), LmdbCacheError> {
        if bytes.len() < 8 {
            return Err(LmdbCacheError::Deserialization(
                "entry shorter than its timestamp".to_string(),
            ));
        }
        let (timestamp, value) = bytes.split_at(8);
        let timestamp: [u8; 8] = timestamp
            .try_into()
            .map_err(|_| LmdbCacheError::Deserialization("invalid timestamp".to_string()))?;
        let cached_at = DateTime::from_timestamp_millis(i64::from_le_bytes(timestamp))
            .ok_or_else(|| LmdbCacheError::Deserialization("timestamp out of range".to_string()))?;
        Ok((cached_at, value))
    }
}

impl CacheBackend for LmdbCacheBackend {
    fn get<T: CacheableEntity>(
        &self,
        key: &TenantScopedKey,
    ) -> LiveryResult<Option<(T, DateTime<Utc>)>> {
        let encoded_key = key.encode();
        if encoded_key.len() > MAX_KEY_BYTES {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        }

        let rtxn = self.env.read_txn().map_err(txn_error)?;
        match self.db.get(&rtxn, &encoded_key).map_err(txn_error)? {
            Some(bytes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                let (cached_at, value) = Self::decode_value(bytes)?;
                let value: T = serde_json::from_slice(value)
                    .map_err(|e| LmdbCacheError::Deserialization(e.to_string()))?;
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
        let encoded_key = key.encode();
        if encoded_key.len() > MAX_KEY_BYTES {
            debug!(
                tenant = %key.tenant(),
                owner_id = %key.owner_id(),
                key_len = encoded_key.len(),
                "Skipping cache put for oversized key"
            );
            return Ok(());
        }

        let value_bytes =
            serde_json::to_vec(value).map_err(|e| LmdbCacheError::Serialization(e.to_string()))?;
        let full_bytes = Self::encode_value(&value_bytes, cached_at);

        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        self.db
            .put(&mut wtxn, &encoded_key, &full_bytes)
            .map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(())
    }

    fn delete(&self, key: &TenantScopedKey) -> LiveryResult<bool> {
        let encoded_key = key.encode();
        if encoded_key.len() > MAX_KEY_BYTES {
            return Ok(false);
        }

        let mut wtxn = self.env.write_txn().map_err(txn_error)?;
        let removed = self.db.delete(&mut wtxn, &encoded_key).map_err(txn_error)?;
        wtxn.commit().map_err(txn_error)?;
        Ok(removed)
    }

    fn delete_prefix(&self, prefix: &[u8]) -> LiveryResult<u64> {
        let mut wtxn = self.env.write_txn().map_err(txn_error)?;

        let keys = {
            let iter = self.db.prefix_iter(&wtxn, prefix).map_err(txn_error)?;
            let mut keys = Vec::new();
            for entry in iter {
                let (key, _) = entry.map_err(txn_error)?;
                keys.push(key.to_vec());
            }
            keys
        };

        let mut removed = 0u64;
        for key in &keys {
            if self.db.delete(&mut wtxn, key).map_err(txn_error)? {
                removed += 1;
            }
        }
        wtxn.commit().map_err(txn_error)?;

        debug!(removed, "Deleted cache entries by prefix");
        Ok(removed)
    }

    fn stats(&self) -> LiveryResult<CacheStats> {
        let rtxn = self.env.read_txn().map_err(txn_error)?;
        let entry_count = self.db.len(&rtxn).map_err(txn_error)?;
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tenant_key::CacheNamespace;
    use livery_core::{CustomLayoutContent, OwnerKind};
    use tempfile::TempDir;

    fn create_test_backend() -> (LmdbCacheBackend, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let backend =
            LmdbCacheBackend::new(temp_dir.path(), 10).expect("Failed to create backend");
        (backend, temp_dir)
    }

    fn key(tenant: &str, kind: OwnerKind, owner: &str) -> TenantScopedKey {
        TenantScopedKey::new(tenant, CacheNamespace::CustomLayout, kind, owner)
    }

    fn content(html: &str) -> CustomLayoutContent {
        CustomLayoutContent::builder()
            .html(html)
            .css("body { margin: 0 }")
            .build()
            .unwrap()
    }

    #[test]
    fn test_put_and_get_preserves_timestamp() {
        let (backend, _dir) = create_test_backend();
        let k = key("acme", OwnerKind::Organization, "acme");
        let cached_at = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();

        backend.put(&k, &content("<main>{{MainSection}}</main>"), cached_at).unwrap();
        let (value, at) = backend.get::<CustomLayoutContent>(&k).unwrap().unwrap();

        assert_eq!(value.html(), "<main>{{MainSection}}</main>");
        assert_eq!(value.css(), Some("body { margin: 0 }"));
        assert_eq!(at, cached_at);
    }

    #[test]
    fn test_get_missing_counts_miss() {
        let (backend, _dir) = create_test_backend();
        let k = key("acme", OwnerKind::Application, "app-1");
        assert!(backend.get::<CustomLayoutContent>(&k).unwrap().is_none());

        let stats = backend.stats().unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_delete_prefix_leaves_other_tenants() {
        let (backend, _dir) = create_test_backend();
        let now = Utc::now();
        backend.put(&key("acme", OwnerKind::Organization, "acme"), &content("a"), now).unwrap();
        backend.put(&key("acme", OwnerKind::Application, "app"), &content("b"), now).unwrap();
        backend.put(&key("acme2", OwnerKind::Organization, "acme2"), &content("c"), now).unwrap();

        let removed = backend
            .delete_prefix(&TenantScopedKey::tenant_prefix("acme"))
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(backend.stats().unwrap().entry_count, 1);
        assert!(backend
            .get::<CustomLayoutContent>(&key("acme2", OwnerKind::Organization, "acme2"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_oversized_key_is_never_stored() {
        let (backend, _dir) = create_test_backend();
        let k = key("acme", OwnerKind::Application, &"x".repeat(600));

        backend.put(&k, &content("<p/>"), Utc::now()).unwrap();
        assert!(backend.get::<CustomLayoutContent>(&k).unwrap().is_none());
        assert!(!backend.delete(&k).unwrap());
        assert_eq!(backend.stats().unwrap().entry_count, 0);
    }

    #[test]
    fn test_entries_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let k = key("acme", OwnerKind::Organization, "acme");
        {
            let backend = LmdbCacheBackend::new(temp_dir.path(), 10).unwrap();
            backend.put(&k, &content("<p/>"), Utc::now()).unwrap();
        }
        let backend = LmdbCacheBackend::new(temp_dir.path(), 10).unwrap();
        assert!(backend.get::<CustomLayoutContent>(&k).unwrap().is_some());
    }
}
