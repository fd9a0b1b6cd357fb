//! Livery Storage - Caches and Custom Layout Persistence
//!
//! Tenant-scoped caching (in memory or LMDB), the resolution cache used by
//! the resolver, and transactional custom layout content storage with
//! in-memory and SQLite row stores.

pub mod cache;
pub mod content;

// Re-export cache types
pub use cache::{
    CacheBackend, CacheConfig, CacheNamespace, CacheStats, CacheableEntity, InMemoryCacheBackend,
    LmdbCacheBackend, LmdbCacheError, ReadThroughCache, ResolutionCache, ResolvedLocation,
    TenantScopedKey,
};

// Re-export content persistence types
pub use content::{
    ContentPart, ContentRow, ContentRowStore, ContentTransaction, CustomContentDao,
    InMemoryContentStore, SqliteContentStore,
};
