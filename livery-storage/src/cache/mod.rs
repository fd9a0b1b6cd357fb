//! Caching layer.
//!
//! - [`TenantScopedKey`]: keys that carry their tenant by construction
//! - [`CacheBackend`]: pluggable storage, in memory or in LMDB
//! - [`ReadThroughCache`]: TTL-bounded read-through access over a backend
//! - [`ResolutionCache`]: where resolved preferences and texts live

mod lmdb_backend;
mod memory_backend;
mod read_through;
mod resolution;
mod tenant_key;
mod traits;

pub use lmdb_backend::{LmdbCacheBackend, LmdbCacheError};
pub use memory_backend::InMemoryCacheBackend;
pub use read_through::{CacheConfig, ReadThroughCache};
pub use resolution::{ResolutionCache, ResolvedLocation};
pub use tenant_key::{CacheNamespace, TenantScopedKey};
pub use traits::{CacheBackend, CacheStats, CacheableEntity};
