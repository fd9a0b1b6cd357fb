//! Custom layout content persistence.
//!
//! Content is stored as one row per (owner, content type). A row store
//! exposes explicit transactions; the [`CustomContentDao`] builds the
//! delete-then-insert replace on top of them and fronts reads with a cache.

mod dao;
mod memory;
mod sqlite;

pub use dao::CustomContentDao;
pub use memory::InMemoryContentStore;
pub use sqlite::SqliteContentStore;

use chrono::{DateTime, Utc};
use livery_core::{ContentOwner, ContentType, LiveryResult};

/// One part of a layout to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPart {
    pub content_type: ContentType,
    pub content: Vec<u8>,
}

impl ContentPart {
    pub fn new(content_type: ContentType, content: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type,
            content: content.into(),
        }
    }
}

/// One stored row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRow {
    pub content_type: ContentType,
    pub content: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Relational store for custom layout rows.
pub trait ContentRowStore: Send + Sync {
    /// Start a transaction. Concurrent writers serialize here.
    fn begin(&self) -> LiveryResult<Box<dyn ContentTransaction + '_>>;

    /// Rows of an owner, in no particular order.
    fn load_parts(&self, owner: &ContentOwner) -> LiveryResult<Vec<ContentRow>>;

    fn has_parts(&self, owner: &ContentOwner) -> LiveryResult<bool>;
}

/// A row store transaction.
///
/// Dropping a transaction without calling [`commit`](Self::commit) rolls it
/// back.
pub trait ContentTransaction {
    fn has_parts(&self, owner: &ContentOwner) -> LiveryResult<bool>;

    fn insert_part(&mut self, owner: &ContentOwner, part: &ContentPart) -> LiveryResult<()>;

    /// Insert several parts with one batched statement.
    fn insert_parts(&mut self, owner: &ContentOwner, parts: &[ContentPart]) -> LiveryResult<()>;

    /// Delete every part of an owner. Returns the number of rows removed.
    fn delete_parts(&mut self, owner: &ContentOwner) -> LiveryResult<u64>;

    /// Delete every part of an organization and of all its applications.
    fn delete_organization(&mut self, organization_id: &str) -> LiveryResult<u64>;

    fn commit(self: Box<Self>) -> LiveryResult<()>;

    fn rollback(self: Box<Self>) -> LiveryResult<()> {
        Ok(())
    }
}
