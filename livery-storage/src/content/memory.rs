//! In-memory row store.
//!
//! A transaction holds the store lock for its whole lifetime and works on a
//! copy of the tables; commit swaps the copy in.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use livery_core::{ContentOwner, ContentType, LiveryResult, StorageError};

use super::{ContentPart, ContentRow, ContentRowStore, ContentTransaction};

type ContentTables = BTreeMap<(ContentOwner, ContentType), ContentRow>;

#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    tables: Mutex<ContentTables>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows across every owner.
    pub fn row_count(&self) -> LiveryResult<usize> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> LiveryResult<MutexGuard<'_, ContentTables>> {
        self.tables
            .lock()
            .map_err(|_| StorageError::LockPoisoned.into())
    }
}

fn owner_has_parts(tables: &ContentTables, owner: &ContentOwner) -> bool {
    ContentType::ALL
        .iter()
        .any(|t| tables.contains_key(&(owner.clone(), *t)))
}

impl ContentRowStore for InMemoryContentStore {
    fn begin(&self) -> LiveryResult<Box<dyn ContentTransaction + '_>> {
        let guard = self.lock()?;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    fn load_parts(&self, owner: &ContentOwner) -> LiveryResult<Vec<ContentRow>> {
        let tables = self.lock()?;
        Ok(ContentType::ALL
            .iter()
            .filter_map(|t| tables.get(&(owner.clone(), *t)).cloned())
            .collect())
    }

    fn has_parts(&self, owner: &ContentOwner) -> LiveryResult<bool> {
        Ok(owner_has_parts(&*self.lock()?, owner))
    }
}

struct MemoryTransaction<'a> {
    guard: MutexGuard<'a, ContentTables>,
    working: ContentTables,
}

impl ContentTransaction for MemoryTransaction<'_> {
    fn has_parts(&self, owner: &ContentOwner) -> LiveryResult<bool> {
        Ok(owner_has_parts(&self.working, owner))
    }

    fn insert_part(&mut self, owner: &ContentOwner, part: &ContentPart) -> LiveryResult<()> {
        let key = (owner.clone(), part.content_type);
        if self.working.contains_key(&key) {
            return Err(StorageError::ContentStore {
                reason: format!(
                    "{} part already stored for {}",
                    part.content_type.as_str(),
                    owner
                ),
            }
            .into());
        }
        let now = Utc::now();
        self.working.insert(
            key,
            ContentRow {
                content_type: part.content_type,
                content: part.content.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    fn insert_parts(&mut self, owner: &ContentOwner, parts: &[ContentPart]) -> LiveryResult<()> {
        for part in parts {
            self.insert_part(owner, part)?;
        }
        Ok(())
    }

    fn delete_parts(&mut self, owner: &ContentOwner) -> LiveryResult<u64> {
        let before = self.working.len();
        self.working.retain(|(o, _), _| o != owner);
        Ok((before - self.working.len()) as u64)
    }

    fn delete_organization(&mut self, organization_id: &str) -> LiveryResult<u64> {
        let before = self.working.len();
        self.working
            .retain(|(o, _), _| o.organization_id() != organization_id);
        Ok((before - self.working.len()) as u64)
    }

    fn commit(self: Box<Self>) -> LiveryResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
