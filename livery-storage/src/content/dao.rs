//! Custom content DAO: transactional layout CRUD behind a read-through cache.

use std::sync::Arc;

use livery_core::{
    ContentOwner, ContentType, CustomLayoutContent, LiveryResult, StorageError,
};
use tracing::{debug, info, warn};

use super::{ContentPart, ContentRowStore, ContentTransaction};
use crate::cache::{CacheBackend, CacheNamespace, ReadThroughCache, TenantScopedKey};

/// Transactional CRUD over custom layout content.
///
/// Every write invalidates the owner's cache entry before returning, whether
/// or not the write succeeded.
pub struct CustomContentDao<C: CacheBackend> {
    store: Arc<dyn ContentRowStore>,
    cache: ReadThroughCache<C>,
}

fn cache_key(owner: &ContentOwner) -> TenantScopedKey {
    TenantScopedKey::new(
        owner.organization_id(),
        CacheNamespace::CustomLayout,
        owner.kind(),
        owner.owner_id(),
    )
}

fn to_parts(content: &CustomLayoutContent) -> Vec<ContentPart> {
    content
        .parts()
        .into_iter()
        .map(|(content_type, text)| ContentPart::new(content_type, text.as_bytes()))
        .collect()
}

/// Insert the parts of `content`, batched when there is more than one.
fn write_parts(
    tx: &mut dyn ContentTransaction,
    owner: &ContentOwner,
    content: &CustomLayoutContent,
) -> LiveryResult<()> {
    let parts = to_parts(content);
    if parts.len() >= 2 {
        tx.insert_parts(owner, &parts)
    } else {
        for part in &parts {
            tx.insert_part(owner, part)?;
        }
        Ok(())
    }
}

impl<C: CacheBackend> CustomContentDao<C> {
    pub fn new(store: Arc<dyn ContentRowStore>, cache: ReadThroughCache<C>) -> Self {
        Self { store, cache }
    }

    pub fn exists(&self, owner: &ContentOwner) -> LiveryResult<bool> {
        if self
            .cache
            .lookup::<CustomLayoutContent>(&cache_key(owner))
            .is_some()
        {
            return Ok(true);
        }
        self.store.has_parts(owner)
    }

    /// Store content for an owner that has none.
    pub fn add(&self, owner: &ContentOwner, content: &CustomLayoutContent) -> LiveryResult<()> {
        let outcome = self.add_in_transaction(owner, content);
        self.finish_write(owner, "add", outcome)
    }

    /// Replace every part of the owner's content. `None` deletes it.
    pub fn update(
        &self,
        owner: &ContentOwner,
        content: Option<&CustomLayoutContent>,
    ) -> LiveryResult<()> {
        let Some(content) = content else {
            return self.delete(owner).map(|_| ());
        };
        let outcome = self.replace_in_transaction(owner, content);
        self.finish_write(owner, "update", outcome)
    }

    /// Stored content, or `None` if the owner has no custom layout.
    pub fn get(&self, owner: &ContentOwner) -> LiveryResult<Option<CustomLayoutContent>> {
        self.cache
            .get_or_fetch(&cache_key(owner), || self.load(owner))
    }

    /// Delete the owner's content. Returns whether anything was stored.
    pub fn delete(&self, owner: &ContentOwner) -> LiveryResult<bool> {
        let outcome = (|| -> LiveryResult<bool> {
            let mut tx = self.store.begin()?;
            let removed = tx.delete_parts(owner)?;
            tx.commit()?;
            Ok(removed > 0)
        })();
        self.finish_write(owner, "delete", outcome)
    }

    /// Delete the content of an organization and of all its applications.
    pub fn delete_all_for_organization(&self, organization_id: &str) -> LiveryResult<u64> {
        let outcome = (|| -> LiveryResult<u64> {
            let mut tx = self.store.begin()?;
            let removed = tx.delete_organization(organization_id)?;
            tx.commit()?;
            Ok(removed)
        })();

        let invalidated = self.cache.invalidate_prefix(&TenantScopedKey::namespace_prefix(
            organization_id,
            CacheNamespace::CustomLayout,
        ));
        let removed = outcome?;
        invalidated?;
        info!(organization_id, removed, "Deleted custom layout content for organization");
        Ok(removed)
    }

    fn add_in_transaction(
        &self,
        owner: &ContentOwner,
        content: &CustomLayoutContent,
    ) -> LiveryResult<()> {
        let mut tx = self.store.begin()?;
        if tx.has_parts(owner)? {
            return Err(StorageError::CustomLayoutAlreadyExists {
                owner: owner.to_string(),
            }
            .into());
        }
        write_parts(tx.as_mut(), owner, content)?;
        tx.commit()
    }

    fn replace_in_transaction(
        &self,
        owner: &ContentOwner,
        content: &CustomLayoutContent,
    ) -> LiveryResult<()> {
        let mut tx = self.store.begin()?;
        let removed = tx.delete_parts(owner)?;
        debug!(%owner, removed, "Removed previous custom layout parts");
        write_parts(tx.as_mut(), owner, content)?;
        tx.commit()
    }

    fn finish_write<T>(
        &self,
        owner: &ContentOwner,
        operation: &str,
        outcome: LiveryResult<T>,
    ) -> LiveryResult<T> {
        let invalidated = self.cache.invalidate(&cache_key(owner));
        match &outcome {
            Ok(_) => info!(%owner, operation, "Custom layout content written"),
            Err(e) => warn!(%owner, operation, error = %e, "Custom layout content write failed"),
        }
        let value = outcome?;
        invalidated?;
        Ok(value)
    }

    fn load(&self, owner: &ContentOwner) -> LiveryResult<Option<CustomLayoutContent>> {
        let rows = self.store.load_parts(owner)?;
        if rows.is_empty() {
            return Ok(None);
        }

        let parts = rows
            .into_iter()
            .map(|row| {
                String::from_utf8(row.content)
                    .map(|text| (row.content_type, text))
                    .map_err(|e| StorageError::CorruptData {
                        location: format!("{} part of {}", row.content_type, owner),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<(ContentType, String)>, _>>()?;

        let content = CustomLayoutContent::from_parts(parts);
        if content.is_none() {
            warn!(%owner, "Stored custom layout has no HTML part, treating as absent");
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCacheBackend;
    use crate::content::{ContentRow, InMemoryContentStore};
    use livery_core::ErrorCode;
    use std::sync::Mutex;

    fn dao() -> (CustomContentDao<InMemoryCacheBackend>, Arc<InMemoryCacheBackend>) {
        let backend = Arc::new(InMemoryCacheBackend::new());
        let dao = CustomContentDao::new(
            Arc::new(InMemoryContentStore::new()),
            ReadThroughCache::with_defaults(Arc::clone(&backend)),
        );
        (dao, backend)
    }

    fn full_content() -> CustomLayoutContent {
        CustomLayoutContent::builder()
            .html("<main>{{MainSection}}</main>")
            .css("main { color: red }")
            .js("console.log(1)")
            .build()
            .unwrap()
    }

    #[test]
    fn test_add_get_delete_round_trip() {
        let (dao, _) = dao();
        let owner = ContentOwner::organization("org-1");

        dao.add(&owner, &full_content()).unwrap();
        assert!(dao.exists(&owner).unwrap());
        assert_eq!(dao.get(&owner).unwrap(), Some(full_content()));

        assert!(dao.delete(&owner).unwrap());
        assert_eq!(dao.get(&owner).unwrap(), None);
        assert!(!dao.exists(&owner).unwrap());
    }

    #[test]
    fn test_add_twice_conflicts() {
        let (dao, _) = dao();
        let owner = ContentOwner::application("app", "org-1");
        dao.add(&owner, &full_content()).unwrap();

        let err = dao.add(&owner, &full_content()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CustomLayoutAlreadyExists);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_html_only_content_has_absent_css_and_js() {
        let (dao, _) = dao();
        let owner = ContentOwner::organization("org-1");
        let content = CustomLayoutContent::builder()
            .html("<p>{{MainSection}}</p>")
            .css("")
            .build()
            .unwrap();
        dao.add(&owner, &content).unwrap();

        let stored = dao.get(&owner).unwrap().unwrap();
        assert_eq!(stored.css(), None);
        assert_eq!(stored.js(), None);
    }

    /// Runs a write once, right after the next read of the rows returns.
    struct WriteAfterRead {
        inner: InMemoryContentStore,
        after_read: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    }

    impl ContentRowStore for WriteAfterRead {
        fn begin(&self) -> LiveryResult<Box<dyn ContentTransaction + '_>> {
            self.inner.begin()
        }

        fn load_parts(&self, owner: &ContentOwner) -> LiveryResult<Vec<ContentRow>> {
            let rows = self.inner.load_parts(owner)?;
            let write = self.after_read.lock().unwrap().take();
            if let Some(write) = write {
                write();
            }
            Ok(rows)
        }

        fn has_parts(&self, owner: &ContentOwner) -> LiveryResult<bool> {
            self.inner.has_parts(owner)
        }
    }

    #[test]
    fn test_update_during_load_is_not_masked_by_stale_cache() {
        let store = Arc::new(WriteAfterRead {
            inner: InMemoryContentStore::new(),
            after_read: Mutex::new(None),
        });
        let dao = Arc::new(CustomContentDao::new(
            store.clone(),
            ReadThroughCache::with_defaults(Arc::new(InMemoryCacheBackend::new())),
        ));
        let owner = ContentOwner::organization("org-1");
        dao.add(&owner, &full_content()).unwrap();

        let replacement = CustomLayoutContent::builder()
            .html("<div>{{MainSection}}</div>")
            .build()
            .unwrap();
        let writer = Arc::clone(&dao);
        let (write_owner, write_content) = (owner.clone(), replacement.clone());
        *store.after_read.lock().unwrap() = Some(Box::new(move || {
            writer.update(&write_owner, Some(&write_content)).unwrap();
        }));

        // The read saw the old rows; the write committed before it could cache them.
        assert_eq!(dao.get(&owner).unwrap(), Some(full_content()));
        assert_eq!(dao.get(&owner).unwrap(), Some(replacement.clone()));
        assert_eq!(dao.get(&owner).unwrap(), Some(replacement));
    }

    #[test]
    fn test_update_replaces_all_parts_and_invalidates() {
        let (dao, backend) = dao();
        let owner = ContentOwner::organization("org-1");
        dao.add(&owner, &full_content()).unwrap();
        dao.get(&owner).unwrap();
        assert!(backend.contains(&cache_key(&owner)));

        let replacement = CustomLayoutContent::builder()
            .html("<div>{{MainSection}}</div>")
            .build()
            .unwrap();
        dao.update(&owner, Some(&replacement)).unwrap();
        assert!(!backend.contains(&cache_key(&owner)));

        let stored = dao.get(&owner).unwrap().unwrap();
        assert_eq!(stored, replacement);
        assert_eq!(stored.css(), None);
    }

    #[test]
    fn test_update_with_none_deletes() {
        let (dao, _) = dao();
        let owner = ContentOwner::organization("org-1");
        dao.add(&owner, &full_content()).unwrap();
        dao.update(&owner, None).unwrap();
        assert_eq!(dao.get(&owner).unwrap(), None);
    }

    #[test]
    fn test_delete_all_for_organization() {
        let (dao, _) = dao();
        let org = ContentOwner::organization("org-1");
        let app = ContentOwner::application("app", "org-1");
        let other = ContentOwner::organization("org-2");
        for owner in [&org, &app, &other] {
            dao.add(owner, &full_content()).unwrap();
            dao.get(owner).unwrap();
        }

        assert_eq!(dao.delete_all_for_organization("org-1").unwrap(), 6);
        assert_eq!(dao.get(&org).unwrap(), None);
        assert_eq!(dao.get(&app).unwrap(), None);
        assert!(dao.get(&other).unwrap().is_some());
    }
}
