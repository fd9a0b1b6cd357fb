//! Resolution cache: where an owner's effective preference or text lives.
//!
//! Entries are keyed by the requesting owner in the requesting tenant and
//! point at the level where the value was actually found. Only the terminal
//! location is cached, never the intermediate hops.

use livery_core::{LiveryResult, OwnerKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::read_through::ReadThroughCache;
use super::tenant_key::{CacheNamespace, TenantScopedKey};
use super::traits::{CacheBackend, CacheableEntity};

/// The level at which a resolution succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub requesting_owner_id: String,
    pub resolved_owner_id: String,
    pub resolved_kind: OwnerKind,
    /// Tenant domain of the organization that holds the value.
    pub tenant_domain: String,
    /// Id of the organization that holds the value.
    pub organization_id: String,
}

impl CacheableEntity for ResolvedLocation {
    const LABEL: &'static str = "resolved_location";
}

/// Per-tenant cache of resolution results.
pub struct ResolutionCache<C: CacheBackend> {
    cache: ReadThroughCache<C>,
}

impl<C: CacheBackend> Clone for ResolutionCache<C> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
        }
    }
}

fn preference_key(tenant: &str, kind: OwnerKind, owner_id: &str, locale: &str) -> TenantScopedKey {
    TenantScopedKey::new(tenant, CacheNamespace::PreferenceResolution, kind, owner_id)
        .with_qualifier(locale)
}

fn text_key(
    tenant: &str,
    kind: OwnerKind,
    owner_id: &str,
    screen: &str,
    locale: &str,
) -> TenantScopedKey {
    TenantScopedKey::new(tenant, CacheNamespace::TextResolution, kind, owner_id)
        .with_qualifier(screen)
        .with_qualifier(locale)
}

impl<C: CacheBackend> ResolutionCache<C> {
    pub fn new(cache: ReadThroughCache<C>) -> Self {
        Self { cache }
    }

    pub fn inner(&self) -> &ReadThroughCache<C> {
        &self.cache
    }

    /// Invalidation generation; read it before walking the hierarchy.
    pub fn generation(&self) -> u64 {
        self.cache.generation()
    }

    pub fn preference(
        &self,
        tenant: &str,
        kind: OwnerKind,
        owner_id: &str,
        locale: &str,
    ) -> Option<ResolvedLocation> {
        let hit = self
            .cache
            .lookup::<ResolvedLocation>(&preference_key(tenant, kind, owner_id, locale));
        debug!(tenant, %kind, owner_id, locale, hit = hit.is_some(), "Preference resolution cache lookup");
        hit
    }

    /// Cache a resolution found while the generation was `observed`.
    pub fn put_preference(
        &self,
        tenant: &str,
        kind: OwnerKind,
        owner_id: &str,
        locale: &str,
        location: &ResolvedLocation,
        observed: u64,
    ) {
        self.cache.put_if_current(
            &preference_key(tenant, kind, owner_id, locale),
            location,
            observed,
        );
    }

    /// Remove one locale's preference entry.
    pub fn remove_preference(
        &self,
        tenant: &str,
        kind: OwnerKind,
        owner_id: &str,
        locale: &str,
    ) -> LiveryResult<bool> {
        self.cache
            .invalidate(&preference_key(tenant, kind, owner_id, locale))
    }

    pub fn text(
        &self,
        tenant: &str,
        kind: OwnerKind,
        owner_id: &str,
        screen: &str,
        locale: &str,
    ) -> Option<ResolvedLocation> {
        let hit = self
            .cache
            .lookup::<ResolvedLocation>(&text_key(tenant, kind, owner_id, screen, locale));
        debug!(tenant, %kind, owner_id, screen, locale, hit = hit.is_some(), "Text resolution cache lookup");
        hit
    }

    #[allow(clippy::too_many_arguments)]
    pub fn put_text(
        &self,
        tenant: &str,
        kind: OwnerKind,
        owner_id: &str,
        screen: &str,
        locale: &str,
        location: &ResolvedLocation,
        observed: u64,
    ) {
        self.cache.put_if_current(
            &text_key(tenant, kind, owner_id, screen, locale),
            location,
            observed,
        );
    }

    /// Clear the preference entries of an owner, across every locale.
    pub fn invalidate_preference(
        &self,
        tenant: &str,
        kind: OwnerKind,
        owner_id: &str,
    ) -> LiveryResult<u64> {
        let removed = self.cache.invalidate_prefix(&TenantScopedKey::owner_prefix(
            tenant,
            CacheNamespace::PreferenceResolution,
            kind,
            owner_id,
        ))?;
        info!(tenant, %kind, owner_id, removed, "Invalidated preference resolution cache");
        Ok(removed)
    }

    /// Clear the text entry for exactly one (owner, screen, locale).
    pub fn invalidate_text(
        &self,
        tenant: &str,
        kind: OwnerKind,
        owner_id: &str,
        screen: &str,
        locale: &str,
    ) -> LiveryResult<bool> {
        let removed = self
            .cache
            .invalidate(&text_key(tenant, kind, owner_id, screen, locale))?;
        info!(tenant, %kind, owner_id, screen, locale, removed, "Invalidated text resolution cache");
        Ok(removed)
    }

    /// Clear every preference and text entry of an owner.
    pub fn clear_owner(&self, tenant: &str, kind: OwnerKind, owner_id: &str) -> LiveryResult<u64> {
        let mut removed = 0;
        for namespace in [
            CacheNamespace::PreferenceResolution,
            CacheNamespace::TextResolution,
        ] {
            removed += self.cache.invalidate_prefix(&TenantScopedKey::owner_prefix(
                tenant, namespace, kind, owner_id,
            ))?;
        }
        info!(tenant, %kind, owner_id, removed, "Cleared resolution cache for owner");
        Ok(removed)
    }

    /// Clear every resolution entry of a tenant.
    pub fn clear_tenant(&self, tenant: &str) -> LiveryResult<u64> {
        let mut removed = 0;
        for namespace in [
            CacheNamespace::PreferenceResolution,
            CacheNamespace::TextResolution,
        ] {
            removed += self
                .cache
                .invalidate_prefix(&TenantScopedKey::namespace_prefix(tenant, namespace))?;
        }
        info!(tenant, removed, "Cleared resolution cache for tenant");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory_backend::InMemoryCacheBackend;
    use std::sync::Arc;

    fn cache() -> ResolutionCache<InMemoryCacheBackend> {
        ResolutionCache::new(ReadThroughCache::with_defaults(Arc::new(
            InMemoryCacheBackend::new(),
        )))
    }

    fn location(requesting: &str, resolved: &str) -> ResolvedLocation {
        ResolvedLocation {
            requesting_owner_id: requesting.to_string(),
            resolved_owner_id: resolved.to_string(),
            resolved_kind: OwnerKind::Organization,
            tenant_domain: "root.com".to_string(),
            organization_id: "root".to_string(),
        }
    }

    #[test]
    fn test_preference_entries_are_locale_sensitive() {
        let cache = cache();
        cache.put_preference("acme", OwnerKind::Application, "app", "en-US", &location("app", "root.com"), cache.generation());

        assert!(cache.preference("acme", OwnerKind::Application, "app", "en-US").is_some());
        assert!(cache.preference("acme", OwnerKind::Application, "app", "fr-FR").is_none());
        assert!(cache.preference("other", OwnerKind::Application, "app", "en-US").is_none());
    }

    #[test]
    fn test_invalidate_preference_clears_all_locales_of_owner_only() {
        let cache = cache();
        cache.put_preference("acme", OwnerKind::Application, "app", "en-US", &location("app", "x"), cache.generation());
        cache.put_preference("acme", OwnerKind::Application, "app", "fr-FR", &location("app", "x"), cache.generation());
        cache.put_preference("acme", OwnerKind::Application, "app2", "en-US", &location("app2", "x"), cache.generation());
        cache.put_text("acme", OwnerKind::Application, "app", "LOGIN", "en-us", &location("app", "x"), cache.generation());

        assert_eq!(cache.invalidate_preference("acme", OwnerKind::Application, "app").unwrap(), 2);
        assert!(cache.preference("acme", OwnerKind::Application, "app2", "en-US").is_some());
        assert!(cache.text("acme", OwnerKind::Application, "app", "LOGIN", "en-us").is_some());
    }

    #[test]
    fn test_invalidate_text_is_exact() {
        let cache = cache();
        cache.put_text("acme", OwnerKind::Organization, "acme", "LOGIN", "en-us", &location("acme", "acme"), cache.generation());
        cache.put_text("acme", OwnerKind::Organization, "acme", "LOGIN", "fr-fr", &location("acme", "acme"), cache.generation());

        assert!(cache.invalidate_text("acme", OwnerKind::Organization, "acme", "LOGIN", "en-us").unwrap());
        assert!(cache.text("acme", OwnerKind::Organization, "acme", "LOGIN", "en-us").is_none());
        assert!(cache.text("acme", OwnerKind::Organization, "acme", "LOGIN", "fr-fr").is_some());
    }

    #[test]
    fn test_put_skipped_when_owner_invalidated_during_walk() {
        let cache = cache();
        let observed = cache.generation();
        cache.invalidate_preference("acme", OwnerKind::Application, "app").unwrap();

        cache.put_preference("acme", OwnerKind::Application, "app", "en-US", &location("app", "x"), observed);
        cache.put_text("acme", OwnerKind::Application, "app", "LOGIN", "en-us", &location("app", "x"), observed);
        assert!(cache.preference("acme", OwnerKind::Application, "app", "en-US").is_none());
        assert!(cache.text("acme", OwnerKind::Application, "app", "LOGIN", "en-us").is_none());
    }

    #[test]
    fn test_clear_owner_and_tenant() {
        let cache = cache();
        cache.put_preference("acme", OwnerKind::Organization, "acme", "en-US", &location("acme", "acme"), cache.generation());
        cache.put_text("acme", OwnerKind::Organization, "acme", "LOGIN", "en-us", &location("acme", "acme"), cache.generation());
        cache.put_preference("acme", OwnerKind::Application, "app", "en-US", &location("app", "acme"), cache.generation());
        cache.put_preference("beta", OwnerKind::Organization, "beta", "en-US", &location("beta", "beta"), cache.generation());

        assert_eq!(cache.clear_owner("acme", OwnerKind::Organization, "acme").unwrap(), 2);
        assert!(cache.preference("acme", OwnerKind::Application, "app", "en-US").is_some());

        assert_eq!(cache.clear_tenant("acme").unwrap(), 1);
        assert!(cache.preference("beta", OwnerKind::Organization, "beta", "en-US").is_some());
    }
}
