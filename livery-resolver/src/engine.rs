//! Preference resolution engine.
//!
//! Finds the nearest configured preference (or custom text) for an owner by
//! walking from the requesting level up through organization ancestry:
//!
//! 1. a cached resolution for the requesting owner is trusted and fetched
//!    directly;
//! 2. otherwise each level is tried in order, application preference first
//!    (when an application is in play at that level), then the
//!    organization's own preference;
//! 3. when a level has nothing, the walk moves to the parent organization,
//!    stopping with NotFound once the root (depth 0) has been tried.
//!
//! Only the terminal location is cached, keyed by the requesting owner.
//! Unpublished preferences are skipped during the walk.

use std::sync::Arc;

use livery_core::naming::{
    custom_text_resource_name, preference_resource_name, preference_resource_type,
    text_resource_type,
};
use livery_core::{
    normalize_locale, payload, ContentOwner, CustomText, LiveryError, LiveryResult, OwnerKind,
    Preference, ResolutionError,
};
use livery_storage::{CacheBackend, CustomContentDao, ResolutionCache, ResolvedLocation};
use serde_json::Value;
use tracing::{debug, warn};

use crate::context::{ExecutionContext, TenantContext};
use crate::directory::{DirectoryError, OrganizationDirectory, SharedApplicationResolver};
use crate::store::BrandingStore;

/// Cache qualifiers for a custom text: uppercase screen, normalized
/// lowercase locale. Matches the resource naming of texts.
pub(crate) fn text_key_parts(screen: &str, locale: &str) -> (String, String) {
    (screen.to_uppercase(), normalize_locale(locale).to_lowercase())
}

/// Content owner of a preference written or resolved in `tenant`.
pub(crate) fn layout_owner(tenant: &TenantContext, kind: OwnerKind, owner_id: &str) -> ContentOwner {
    match kind {
        OwnerKind::Organization => ContentOwner::organization(&tenant.organization_id),
        OwnerKind::Application => ContentOwner::application(owner_id, &tenant.organization_id),
    }
}

fn directory_failure(organization_id: &str, e: DirectoryError) -> LiveryError {
    ResolutionError::DirectoryFailure {
        organization_id: organization_id.to_string(),
        reason: e.to_string(),
    }
    .into()
}

/// What is being resolved.
#[derive(Debug, Clone, Copy)]
enum Target<'a> {
    Preference { locale: &'a str },
    Text { screen: &'a str, locale: &'a str },
}

impl Target<'_> {
    fn resource_type(&self, kind: OwnerKind) -> &'static str {
        match self {
            Target::Preference { .. } => preference_resource_type(kind),
            Target::Text { .. } => text_resource_type(kind),
        }
    }

    fn resource_name(&self, kind: OwnerKind, owner_id: &str) -> String {
        match self {
            Target::Preference { locale } => preference_resource_name(kind, owner_id, locale),
            Target::Text { screen, locale } => {
                custom_text_resource_name(kind, owner_id, screen, locale)
            }
        }
    }

    /// Whether a stored document counts as configured during the walk.
    fn accepts(&self, document: &Value) -> bool {
        match self {
            Target::Preference { .. } => payload::is_published(document),
            Target::Text { .. } => true,
        }
    }

    fn not_found(&self, kind: OwnerKind, owner_id: &str, tenant: &TenantContext) -> LiveryError {
        match self {
            Target::Preference { locale } => ResolutionError::PreferenceNotFound {
                kind,
                owner_id: owner_id.to_string(),
                locale: locale.to_string(),
                tenant_domain: tenant.tenant_domain.clone(),
            },
            Target::Text { screen, locale } => ResolutionError::CustomTextNotFound {
                kind,
                owner_id: owner_id.to_string(),
                screen: screen.to_string(),
                locale: locale.to_string(),
                tenant_domain: tenant.tenant_domain.clone(),
            },
        }
        .into()
    }

    fn cached<C: CacheBackend>(
        &self,
        cache: &ResolutionCache<C>,
        tenant: &str,
        kind: OwnerKind,
        owner_id: &str,
    ) -> Option<ResolvedLocation> {
        match self {
            Target::Preference { locale } => cache.preference(tenant, kind, owner_id, locale),
            Target::Text { screen, locale } => {
                let (screen, locale) = text_key_parts(screen, locale);
                cache.text(tenant, kind, owner_id, &screen, &locale)
            }
        }
    }

    fn remember<C: CacheBackend>(
        &self,
        cache: &ResolutionCache<C>,
        tenant: &str,
        kind: OwnerKind,
        owner_id: &str,
        location: &ResolvedLocation,
        observed: u64,
    ) {
        match self {
            Target::Preference { locale } => {
                cache.put_preference(tenant, kind, owner_id, locale, location, observed)
            }
            Target::Text { screen, locale } => {
                let (screen, locale) = text_key_parts(screen, locale);
                cache.put_text(tenant, kind, owner_id, &screen, &locale, location, observed)
            }
        }
    }

    fn forget<C: CacheBackend>(
        &self,
        cache: &ResolutionCache<C>,
        tenant: &str,
        kind: OwnerKind,
        owner_id: &str,
    ) -> LiveryResult<bool> {
        match self {
            Target::Preference { locale } => cache.remove_preference(tenant, kind, owner_id, locale),
            Target::Text { screen, locale } => {
                let (screen, locale) = text_key_parts(screen, locale);
                cache.invalidate_text(tenant, kind, owner_id, &screen, &locale)
            }
        }
    }
}

/// Hierarchical resolver for branding preferences and custom text.
pub struct BrandingResolver<C: CacheBackend> {
    store: BrandingStore,
    directory: Arc<dyn OrganizationDirectory>,
    shared_apps: Option<Arc<dyn SharedApplicationResolver>>,
    cache: ResolutionCache<C>,
    content: Arc<CustomContentDao<C>>,
}

impl<C: CacheBackend> BrandingResolver<C> {
    pub fn new(
        store: BrandingStore,
        directory: Arc<dyn OrganizationDirectory>,
        cache: ResolutionCache<C>,
        content: Arc<CustomContentDao<C>>,
    ) -> Self {
        Self {
            store,
            directory,
            shared_apps: None,
            cache,
            content,
        }
    }

    /// Map applications to their parent-organization counterparts while
    /// ascending. Without this, ancestors are searched at organization level
    /// only.
    pub fn with_shared_applications(mut self, resolver: Arc<dyn SharedApplicationResolver>) -> Self {
        self.shared_apps = Some(resolver);
        self
    }

    pub fn store(&self) -> &BrandingStore {
        &self.store
    }

    pub fn cache(&self) -> &ResolutionCache<C> {
        &self.cache
    }

    pub fn content(&self) -> &Arc<CustomContentDao<C>> {
        &self.content
    }

    /// Effective branding preference for an owner in the active tenant.
    ///
    /// The returned preference names the owner it was found at. A custom
    /// layout stored for that owner is attached under `layout.content`.
    pub fn resolve_preference(
        &self,
        exec: &mut ExecutionContext,
        kind: OwnerKind,
        owner_id: &str,
        locale: &str,
    ) -> LiveryResult<Preference> {
        let (location, mut document) =
            self.resolve(exec, kind, owner_id, Target::Preference { locale })?;

        if payload::uses_custom_layout(&document) {
            let tenant = TenantContext::new(&location.tenant_domain, &location.organization_id);
            let owner = layout_owner(&tenant, location.resolved_kind, &location.resolved_owner_id);
            if let Some(content) = self.content.get(&owner)? {
                payload::attach_layout_content(&mut document, &content);
            }
        }

        Ok(Preference::new(
            location.resolved_kind,
            location.resolved_owner_id,
            locale,
            document,
        ))
    }

    /// Effective custom text for one screen of an owner in the active tenant.
    pub fn resolve_custom_text(
        &self,
        exec: &mut ExecutionContext,
        kind: OwnerKind,
        owner_id: &str,
        screen: &str,
        locale: &str,
    ) -> LiveryResult<CustomText> {
        let (location, document) = self.resolve(exec, kind, owner_id, Target::Text { screen, locale })?;
        Ok(CustomText::new(
            location.resolved_kind,
            location.resolved_owner_id,
            screen,
            locale,
            document,
        ))
    }

    fn resolve(
        &self,
        exec: &mut ExecutionContext,
        kind: OwnerKind,
        owner_id: &str,
        target: Target<'_>,
    ) -> LiveryResult<(ResolvedLocation, Value)> {
        let requesting = exec.current().clone();
        if kind == OwnerKind::Organization && owner_id != requesting.tenant_domain {
            return Err(ResolutionError::InvalidOwner {
                owner_id: owner_id.to_string(),
                tenant_domain: requesting.tenant_domain,
            }
            .into());
        }

        // Taken before the lookup so a write during the walk keeps its result out of the cache.
        let observed = self.cache.generation();
        if let Some(location) = target.cached(&self.cache, &requesting.tenant_domain, kind, owner_id)
        {
            return self.fetch_cached(&requesting, kind, owner_id, target, location);
        }

        match self.walk(exec, kind, owner_id, target)? {
            Some((location, document)) => {
                target.remember(
                    &self.cache,
                    &requesting.tenant_domain,
                    kind,
                    owner_id,
                    &location,
                    observed,
                );
                Ok((location, document))
            }
            None => Err(target.not_found(kind, owner_id, &requesting)),
        }
    }

    /// Fetch the document a cache entry points at.
    ///
    /// A vanished target removes the entry and reports NotFound without
    /// walking.
    fn fetch_cached(
        &self,
        requesting: &TenantContext,
        kind: OwnerKind,
        owner_id: &str,
        target: Target<'_>,
        location: ResolvedLocation,
    ) -> LiveryResult<(ResolvedLocation, Value)> {
        let tenant = TenantContext::new(&location.tenant_domain, &location.organization_id);
        let resource_type = target.resource_type(location.resolved_kind);
        let resource_name = target.resource_name(location.resolved_kind, &location.resolved_owner_id);

        match self.store.load(&tenant, resource_type, &resource_name)? {
            Some(document) => {
                debug!(
                    tenant = %requesting.tenant_domain,
                    %kind,
                    owner_id,
                    resolved_owner_id = %location.resolved_owner_id,
                    "Resolved from cache"
                );
                Ok((location, document))
            }
            None => {
                warn!(
                    tenant = %requesting.tenant_domain,
                    %kind,
                    owner_id,
                    resource_type,
                    resource_name = %resource_name,
                    "Cached resolution points at a missing resource"
                );
                target.forget(&self.cache, &requesting.tenant_domain, kind, owner_id)?;
                Err(target.not_found(kind, owner_id, requesting))
            }
        }
    }

    /// Look for a configured document at one level.
    fn try_level(
        &self,
        tenant: &TenantContext,
        application_id: Option<&str>,
        target: Target<'_>,
    ) -> LiveryResult<Option<(ResolvedLocation, Value)>> {
        let candidates = application_id
            .map(|app| (OwnerKind::Application, app))
            .into_iter()
            .chain(std::iter::once((
                OwnerKind::Organization,
                tenant.tenant_domain.as_str(),
            )));

        for (kind, owner) in candidates {
            let resource_type = target.resource_type(kind);
            let resource_name = target.resource_name(kind, owner);
            match self.store.load(tenant, resource_type, &resource_name)? {
                Some(document) if target.accepts(&document) => {
                    let location = ResolvedLocation {
                        requesting_owner_id: String::new(),
                        resolved_owner_id: owner.to_string(),
                        resolved_kind: kind,
                        tenant_domain: tenant.tenant_domain.clone(),
                        organization_id: tenant.organization_id.clone(),
                    };
                    return Ok(Some((location, document)));
                }
                Some(_) => {
                    debug!(
                        tenant = %tenant.tenant_domain,
                        resource_type,
                        resource_name = %resource_name,
                        "Skipping unpublished preference"
                    );
                }
                None => {}
            }
        }
        Ok(None)
    }

    fn walk(
        &self,
        exec: &mut ExecutionContext,
        kind: OwnerKind,
        owner_id: &str,
        target: Target<'_>,
    ) -> LiveryResult<Option<(ResolvedLocation, Value)>> {
        let mut scope = exec.scope();
        let mut application_id = match kind {
            OwnerKind::Application => Some(owner_id.to_string()),
            OwnerKind::Organization => None,
        };
        let mut previous_depth: Option<u32> = None;

        loop {
            let tenant = scope.current().clone();

            if let Some((mut location, document)) =
                self.try_level(&tenant, application_id.as_deref(), target)?
            {
                location.requesting_owner_id = owner_id.to_string();
                debug!(
                    %kind,
                    owner_id,
                    resolved_kind = %location.resolved_kind,
                    resolved_owner_id = %location.resolved_owner_id,
                    hops = scope.depth(),
                    "Resolved by walking the hierarchy"
                );
                return Ok(Some((location, document)));
            }

            let organization_id = tenant.organization_id.as_str();
            let depth = self
                .directory
                .depth(organization_id)
                .map_err(|e| directory_failure(organization_id, e))?;
            if depth == 0 {
                return Ok(None);
            }
            if previous_depth.is_some_and(|previous| depth >= previous) {
                return Err(directory_failure(
                    organization_id,
                    DirectoryError::Unavailable(format!(
                        "depth {} does not decrease toward the root",
                        depth
                    )),
                ));
            }
            previous_depth = Some(depth);

            let parent_id = self
                .directory
                .parent_id(organization_id)
                .map_err(|e| directory_failure(organization_id, e))?;
            let parent_domain = self
                .directory
                .resolve_tenant_domain(&parent_id)
                .map_err(|e| directory_failure(&parent_id, e))?;

            application_id = match (application_id, &self.shared_apps) {
                (Some(app), Some(shared)) => shared
                    .parent_application_id(&app, organization_id, &parent_id)
                    .map_err(|e| directory_failure(organization_id, e))?,
                _ => None,
            };

            debug!(
                from = organization_id,
                to = %parent_id,
                depth,
                application_id = ?application_id,
                "Ascending to parent organization"
            );
            scope.enter(TenantContext::new(parent_domain, parent_id));
        }
    }
}
