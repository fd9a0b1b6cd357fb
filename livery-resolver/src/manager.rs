//! Preference and custom text management.
//!
//! Writes validate the payload, notify listeners, persist through the
//! resource store (and the custom content DAO for custom layouts) and then
//! invalidate resolution cache entries:
//!
//! - preference add and delete always invalidate the owner's entries;
//! - preference replace invalidates only when the published state changes;
//! - custom text writes invalidate exactly the written (screen, locale) key.
//!
//! Invalidation clears the written owner only. Descendants that resolved
//! through it keep their entries until those expire.

use std::sync::Arc;

use livery_core::naming::{
    custom_text_resource_name, preference_resource_name, preference_resource_type,
    text_resource_type, ALL_RESOURCE_TYPES,
};
use livery_core::{
    payload, CustomLayoutContent, CustomText, LiveryConfig, LiveryResult, OwnerKind, Preference,
    ResolutionError, StorageError,
};
use livery_storage::CacheBackend;
use serde_json::Value;
use tracing::{info, warn};

use crate::context::{ExecutionContext, TenantContext};
use crate::engine::{layout_owner, text_key_parts, BrandingResolver};
use crate::listener::{notify, PreferenceEvent, PreferenceListener};
use crate::validation::{validate_custom_layout, validate_payload, validate_urls};

/// Entry point for branding writes and reads.
pub struct BrandingPreferenceManager<C: CacheBackend> {
    resolver: BrandingResolver<C>,
    listeners: Vec<Arc<dyn PreferenceListener>>,
    config: LiveryConfig,
}

impl<C: CacheBackend> BrandingPreferenceManager<C> {
    pub fn new(resolver: BrandingResolver<C>, config: LiveryConfig) -> LiveryResult<Self> {
        config.validate()?;
        Ok(Self {
            resolver,
            listeners: Vec::new(),
            config,
        })
    }

    pub fn with_listener(mut self, listener: Arc<dyn PreferenceListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn resolver(&self) -> &BrandingResolver<C> {
        &self.resolver
    }

    pub fn config(&self) -> &LiveryConfig {
        &self.config
    }

    // ========================================================================
    // PREFERENCES
    // ========================================================================

    /// Add a preference. A custom layout in the payload is stored separately
    /// and the payload is persisted without it.
    pub fn add_preference(
        &self,
        tenant: &TenantContext,
        preference: Preference,
    ) -> LiveryResult<Preference> {
        check_owner(tenant, preference.kind, &preference.owner_id)?;
        let (document, layout) = self.prepare_preference(&preference)?;

        let resource_type = preference_resource_type(preference.kind);
        let resource_name =
            preference_resource_name(preference.kind, &preference.owner_id, &preference.locale);
        let store = self.resolver.store();
        if store.exists(tenant, resource_type, &resource_name)? {
            return Err(already_exists(tenant, &preference));
        }

        notify(
            &self.listeners,
            &tenant.tenant_domain,
            &PreferenceEvent::PreAdd {
                preference: &preference,
            },
        )?;

        let owner = layout_owner(tenant, preference.kind, &preference.owner_id);
        if let Some(content) = &layout {
            self.resolver.content().update(&owner, Some(content))?;
        }

        let added = store.add(tenant, resource_type, &resource_name, &document);
        let outcome = match added {
            Ok(true) => Ok(()),
            Ok(false) => Err(already_exists(tenant, &preference)),
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            if layout.is_some() {
                if let Err(cleanup) = self.resolver.content().delete(&owner) {
                    warn!(%owner, error = %cleanup, "Failed to remove custom layout after failed add");
                }
            }
            return Err(e);
        }

        self.resolver.cache().invalidate_preference(
            &tenant.tenant_domain,
            preference.kind,
            &preference.owner_id,
        )?;
        info!(
            tenant = %tenant.tenant_domain,
            kind = %preference.kind,
            owner_id = %preference.owner_id,
            locale = %preference.locale,
            custom_layout = layout.is_some(),
            "Branding preference added"
        );
        Ok(preference)
    }

    /// Replace an existing preference.
    pub fn replace_preference(
        &self,
        tenant: &TenantContext,
        preference: Preference,
    ) -> LiveryResult<Preference> {
        check_owner(tenant, preference.kind, &preference.owner_id)?;
        let (document, layout) = self.prepare_preference(&preference)?;

        let resource_type = preference_resource_type(preference.kind);
        let resource_name =
            preference_resource_name(preference.kind, &preference.owner_id, &preference.locale);
        let store = self.resolver.store();
        let old = store
            .load(tenant, resource_type, &resource_name)?
            .map(|payload| {
                Preference::new(
                    preference.kind,
                    &preference.owner_id,
                    &preference.locale,
                    payload,
                )
            })
            .ok_or_else(|| not_found(tenant, preference.kind, &preference.owner_id, &preference.locale))?;

        notify(
            &self.listeners,
            &tenant.tenant_domain,
            &PreferenceEvent::PreUpdate {
                old: &old,
                new: &preference,
            },
        )?;

        // A layout still selected by another locale of the owner is kept.
        let owner = layout_owner(tenant, preference.kind, &preference.owner_id);
        let content = self.resolver.content();
        let previous = content.get(&owner)?;
        let touch_layout = layout.is_some()
            || (previous.is_some()
                && !self.layout_in_use_elsewhere(
                    tenant,
                    preference.kind,
                    &preference.owner_id,
                    &preference.locale,
                )?);
        if touch_layout {
            content.update(&owner, layout.as_ref())?;
        }

        let replaced = store.replace(tenant, resource_type, &resource_name, &document);
        let outcome = match replaced {
            Ok(true) => Ok(()),
            Ok(false) => Err(not_found(
                tenant,
                preference.kind,
                &preference.owner_id,
                &preference.locale,
            )),
            Err(e) => Err(e),
        };
        if let Err(e) = outcome {
            if touch_layout {
                if let Err(cleanup) = content.update(&owner, previous.as_ref()) {
                    warn!(%owner, error = %cleanup, "Failed to restore custom layout after failed replace");
                }
            }
            return Err(e);
        }

        let was_published = old.is_published();
        let is_published = preference.is_published();
        if was_published != is_published {
            self.resolver.cache().invalidate_preference(
                &tenant.tenant_domain,
                preference.kind,
                &preference.owner_id,
            )?;
        }
        info!(
            tenant = %tenant.tenant_domain,
            kind = %preference.kind,
            owner_id = %preference.owner_id,
            locale = %preference.locale,
            was_published,
            is_published,
            "Branding preference replaced"
        );
        Ok(preference)
    }

    /// Delete a preference, and its owner's custom layout unless another
    /// locale of the owner still selects it.
    pub fn delete_preference(
        &self,
        tenant: &TenantContext,
        kind: OwnerKind,
        owner_id: &str,
        locale: &str,
    ) -> LiveryResult<()> {
        check_owner(tenant, kind, owner_id)?;
        let resource_type = preference_resource_type(kind);
        let resource_name = preference_resource_name(kind, owner_id, locale);
        let store = self.resolver.store();

        let old = store
            .load(tenant, resource_type, &resource_name)?
            .map(|payload| Preference::new(kind, owner_id, locale, payload))
            .ok_or_else(|| not_found(tenant, kind, owner_id, locale))?;

        notify(
            &self.listeners,
            &tenant.tenant_domain,
            &PreferenceEvent::PreDelete { preference: &old },
        )?;

        if !store.delete(tenant, resource_type, &resource_name)? {
            return Err(not_found(tenant, kind, owner_id, locale));
        }
        if !self.layout_in_use_elsewhere(tenant, kind, owner_id, locale)? {
            self.resolver
                .content()
                .delete(&layout_owner(tenant, kind, owner_id))?;
        }

        self.resolver
            .cache()
            .invalidate_preference(&tenant.tenant_domain, kind, owner_id)?;
        info!(
            tenant = %tenant.tenant_domain,
            %kind,
            owner_id,
            locale,
            "Branding preference deleted"
        );
        Ok(())
    }

    /// Whether a preference of the owner in a locale other than `locale`
    /// still selects the custom layout.
    ///
    /// Candidates are matched by resource name prefix. An owner whose id
    /// extends this one with `_` may keep the layout alive.
    fn layout_in_use_elsewhere(
        &self,
        tenant: &TenantContext,
        kind: OwnerKind,
        owner_id: &str,
        locale: &str,
    ) -> LiveryResult<bool> {
        let store = self.resolver.store();
        let resource_type = preference_resource_type(kind);
        let own_name = preference_resource_name(kind, owner_id, locale);
        let prefix = preference_resource_name(kind, owner_id, "");

        for name in store.names(tenant, resource_type)? {
            if name == own_name || !name.starts_with(&prefix) {
                continue;
            }
            if let Some(document) = store.load(tenant, resource_type, &name)? {
                if payload::uses_custom_layout(&document) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// The preference stored for exactly this owner, without fallback.
    pub fn get_preference(
        &self,
        tenant: &TenantContext,
        kind: OwnerKind,
        owner_id: &str,
        locale: &str,
    ) -> LiveryResult<Preference> {
        check_owner(tenant, kind, owner_id)?;
        let mut document = self
            .resolver
            .store()
            .load(
                tenant,
                preference_resource_type(kind),
                &preference_resource_name(kind, owner_id, locale),
            )?
            .ok_or_else(|| not_found(tenant, kind, owner_id, locale))?;

        if payload::uses_custom_layout(&document) {
            if let Some(content) = self
                .resolver
                .content()
                .get(&layout_owner(tenant, kind, owner_id))?
            {
                payload::attach_layout_content(&mut document, &content);
            }
        }
        Ok(Preference::new(kind, owner_id, locale, document))
    }

    /// Effective preference, falling back through the hierarchy.
    pub fn resolve_preference(
        &self,
        exec: &mut ExecutionContext,
        kind: OwnerKind,
        owner_id: &str,
        locale: &str,
    ) -> LiveryResult<Preference> {
        self.resolver.resolve_preference(exec, kind, owner_id, locale)
    }

    // ========================================================================
    // CUSTOM TEXT
    // ========================================================================

    pub fn add_custom_text(&self, tenant: &TenantContext, text: CustomText) -> LiveryResult<CustomText> {
        check_owner(tenant, text.kind, &text.owner_id)?;
        validate_payload(&text.payload)?;

        let (resource_type, resource_name) = text_resource(&text);
        if !self
            .resolver
            .store()
            .add(tenant, resource_type, &resource_name, &text.payload)?
        {
            return Err(StorageError::CustomTextAlreadyExists {
                kind: text.kind,
                owner_id: text.owner_id.clone(),
                screen: text.screen.clone(),
                locale: text.locale.clone(),
                tenant_domain: tenant.tenant_domain.clone(),
            }
            .into());
        }

        self.invalidate_text(tenant, &text)?;
        info!(
            tenant = %tenant.tenant_domain,
            kind = %text.kind,
            owner_id = %text.owner_id,
            screen = %text.screen,
            locale = %text.locale,
            "Custom text added"
        );
        Ok(text)
    }

    pub fn replace_custom_text(
        &self,
        tenant: &TenantContext,
        text: CustomText,
    ) -> LiveryResult<CustomText> {
        check_owner(tenant, text.kind, &text.owner_id)?;
        validate_payload(&text.payload)?;

        let (resource_type, resource_name) = text_resource(&text);
        if !self
            .resolver
            .store()
            .replace(tenant, resource_type, &resource_name, &text.payload)?
        {
            return Err(text_not_found(tenant, text.kind, &text.owner_id, &text.screen, &text.locale));
        }

        self.invalidate_text(tenant, &text)?;
        info!(
            tenant = %tenant.tenant_domain,
            kind = %text.kind,
            owner_id = %text.owner_id,
            screen = %text.screen,
            locale = %text.locale,
            "Custom text replaced"
        );
        Ok(text)
    }

    pub fn delete_custom_text(
        &self,
        tenant: &TenantContext,
        kind: OwnerKind,
        owner_id: &str,
        screen: &str,
        locale: &str,
    ) -> LiveryResult<()> {
        check_owner(tenant, kind, owner_id)?;
        let text = CustomText::new(kind, owner_id, screen, locale, Value::Null);
        let (resource_type, resource_name) = text_resource(&text);
        if !self
            .resolver
            .store()
            .delete(tenant, resource_type, &resource_name)?
        {
            return Err(text_not_found(tenant, kind, owner_id, screen, locale));
        }

        self.invalidate_text(tenant, &text)?;
        info!(tenant = %tenant.tenant_domain, %kind, owner_id, screen, locale, "Custom text deleted");
        Ok(())
    }

    /// The custom text stored for exactly this owner, without fallback.
    pub fn get_custom_text(
        &self,
        tenant: &TenantContext,
        kind: OwnerKind,
        owner_id: &str,
        screen: &str,
        locale: &str,
    ) -> LiveryResult<CustomText> {
        check_owner(tenant, kind, owner_id)?;
        let payload = self
            .resolver
            .store()
            .load(
                tenant,
                text_resource_type(kind),
                &custom_text_resource_name(kind, owner_id, screen, locale),
            )?
            .ok_or_else(|| text_not_found(tenant, kind, owner_id, screen, locale))?;
        Ok(CustomText::new(kind, owner_id, screen, locale, payload))
    }

    /// Effective custom text, falling back through the hierarchy.
    pub fn resolve_custom_text(
        &self,
        exec: &mut ExecutionContext,
        kind: OwnerKind,
        owner_id: &str,
        screen: &str,
        locale: &str,
    ) -> LiveryResult<CustomText> {
        self.resolver
            .resolve_custom_text(exec, kind, owner_id, screen, locale)
    }

    // ========================================================================
    // BULK
    // ========================================================================

    /// Delete every preference, custom text and custom layout of a tenant,
    /// and every resolution cached for it.
    pub fn delete_all_for_tenant(&self, tenant: &TenantContext) -> LiveryResult<()> {
        for resource_type in ALL_RESOURCE_TYPES {
            self.resolver.store().delete_by_type(tenant, resource_type)?;
        }
        let layouts = self
            .resolver
            .content()
            .delete_all_for_organization(&tenant.organization_id)?;
        let entries = self.resolver.cache().clear_tenant(&tenant.tenant_domain)?;
        info!(
            tenant = %tenant.tenant_domain,
            layouts,
            cache_entries = entries,
            "Deleted all branding for tenant"
        );
        Ok(())
    }

    /// Drop every cached resolution of one owner, across screens and locales.
    pub fn clear_cached_resolutions(
        &self,
        tenant: &TenantContext,
        kind: OwnerKind,
        owner_id: &str,
    ) -> LiveryResult<u64> {
        self.resolver
            .cache()
            .clear_owner(&tenant.tenant_domain, kind, owner_id)
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    /// Validate a preference and split off its custom layout.
    fn prepare_preference(
        &self,
        preference: &Preference,
    ) -> LiveryResult<(Value, Option<CustomLayoutContent>)> {
        validate_payload(&preference.payload)?;
        validate_urls(&preference.payload)?;

        let mut document = preference.payload.clone();
        let raw = payload::take_layout_content(&mut document);
        let layout = if payload::uses_custom_layout(&document) {
            Some(validate_custom_layout(
                raw.as_ref(),
                self.config.custom_layout_max_html_bytes,
                &preference.owner_id,
            )?)
        } else {
            None
        };
        Ok((document, layout))
    }

    fn invalidate_text(&self, tenant: &TenantContext, text: &CustomText) -> LiveryResult<bool> {
        let (screen, locale) = text_key_parts(&text.screen, &text.locale);
        self.resolver.cache().invalidate_text(
            &tenant.tenant_domain,
            text.kind,
            &text.owner_id,
            &screen,
            &locale,
        )
    }
}

fn check_owner(tenant: &TenantContext, kind: OwnerKind, owner_id: &str) -> LiveryResult<()> {
    if kind == OwnerKind::Organization && owner_id != tenant.tenant_domain {
        return Err(ResolutionError::InvalidOwner {
            owner_id: owner_id.to_string(),
            tenant_domain: tenant.tenant_domain.clone(),
        }
        .into());
    }
    Ok(())
}

fn text_resource(text: &CustomText) -> (&'static str, String) {
    (
        text_resource_type(text.kind),
        custom_text_resource_name(text.kind, &text.owner_id, &text.screen, &text.locale),
    )
}

fn already_exists(tenant: &TenantContext, preference: &Preference) -> livery_core::LiveryError {
    StorageError::PreferenceAlreadyExists {
        kind: preference.kind,
        owner_id: preference.owner_id.clone(),
        locale: preference.locale.clone(),
        tenant_domain: tenant.tenant_domain.clone(),
    }
    .into()
}

fn not_found(
    tenant: &TenantContext,
    kind: OwnerKind,
    owner_id: &str,
    locale: &str,
) -> livery_core::LiveryError {
    ResolutionError::PreferenceNotFound {
        kind,
        owner_id: owner_id.to_string(),
        locale: locale.to_string(),
        tenant_domain: tenant.tenant_domain.clone(),
    }
    .into()
}

fn text_not_found(
    tenant: &TenantContext,
    kind: OwnerKind,
    owner_id: &str,
    screen: &str,
    locale: &str,
) -> livery_core::LiveryError {
    ResolutionError::CustomTextNotFound {
        kind,
        owner_id: owner_id.to_string(),
        screen: screen.to_string(),
        locale: locale.to_string(),
        tenant_domain: tenant.tenant_domain.clone(),
    }
    .into()
}
