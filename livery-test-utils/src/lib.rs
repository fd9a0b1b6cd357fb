//! Livery Test Utilities
//!
//! Shared test infrastructure for the livery workspace:
//! - In-memory resource store and scripted organization directory with call
//!   counters
//! - A content row store wrapper that fails batch inserts on demand
//! - Recording and vetoing listeners
//! - A harness wiring a manager over in-memory collaborators
//! - Fixtures and proptest generators

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub use livery_core::{
    ContentOwner, CustomLayoutContent, CustomText, ErrorCode, LiveryConfig, LiveryError,
    LiveryResult, OwnerKind, Preference, StorageError,
};
pub use livery_resolver::{
    BrandingPreferenceManager, BrandingResolver, BrandingStore, DirectoryError,
    ExecutionContext, ListenerError, OrganizationDirectory, PreferenceEvent, PreferenceListener,
    Resource, ResourceFileRef, ResourceStore, ResourceStoreError, SharedApplicationResolver,
    TenantContext,
};
pub use livery_storage::{
    CacheConfig, ContentPart, ContentRow, ContentRowStore, ContentTransaction, CustomContentDao,
    InMemoryCacheBackend, InMemoryContentStore, ReadThroughCache, ResolutionCache,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ============================================================================
// RESOURCE STORE
// ============================================================================

type ResourceKey = (String, String, String);

type Hook = Box<dyn FnOnce() + Send>;

/// A callback run at most once.
#[derive(Default)]
struct OnceHook(Mutex<Option<Hook>>);

impl OnceHook {
    fn set(&self, hook: Hook) {
        *lock(&self.0) = Some(hook);
    }

    fn fire(&self) {
        let hook = lock(&self.0).take();
        if let Some(hook) = hook {
            hook();
        }
    }
}

impl std::fmt::Debug for OnceHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("OnceHook")
            .field(&lock(&self.0).is_some())
            .finish()
    }
}

/// Resource store keeping documents per (tenant domain, type, name).
#[derive(Debug, Default)]
pub struct InMemoryResourceStore {
    resources: Mutex<HashMap<ResourceKey, Vec<(String, Vec<u8>)>>>,
    reads: AtomicUsize,
    unavailable: AtomicBool,
    writes_failing: AtomicBool,
    on_miss: OnceHook,
}

impl InMemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw bytes, bypassing validation (e.g. to plant corrupt data).
    pub fn put_raw(&self, tenant_domain: &str, resource_type: &str, name: &str, bytes: &[u8]) {
        lock(&self.resources).insert(
            (tenant_domain.to_string(), resource_type.to_string(), name.to_string()),
            vec![(name.to_string(), bytes.to_vec())],
        );
    }

    pub fn contains(&self, tenant_domain: &str, resource_type: &str, name: &str) -> bool {
        lock(&self.resources).contains_key(&(
            tenant_domain.to_string(),
            resource_type.to_string(),
            name.to_string(),
        ))
    }

    pub fn len(&self) -> usize {
        lock(&self.resources).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `get_files` calls so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make every call fail with a generic error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make add, replace and delete fail while reads keep working.
    pub fn set_writes_failing(&self, failing: bool) {
        self.writes_failing.store(failing, Ordering::SeqCst);
    }

    /// Run `hook` once, the next time `get_files` finds nothing. The hook
    /// runs after the miss was observed and before it is reported.
    pub fn on_next_miss(&self, hook: impl FnOnce() + Send + 'static) {
        self.on_miss.set(Box::new(hook));
    }

    fn check_writable(&self) -> Result<(), ResourceStoreError> {
        self.check_available()?;
        if self.writes_failing.load(Ordering::SeqCst) {
            Err(ResourceStoreError::Other("resource store is read-only".to_string()))
        } else {
            Ok(())
        }
    }

    fn check_available(&self) -> Result<(), ResourceStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(ResourceStoreError::Other("resource store unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    fn key(tenant: &TenantContext, resource_type: &str, name: &str) -> ResourceKey {
        (
            tenant.tenant_domain.clone(),
            resource_type.to_string(),
            name.to_string(),
        )
    }

    fn not_found(resource_type: &str, name: &str) -> ResourceStoreError {
        ResourceStoreError::NotFound {
            resource_type: resource_type.to_string(),
            resource_name: name.to_string(),
        }
    }
}

impl ResourceStore for InMemoryResourceStore {
    fn get_files(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
        resource_name: &str,
    ) -> Result<Vec<ResourceFileRef>, ResourceStoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let found = lock(&self.resources)
            .get(&Self::key(tenant, resource_type, resource_name))
            .map(|files| {
                files
                    .iter()
                    .map(|(name, _)| ResourceFileRef {
                        id: name.clone(),
                        name: name.clone(),
                    })
                    .collect()
            });
        match found {
            Some(files) => Ok(files),
            None => {
                self.on_miss.fire();
                Err(Self::not_found(resource_type, resource_name))
            }
        }
    }

    fn get_file_by_id(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
        resource_name: &str,
        file_id: &str,
    ) -> Result<Box<dyn Read + Send>, ResourceStoreError> {
        self.check_available()?;
        lock(&self.resources)
            .get(&Self::key(tenant, resource_type, resource_name))
            .and_then(|files| files.iter().find(|(name, _)| name == file_id))
            .map(|(_, bytes)| Box::new(Cursor::new(bytes.clone())) as Box<dyn Read + Send>)
            .ok_or_else(|| Self::not_found(resource_type, resource_name))
    }

    fn add_resource(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
        resource: Resource,
    ) -> Result<(), ResourceStoreError> {
        self.check_writable()?;
        let mut resources = lock(&self.resources);
        let key = Self::key(tenant, resource_type, &resource.name);
        if resources.contains_key(&key) {
            return Err(ResourceStoreError::AlreadyExists {
                resource_type: resource_type.to_string(),
                resource_name: resource.name,
            });
        }
        resources.insert(
            key,
            resource.files.into_iter().map(|f| (f.name, f.content)).collect(),
        );
        Ok(())
    }

    fn replace_resource(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
        resource: Resource,
    ) -> Result<(), ResourceStoreError> {
        self.check_writable()?;
        let mut resources = lock(&self.resources);
        let key = Self::key(tenant, resource_type, &resource.name);
        match resources.get_mut(&key) {
            Some(files) => {
                *files = resource.files.into_iter().map(|f| (f.name, f.content)).collect();
                Ok(())
            }
            None => Err(Self::not_found(resource_type, &resource.name)),
        }
    }

    fn delete_resource(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
        resource_name: &str,
    ) -> Result<(), ResourceStoreError> {
        self.check_writable()?;
        lock(&self.resources)
            .remove(&Self::key(tenant, resource_type, resource_name))
            .map(|_| ())
            .ok_or_else(|| Self::not_found(resource_type, resource_name))
    }

    fn delete_resources_by_type(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
    ) -> Result<(), ResourceStoreError> {
        self.check_writable()?;
        lock(&self.resources)
            .retain(|(domain, rtype, _), _| !(domain == &tenant.tenant_domain && rtype == resource_type));
        Ok(())
    }

    fn list_resource_names(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
    ) -> Result<Vec<String>, ResourceStoreError> {
        self.check_available()?;
        let mut names: Vec<String> = lock(&self.resources)
            .keys()
            .filter(|(domain, rtype, _)| domain == &tenant.tenant_domain && rtype == resource_type)
            .map(|(_, _, name)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }
}

// ============================================================================
// ORGANIZATION DIRECTORY
// ============================================================================

#[derive(Debug, Clone)]
struct OrganizationNode {
    parent_id: Option<String>,
    depth: u32,
    tenant_domain: String,
}

/// Organization directory built up by tests, counting every call.
#[derive(Debug, Default)]
pub struct ScriptedDirectory {
    organizations: Mutex<HashMap<String, OrganizationNode>>,
    calls: AtomicUsize,
    failing: Mutex<HashSet<String>>,
}

impl ScriptedDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root organization (depth 0).
    pub fn add_root(&self, organization_id: &str, tenant_domain: &str) -> TenantContext {
        lock(&self.organizations).insert(
            organization_id.to_string(),
            OrganizationNode {
                parent_id: None,
                depth: 0,
                tenant_domain: tenant_domain.to_string(),
            },
        );
        TenantContext::new(tenant_domain, organization_id)
    }

    /// Register a child of an existing organization.
    pub fn add_child(
        &self,
        organization_id: &str,
        tenant_domain: &str,
        parent_id: &str,
    ) -> TenantContext {
        let mut organizations = lock(&self.organizations);
        let depth = organizations
            .get(parent_id)
            .map(|parent| parent.depth + 1)
            .unwrap_or(1);
        organizations.insert(
            organization_id.to_string(),
            OrganizationNode {
                parent_id: Some(parent_id.to_string()),
                depth,
                tenant_domain: tenant_domain.to_string(),
            },
        );
        TenantContext::new(tenant_domain, organization_id)
    }

    /// A linear chain `org-0` (root) .. `org-{levels}`, returned root first.
    /// Tenant domains are `org-N.com`.
    pub fn chain(levels: usize) -> (Self, Vec<TenantContext>) {
        let directory = Self::new();
        let mut tenants = vec![directory.add_root("org-0", "org-0.com")];
        for i in 1..=levels {
            tenants.push(directory.add_child(
                &format!("org-{}", i),
                &format!("org-{}.com", i),
                &format!("org-{}", i - 1),
            ));
        }
        (directory, tenants)
    }

    /// Override the depth reported for an organization.
    pub fn set_depth(&self, organization_id: &str, depth: u32) {
        if let Some(node) = lock(&self.organizations).get_mut(organization_id) {
            node.depth = depth;
        }
    }

    /// Make every lookup of `organization_id` fail.
    pub fn fail_lookups_for(&self, organization_id: &str) {
        lock(&self.failing).insert(organization_id.to_string());
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    fn node(&self, organization_id: &str) -> Result<OrganizationNode, DirectoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if lock(&self.failing).contains(organization_id) {
            return Err(DirectoryError::Unavailable(format!(
                "lookup of {} timed out",
                organization_id
            )));
        }
        lock(&self.organizations)
            .get(organization_id)
            .cloned()
            .ok_or_else(|| DirectoryError::UnknownOrganization(organization_id.to_string()))
    }
}

impl OrganizationDirectory for ScriptedDirectory {
    fn parent_id(&self, organization_id: &str) -> Result<String, DirectoryError> {
        self.node(organization_id)?
            .parent_id
            .ok_or_else(|| DirectoryError::UnknownOrganization(format!("parent of {}", organization_id)))
    }

    fn depth(&self, organization_id: &str) -> Result<u32, DirectoryError> {
        Ok(self.node(organization_id)?.depth)
    }

    fn resolve_tenant_domain(&self, organization_id: &str) -> Result<String, DirectoryError> {
        Ok(self.node(organization_id)?.tenant_domain)
    }
}

/// Fixed mapping of (application, organization, parent organization) to the
/// parent application.
#[derive(Debug, Default)]
pub struct StaticSharedApplications {
    mappings: Mutex<HashMap<(String, String, String), String>>,
}

impl StaticSharedApplications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn share(
        &self,
        application_id: &str,
        organization_id: &str,
        parent_organization_id: &str,
        parent_application_id: &str,
    ) {
        lock(&self.mappings).insert(
            (
                application_id.to_string(),
                organization_id.to_string(),
                parent_organization_id.to_string(),
            ),
            parent_application_id.to_string(),
        );
    }
}

impl SharedApplicationResolver for StaticSharedApplications {
    fn parent_application_id(
        &self,
        application_id: &str,
        organization_id: &str,
        parent_organization_id: &str,
    ) -> Result<Option<String>, DirectoryError> {
        Ok(lock(&self.mappings)
            .get(&(
                application_id.to_string(),
                organization_id.to_string(),
                parent_organization_id.to_string(),
            ))
            .cloned())
    }
}

// ============================================================================
// CONTENT ROW STORE
// ============================================================================

/// Row store wrapper whose batch inserts can be made to fail.
pub struct FailingContentStore {
    inner: Arc<dyn ContentRowStore>,
    fail_batch_inserts: AtomicBool,
    batch_inserts: AtomicUsize,
}

impl FailingContentStore {
    pub fn new(inner: Arc<dyn ContentRowStore>) -> Self {
        Self {
            inner,
            fail_batch_inserts: AtomicBool::new(false),
            batch_inserts: AtomicUsize::new(0),
        }
    }

    pub fn set_fail_batch_inserts(&self, fail: bool) {
        self.fail_batch_inserts.store(fail, Ordering::SeqCst);
    }

    /// Number of batch inserts attempted.
    pub fn batch_insert_count(&self) -> usize {
        self.batch_inserts.load(Ordering::SeqCst)
    }
}

impl ContentRowStore for FailingContentStore {
    fn begin(&self) -> LiveryResult<Box<dyn ContentTransaction + '_>> {
        Ok(Box::new(FailingTransaction {
            inner: self.inner.begin()?,
            store: self,
        }))
    }

    fn load_parts(&self, owner: &ContentOwner) -> LiveryResult<Vec<ContentRow>> {
        self.inner.load_parts(owner)
    }

    fn has_parts(&self, owner: &ContentOwner) -> LiveryResult<bool> {
        self.inner.has_parts(owner)
    }
}

struct FailingTransaction<'a> {
    inner: Box<dyn ContentTransaction + 'a>,
    store: &'a FailingContentStore,
}

impl ContentTransaction for FailingTransaction<'_> {
    fn has_parts(&self, owner: &ContentOwner) -> LiveryResult<bool> {
        self.inner.has_parts(owner)
    }

    fn insert_part(&mut self, owner: &ContentOwner, part: &ContentPart) -> LiveryResult<()> {
        self.inner.insert_part(owner, part)
    }

    fn insert_parts(&mut self, owner: &ContentOwner, parts: &[ContentPart]) -> LiveryResult<()> {
        self.store.batch_inserts.fetch_add(1, Ordering::SeqCst);
        if self.store.fail_batch_inserts.load(Ordering::SeqCst) {
            return Err(StorageError::ContentStore {
                reason: "batch insert failed".to_string(),
            }
            .into());
        }
        self.inner.insert_parts(owner, parts)
    }

    fn delete_parts(&mut self, owner: &ContentOwner) -> LiveryResult<u64> {
        self.inner.delete_parts(owner)
    }

    fn delete_organization(&mut self, organization_id: &str) -> LiveryResult<u64> {
        self.inner.delete_organization(organization_id)
    }

    fn commit(self: Box<Self>) -> LiveryResult<()> {
        let this = *self;
        this.inner.commit()
    }

    fn rollback(self: Box<Self>) -> LiveryResult<()> {
        let this = *self;
        this.inner.rollback()
    }
}

// ============================================================================
// LISTENERS
// ============================================================================

/// Records the name of every event it sees.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<(String, String)>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(tenant domain, event name)` pairs in delivery order.
    pub fn events(&self) -> Vec<(String, String)> {
        lock(&self.events).clone()
    }
}

impl PreferenceListener for RecordingListener {
    fn name(&self) -> &str {
        "recording"
    }

    fn on_event(
        &self,
        tenant_domain: &str,
        event: &PreferenceEvent<'_>,
    ) -> Result<(), ListenerError> {
        lock(&self.events).push((tenant_domain.to_string(), event.name().to_string()));
        Ok(())
    }
}

/// Vetoes events whose name is in its list.
#[derive(Debug)]
pub struct VetoListener {
    events: Vec<&'static str>,
}

impl VetoListener {
    /// Veto the named events (`pre_add`, `pre_update`, `pre_delete`).
    pub fn vetoing(events: &[&'static str]) -> Self {
        Self {
            events: events.to_vec(),
        }
    }
}

impl PreferenceListener for VetoListener {
    fn name(&self) -> &str {
        "veto"
    }

    fn on_event(
        &self,
        _tenant_domain: &str,
        event: &PreferenceEvent<'_>,
    ) -> Result<(), ListenerError> {
        if self.events.contains(&event.name()) {
            Err(ListenerError::NotAllowed(format!("{} is disabled", event.name())))
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// HARNESS
// ============================================================================

/// A manager over in-memory collaborators, with handles to each of them.
pub struct Harness {
    pub resources: Arc<InMemoryResourceStore>,
    pub directory: Arc<ScriptedDirectory>,
    pub cache_backend: Arc<InMemoryCacheBackend>,
    pub manager: BrandingPreferenceManager<InMemoryCacheBackend>,
}

impl Harness {
    pub fn builder(directory: ScriptedDirectory) -> HarnessBuilder {
        HarnessBuilder {
            directory,
            content_store: Arc::new(InMemoryContentStore::new()),
            shared_apps: None,
            listeners: Vec::new(),
            config: LiveryConfig::default(),
        }
    }

    /// Harness over `directory` with default settings.
    pub fn new(directory: ScriptedDirectory) -> Self {
        Self::builder(directory).build()
    }

    pub fn content(&self) -> &CustomContentDao<InMemoryCacheBackend> {
        self.manager.resolver().content()
    }

    /// Store a preference document directly, bypassing the manager.
    pub fn seed_preference(
        &self,
        tenant: &TenantContext,
        kind: OwnerKind,
        owner_id: &str,
        locale: &str,
        payload: &serde_json::Value,
    ) {
        self.resources.put_raw(
            &tenant.tenant_domain,
            livery_core::preference_resource_type(kind),
            &livery_core::preference_resource_name(kind, owner_id, locale),
            payload.to_string().as_bytes(),
        );
    }

    /// Store a custom text document directly, bypassing the manager.
    pub fn seed_text(
        &self,
        tenant: &TenantContext,
        kind: OwnerKind,
        owner_id: &str,
        screen: &str,
        locale: &str,
        payload: &serde_json::Value,
    ) {
        self.resources.put_raw(
            &tenant.tenant_domain,
            livery_core::text_resource_type(kind),
            &livery_core::custom_text_resource_name(kind, owner_id, screen, locale),
            payload.to_string().as_bytes(),
        );
    }
}

pub struct HarnessBuilder {
    directory: ScriptedDirectory,
    content_store: Arc<dyn ContentRowStore>,
    shared_apps: Option<Arc<dyn SharedApplicationResolver>>,
    listeners: Vec<Arc<dyn PreferenceListener>>,
    config: LiveryConfig,
}

impl HarnessBuilder {
    pub fn content_store(mut self, store: Arc<dyn ContentRowStore>) -> Self {
        self.content_store = store;
        self
    }

    pub fn shared_applications(mut self, resolver: Arc<dyn SharedApplicationResolver>) -> Self {
        self.shared_apps = Some(resolver);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn PreferenceListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn config(mut self, config: LiveryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Harness {
        let resources = Arc::new(InMemoryResourceStore::new());
        let directory = Arc::new(self.directory);
        let cache_backend = Arc::new(InMemoryCacheBackend::new());

        let resolution_cache = ResolutionCache::new(ReadThroughCache::new(
            Arc::clone(&cache_backend),
            CacheConfig::for_resolution(&self.config),
        ));
        let content = Arc::new(CustomContentDao::new(
            self.content_store,
            ReadThroughCache::new(
                Arc::clone(&cache_backend),
                CacheConfig::for_content(&self.config),
            ),
        ));

        let mut resolver = BrandingResolver::new(
            BrandingStore::new(resources.clone()),
            directory.clone(),
            resolution_cache,
            content,
        );
        if let Some(shared) = self.shared_apps {
            resolver = resolver.with_shared_applications(shared);
        }

        let mut manager = match BrandingPreferenceManager::new(resolver, self.config) {
            Ok(manager) => manager,
            Err(e) => panic!("invalid harness config: {}", e),
        };
        for listener in self.listeners {
            manager = manager.with_listener(listener);
        }

        Harness {
            resources,
            directory,
            cache_backend,
            manager,
        }
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;
    use serde_json::{json, Value};

    /// Published preference payload with a distinguishing primary color.
    pub fn published_payload(color: &str) -> Value {
        json!({
            "configs": { "isBrandingEnabled": true },
            "theme": { "activeTheme": "LIGHT", "LIGHT": { "colors": { "primary": color } } },
            "urls": { "privacyPolicyURL": "https://example.com/privacy" }
        })
    }

    /// Same as [`published_payload`] with branding disabled.
    pub fn unpublished_payload(color: &str) -> Value {
        let mut payload = published_payload(color);
        payload["configs"]["isBrandingEnabled"] = json!(false);
        payload
    }

    /// Published payload selecting the custom layout with the given parts.
    pub fn custom_layout_payload(html: &str, css: Option<&str>, js: Option<&str>) -> Value {
        let mut content = json!({ "html": html });
        if let Some(css) = css {
            content["css"] = json!(css);
        }
        if let Some(js) = js {
            content["js"] = json!(js);
        }
        let mut payload = published_payload("#000000");
        payload["layout"] = json!({ "activeLayout": "custom", "content": content });
        payload
    }

    pub fn text_payload(heading: &str) -> Value {
        json!({ "login.heading": heading, "login.button": "Sign in" })
    }

    /// Primary color of a payload built by [`published_payload`].
    pub fn primary_color(payload: &Value) -> Option<&str> {
        payload["theme"]["LIGHT"]["colors"]["primary"].as_str()
    }

    pub fn layout(html: &str) -> CustomLayoutContent {
        match CustomLayoutContent::builder().html(html).build() {
            Some(content) => content,
            None => panic!("fixture layout needs non-blank html"),
        }
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    pub fn arb_owner_kind() -> impl Strategy<Value = OwnerKind> {
        prop_oneof![Just(OwnerKind::Organization), Just(OwnerKind::Application)]
    }

    /// Locales in either `en_US` or `en-US` form.
    pub fn arb_locale() -> impl Strategy<Value = String> {
        ("[a-z]{2}", prop_oneof![Just('_'), Just('-')], "[A-Z]{2}")
            .prop_map(|(lang, sep, region)| format!("{}{}{}", lang, sep, region))
    }

    pub fn arb_screen() -> impl Strategy<Value = String> {
        "[a-z][a-z-]{0,15}"
    }

    /// Layout content with a placeholder in the html and optional parts.
    pub fn arb_layout_content() -> impl Strategy<Value = CustomLayoutContent> {
        (
            "[a-z <>/]{0,40}",
            prop::option::of("[a-z{}:; ]{1,40}"),
            prop::option::of("[a-z();]{1,40}"),
        )
            .prop_map(|(body, css, js)| {
                let mut builder =
                    CustomLayoutContent::builder().html(format!("<main>{}{{{{MainSection}}}}</main>", body));
                if let Some(css) = css {
                    builder = builder.css(css);
                }
                if let Some(js) = js {
                    builder = builder.js(js);
                }
                builder.build()
            })
            .prop_filter_map("html is never blank", |content| content)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    use super::*;

    pub fn assert_code<T: std::fmt::Debug>(result: &LiveryResult<T>, code: ErrorCode) {
        match result {
            Err(e) => assert_eq!(e.code(), code, "unexpected error: {}", e),
            Ok(value) => panic!("expected {} error, got Ok({:?})", code, value),
        }
    }

    pub fn assert_not_found<T: std::fmt::Debug>(result: &LiveryResult<T>) {
        match result {
            Err(e) => assert!(e.is_not_found(), "expected not found, got {}", e),
            Ok(value) => panic!("expected not found, got Ok({:?})", value),
        }
    }
}
