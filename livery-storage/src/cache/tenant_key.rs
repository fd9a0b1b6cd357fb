//! Tenant-scoped cache keys.
//!
//! A `TenantScopedKey` cannot be constructed without a tenant, so every
//! cache entry is isolated per tenant by construction.

use livery_core::OwnerKind;

/// Separator byte between key components. Never occurs in UTF-8 text.
const SEPARATOR: u8 = 0xFF;

/// What kind of value a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// Where a branding preference resolved to.
    PreferenceResolution,
    /// Where a custom text resolved to.
    TextResolution,
    /// Assembled custom layout content.
    CustomLayout,
}

impl CacheNamespace {
    fn to_byte(self) -> u8 {
        match self {
            CacheNamespace::PreferenceResolution => 1,
            CacheNamespace::TextResolution => 2,
            CacheNamespace::CustomLayout => 3,
        }
    }
}

/// A cache key that is scoped to a specific tenant.
///
/// # Binary Format
///
/// ```text
/// [tenant][0xFF][namespace][owner kind][owner id][0xFF]([qualifier][0xFF])*
/// ```
///
/// Every variable-length component is terminated by the separator, so the
/// encoding of a tenant or an owner is a strict prefix of exactly the keys
/// belonging to it (`app1` never matches `app10`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantScopedKey {
    /// Private inner data - cannot be constructed externally
    inner: TenantKeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TenantKeyInner {
    tenant: String,
    namespace: CacheNamespace,
    owner_kind: OwnerKind,
    owner_id: String,
    qualifiers: Vec<String>,
}

impl TenantScopedKey {
    /// Create a new tenant-scoped cache key.
    pub fn new(
        tenant: impl Into<String>,
        namespace: CacheNamespace,
        owner_kind: OwnerKind,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            inner: TenantKeyInner {
                tenant: tenant.into(),
                namespace,
                owner_kind,
                owner_id: owner_id.into(),
                qualifiers: Vec::new(),
            },
        }
    }

    /// Narrow the key with an extra component such as a locale or screen.
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.inner.qualifiers.push(qualifier.into());
        self
    }

    pub fn tenant(&self) -> &str {
        &self.inner.tenant
    }

    pub fn namespace(&self) -> CacheNamespace {
        self.inner.namespace
    }

    pub fn owner_kind(&self) -> OwnerKind {
        self.inner.owner_kind
    }

    pub fn owner_id(&self) -> &str {
        &self.inner.owner_id
    }

    pub fn qualifiers(&self) -> &[String] {
        &self.inner.qualifiers
    }

    /// Encode this key to bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Self::owner_prefix(
            &self.inner.tenant,
            self.inner.namespace,
            self.inner.owner_kind,
            &self.inner.owner_id,
        );
        for qualifier in &self.inner.qualifiers {
            bytes.extend_from_slice(qualifier.as_bytes());
            bytes.push(SEPARATOR);
        }
        bytes
    }

    /// Prefix of every key belonging to a tenant.
    pub fn tenant_prefix(tenant: &str) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(tenant.len() + 1);
        prefix.extend_from_slice(tenant.as_bytes());
        prefix.push(SEPARATOR);
        prefix
    }

    /// Prefix of every key of one namespace for a tenant.
    pub fn namespace_prefix(tenant: &str, namespace: CacheNamespace) -> Vec<u8> {
        let mut prefix = Self::tenant_prefix(tenant);
        prefix.push(namespace.to_byte());
        prefix
    }

    /// Prefix of every key of one owner in one namespace, across qualifiers.
    pub fn owner_prefix(
        tenant: &str,
        namespace: CacheNamespace,
        owner_kind: OwnerKind,
        owner_id: &str,
    ) -> Vec<u8> {
        let mut prefix = Self::namespace_prefix(tenant, namespace);
        prefix.push(owner_kind.to_byte());
        prefix.extend_from_slice(owner_id.as_bytes());
        prefix.push(SEPARATOR);
        prefix
    }
}
