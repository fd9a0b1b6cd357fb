//! Livery Resolver - Hierarchical Branding Resolution
//!
//! Resolves branding preferences and custom text for an owner by falling
//! back through applications and organization ancestry to the root tenant,
//! and manages writes with the cache invalidation rules that keep cached
//! resolutions consistent.
//!
//! Collaborators are injected: a [`ResourceStore`] for preference and text
//! documents, an [`OrganizationDirectory`] for ancestry, an optional
//! [`SharedApplicationResolver`], and the caches and custom content DAO from
//! `livery-storage`.

pub mod context;
pub mod directory;
pub mod engine;
pub mod listener;
pub mod manager;
pub mod resource;
pub mod store;
pub mod validation;

pub use context::{ContextScope, ExecutionContext, TenantContext};
pub use directory::{DirectoryError, OrganizationDirectory, SharedApplicationResolver};
pub use engine::BrandingResolver;
pub use listener::{ListenerError, PreferenceEvent, PreferenceListener};
pub use manager::BrandingPreferenceManager;
pub use resource::{Resource, ResourceFile, ResourceFileRef, ResourceStore, ResourceStoreError};
pub use store::BrandingStore;
