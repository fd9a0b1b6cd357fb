//! JSON documents over the resource store.
//!
//! Translates resource store outcomes into livery results: a missing
//! resource is `None` (or `false` for writes), an unparsable stored document
//! is corrupt data, and anything else is a resource store failure.

use std::io::Read;
use std::sync::Arc;

use livery_core::{LiveryResult, StorageError};
use serde_json::Value;
use tracing::debug;

use crate::context::TenantContext;
use crate::resource::{Resource, ResourceStore, ResourceStoreError};

fn store_failure(resource_type: &str, resource_name: &str, e: impl ToString) -> StorageError {
    StorageError::ResourceStore {
        resource_type: resource_type.to_string(),
        resource_name: resource_name.to_string(),
        reason: e.to_string(),
    }
}

/// Typed access to JSON resources.
#[derive(Clone)]
pub struct BrandingStore {
    resources: Arc<dyn ResourceStore>,
}

impl BrandingStore {
    pub fn new(resources: Arc<dyn ResourceStore>) -> Self {
        Self { resources }
    }

    /// Load and parse a resource's first file.
    pub fn load(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
        resource_name: &str,
    ) -> LiveryResult<Option<Value>> {
        let files = match self
            .resources
            .get_files(tenant, resource_type, resource_name)
        {
            Ok(files) => files,
            Err(ResourceStoreError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(store_failure(resource_type, resource_name, e).into()),
        };

        let Some(file) = files.first() else {
            debug!(
                tenant = %tenant.tenant_domain,
                resource_type,
                resource_name,
                "Resource has no files"
            );
            return Ok(None);
        };

        let mut reader = match self.resources.get_file_by_id(
            tenant,
            resource_type,
            resource_name,
            &file.id,
        ) {
            Ok(reader) => reader,
            Err(ResourceStoreError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(store_failure(resource_type, resource_name, e).into()),
        };

        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| store_failure(resource_type, resource_name, e))?;

        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            StorageError::CorruptData {
                location: format!(
                    "{}/{} in tenant {}",
                    resource_type, resource_name, tenant.tenant_domain
                ),
                reason: e.to_string(),
            }
            .into()
        })
    }

    pub fn exists(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
        resource_name: &str,
    ) -> LiveryResult<bool> {
        match self.resources.get_files(tenant, resource_type, resource_name) {
            Ok(files) => Ok(!files.is_empty()),
            Err(ResourceStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(store_failure(resource_type, resource_name, e).into()),
        }
    }

    /// Add a resource. Returns `false` if one already exists.
    pub fn add(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
        resource_name: &str,
        document: &Value,
    ) -> LiveryResult<bool> {
        let resource = Resource::single_file(resource_name, document.to_string());
        match self.resources.add_resource(tenant, resource_type, resource) {
            Ok(()) => Ok(true),
            Err(ResourceStoreError::AlreadyExists { .. }) => Ok(false),
            Err(e) => Err(store_failure(resource_type, resource_name, e).into()),
        }
    }

    /// Replace a resource. Returns `false` if there was none.
    pub fn replace(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
        resource_name: &str,
        document: &Value,
    ) -> LiveryResult<bool> {
        let resource = Resource::single_file(resource_name, document.to_string());
        match self
            .resources
            .replace_resource(tenant, resource_type, resource)
        {
            Ok(()) => Ok(true),
            Err(ResourceStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(store_failure(resource_type, resource_name, e).into()),
        }
    }

    /// Delete a resource. Returns `false` if there was none.
    pub fn delete(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
        resource_name: &str,
    ) -> LiveryResult<bool> {
        match self
            .resources
            .delete_resource(tenant, resource_type, resource_name)
        {
            Ok(()) => Ok(true),
            Err(ResourceStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(store_failure(resource_type, resource_name, e).into()),
        }
    }

    pub fn delete_by_type(&self, tenant: &TenantContext, resource_type: &str) -> LiveryResult<()> {
        match self.resources.delete_resources_by_type(tenant, resource_type) {
            Ok(()) | Err(ResourceStoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(store_failure(resource_type, "*", e).into()),
        }
    }

    /// Names of the stored resources of a type.
    pub fn names(&self, tenant: &TenantContext, resource_type: &str) -> LiveryResult<Vec<String>> {
        match self.resources.list_resource_names(tenant, resource_type) {
            Ok(names) => Ok(names),
            Err(ResourceStoreError::NotFound { .. }) => Ok(Vec::new()),
            Err(e) => Err(store_failure(resource_type, "*", e).into()),
        }
    }
}
