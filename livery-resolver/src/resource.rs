//! Keyed resource store client.
//!
//! Resources are named within a resource type and hold one or more files.
//! Every call runs as the tenant in the supplied [`TenantContext`].

use std::io::Read;

use thiserror::Error;

use crate::context::TenantContext;

/// Reference to a file inside a stored resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFileRef {
    pub id: String,
    pub name: String,
}

/// A file to be written as part of a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFile {
    pub name: String,
    pub content: Vec<u8>,
}

/// A named resource to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub files: Vec<ResourceFile>,
}

impl Resource {
    /// A resource holding a single file named after the resource.
    pub fn single_file(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        Self {
            files: vec![ResourceFile {
                name: name.clone(),
                content: content.into(),
            }],
            name,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResourceStoreError {
    #[error("Resource {resource_type}/{resource_name} not found")]
    NotFound {
        resource_type: String,
        resource_name: String,
    },

    #[error("Resource {resource_type}/{resource_name} already exists")]
    AlreadyExists {
        resource_type: String,
        resource_name: String,
    },

    #[error("Resource store error: {0}")]
    Other(String),
}

/// Resource store consumed by the resolver and the manager.
pub trait ResourceStore: Send + Sync {
    fn get_files(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
        resource_name: &str,
    ) -> Result<Vec<ResourceFileRef>, ResourceStoreError>;

    fn get_file_by_id(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
        resource_name: &str,
        file_id: &str,
    ) -> Result<Box<dyn Read + Send>, ResourceStoreError>;

    fn add_resource(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
        resource: Resource,
    ) -> Result<(), ResourceStoreError>;

    fn replace_resource(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
        resource: Resource,
    ) -> Result<(), ResourceStoreError>;

    fn delete_resource(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
        resource_name: &str,
    ) -> Result<(), ResourceStoreError>;

    fn delete_resources_by_type(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
    ) -> Result<(), ResourceStoreError>;

    /// Names of every resource of a type. An unknown type yields no names.
    fn list_resource_names(
        &self,
        tenant: &TenantContext,
        resource_type: &str,
    ) -> Result<Vec<String>, ResourceStoreError>;
}
