//! Organization directory and shared application lookups.

use thiserror::Error;

/// Failure reported by a directory implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Organization {0} is not known to the directory")]
    UnknownOrganization(String),

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Organization hierarchy: parents, depths and tenant domains.
///
/// The root organization has depth 0. Every other organization has a parent
/// whose depth is exactly one less.
pub trait OrganizationDirectory: Send + Sync {
    fn parent_id(&self, organization_id: &str) -> Result<String, DirectoryError>;

    fn depth(&self, organization_id: &str) -> Result<u32, DirectoryError>;

    fn resolve_tenant_domain(&self, organization_id: &str) -> Result<String, DirectoryError>;
}

/// Maps an application to the application it was shared from in a parent
/// organization.
pub trait SharedApplicationResolver: Send + Sync {
    /// Id of the application in `parent_organization_id` that
    /// `application_id` (owned by `organization_id`) derives from, if any.
    fn parent_application_id(
        &self,
        application_id: &str,
        organization_id: &str,
        parent_organization_id: &str,
    ) -> Result<Option<String>, DirectoryError>;
}
