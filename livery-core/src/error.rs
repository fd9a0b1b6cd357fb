//! Error types for livery operations
//!
//! Errors fall into two classes. Client-class errors are caller-correctable
//! (not found, already exists, invalid payload, vetoed writes). Server-class
//! errors are infrastructure failures and carry the triggering cause in
//! their `reason`.

use crate::OwnerKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// CLASSIFICATION
// ============================================================================

/// Which side of the call is expected to fix the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    Client,
    Server,
}

/// Stable machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Client errors
    // ========================================================================
    PreferenceNotFound,
    CustomTextNotFound,
    PreferenceAlreadyExists,
    CustomTextAlreadyExists,
    CustomLayoutAlreadyExists,
    InvalidPayload,
    InvalidUrl,
    CustomLayoutTooLarge,
    CustomLayoutMissingHtml,
    CustomLayoutMissingPlaceholder,
    OperationNotAllowed,
    InvalidOwner,

    // ========================================================================
    // Server errors
    // ========================================================================
    ResourceStoreFailure,
    DirectoryFailure,
    ContentStoreFailure,
    TransactionFailed,
    CorruptData,
    CacheFailure,
    ListenerFailure,
    InvalidConfig,
}

impl ErrorCode {
    /// Get the class of this error code.
    pub fn class(&self) -> ErrorClass {
        match self {
            ErrorCode::PreferenceNotFound
            | ErrorCode::CustomTextNotFound
            | ErrorCode::PreferenceAlreadyExists
            | ErrorCode::CustomTextAlreadyExists
            | ErrorCode::CustomLayoutAlreadyExists
            | ErrorCode::InvalidPayload
            | ErrorCode::InvalidUrl
            | ErrorCode::CustomLayoutTooLarge
            | ErrorCode::CustomLayoutMissingHtml
            | ErrorCode::CustomLayoutMissingPlaceholder
            | ErrorCode::OperationNotAllowed
            | ErrorCode::InvalidOwner => ErrorClass::Client,

            ErrorCode::ResourceStoreFailure
            | ErrorCode::DirectoryFailure
            | ErrorCode::ContentStoreFailure
            | ErrorCode::TransactionFailed
            | ErrorCode::CorruptData
            | ErrorCode::CacheFailure
            | ErrorCode::ListenerFailure
            | ErrorCode::InvalidConfig => ErrorClass::Server,
        }
    }

    /// The wire form of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::PreferenceNotFound => "PREFERENCE_NOT_FOUND",
            ErrorCode::CustomTextNotFound => "CUSTOM_TEXT_NOT_FOUND",
            ErrorCode::PreferenceAlreadyExists => "PREFERENCE_ALREADY_EXISTS",
            ErrorCode::CustomTextAlreadyExists => "CUSTOM_TEXT_ALREADY_EXISTS",
            ErrorCode::CustomLayoutAlreadyExists => "CUSTOM_LAYOUT_ALREADY_EXISTS",
            ErrorCode::InvalidPayload => "INVALID_PAYLOAD",
            ErrorCode::InvalidUrl => "INVALID_URL",
            ErrorCode::CustomLayoutTooLarge => "CUSTOM_LAYOUT_TOO_LARGE",
            ErrorCode::CustomLayoutMissingHtml => "CUSTOM_LAYOUT_MISSING_HTML",
            ErrorCode::CustomLayoutMissingPlaceholder => "CUSTOM_LAYOUT_MISSING_PLACEHOLDER",
            ErrorCode::OperationNotAllowed => "OPERATION_NOT_ALLOWED",
            ErrorCode::InvalidOwner => "INVALID_OWNER",
            ErrorCode::ResourceStoreFailure => "RESOURCE_STORE_FAILURE",
            ErrorCode::DirectoryFailure => "DIRECTORY_FAILURE",
            ErrorCode::ContentStoreFailure => "CONTENT_STORE_FAILURE",
            ErrorCode::TransactionFailed => "TRANSACTION_FAILED",
            ErrorCode::CorruptData => "CORRUPT_DATA",
            ErrorCode::CacheFailure => "CACHE_FAILURE",
            ErrorCode::ListenerFailure => "LISTENER_FAILURE",
            ErrorCode::InvalidConfig => "INVALID_CONFIG",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ERROR GROUPS
// ============================================================================

/// Hierarchy resolution errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Branding preference not found for {kind} '{owner_id}' (locale {locale}) in tenant {tenant_domain}")]
    PreferenceNotFound {
        kind: OwnerKind,
        owner_id: String,
        locale: String,
        tenant_domain: String,
    },

    #[error("Custom text not found for screen {screen} of {kind} '{owner_id}' (locale {locale}) in tenant {tenant_domain}")]
    CustomTextNotFound {
        kind: OwnerKind,
        owner_id: String,
        screen: String,
        locale: String,
        tenant_domain: String,
    },

    #[error("Organization owner '{owner_id}' does not match tenant {tenant_domain} of the request")]
    InvalidOwner {
        owner_id: String,
        tenant_domain: String,
    },

    #[error("Organization directory lookup failed for {organization_id}: {reason}")]
    DirectoryFailure {
        organization_id: String,
        reason: String,
    },
}

/// Payload and custom layout validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid preference payload: {reason}")]
    InvalidPayload { reason: String },

    #[error("Invalid URL in {field}: '{url}' - {reason}")]
    InvalidUrl {
        field: String,
        url: String,
        reason: String,
    },

    #[error("Custom layout for {owner} has no HTML content")]
    CustomLayoutMissingHtml { owner: String },

    #[error("Custom layout HTML for {owner} is {size} bytes, exceeding the {max} byte limit")]
    CustomLayoutTooLarge {
        owner: String,
        size: usize,
        max: usize,
    },

    #[error("Custom layout HTML for {owner} must contain the {placeholder} placeholder")]
    CustomLayoutMissingPlaceholder { owner: String, placeholder: String },
}

/// Persistence layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Branding preference already exists for {kind} '{owner_id}' (locale {locale}) in tenant {tenant_domain}")]
    PreferenceAlreadyExists {
        kind: OwnerKind,
        owner_id: String,
        locale: String,
        tenant_domain: String,
    },

    #[error("Custom text already exists for screen {screen} of {kind} '{owner_id}' (locale {locale}) in tenant {tenant_domain}")]
    CustomTextAlreadyExists {
        kind: OwnerKind,
        owner_id: String,
        screen: String,
        locale: String,
        tenant_domain: String,
    },

    #[error("Custom layout content already exists for {owner}")]
    CustomLayoutAlreadyExists { owner: String },

    #[error("Resource store failure on {resource_type}/{resource_name}: {reason}")]
    ResourceStore {
        resource_type: String,
        resource_name: String,
        reason: String,
    },

    #[error("Content store failure: {reason}")]
    ContentStore { reason: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Corrupt stored data in {location}: {reason}")]
    CorruptData { location: String, reason: String },

    #[error("Cache failure: {reason}")]
    Cache { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Pre-write notification errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("Operation not allowed for tenant {tenant_domain}: {reason}")]
    NotAllowed {
        tenant_domain: String,
        reason: String,
    },

    #[error("Listener {listener} failed: {reason}")]
    ListenerFailed { listener: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all livery errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LiveryError {
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl LiveryError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            LiveryError::Resolution(e) => match e {
                ResolutionError::PreferenceNotFound { .. } => ErrorCode::PreferenceNotFound,
                ResolutionError::CustomTextNotFound { .. } => ErrorCode::CustomTextNotFound,
                ResolutionError::InvalidOwner { .. } => ErrorCode::InvalidOwner,
                ResolutionError::DirectoryFailure { .. } => ErrorCode::DirectoryFailure,
            },
            LiveryError::Validation(e) => match e {
                ValidationError::InvalidPayload { .. } => ErrorCode::InvalidPayload,
                ValidationError::InvalidUrl { .. } => ErrorCode::InvalidUrl,
                ValidationError::CustomLayoutMissingHtml { .. } => {
                    ErrorCode::CustomLayoutMissingHtml
                }
                ValidationError::CustomLayoutTooLarge { .. } => ErrorCode::CustomLayoutTooLarge,
                ValidationError::CustomLayoutMissingPlaceholder { .. } => {
                    ErrorCode::CustomLayoutMissingPlaceholder
                }
            },
            LiveryError::Storage(e) => match e {
                StorageError::PreferenceAlreadyExists { .. } => ErrorCode::PreferenceAlreadyExists,
                StorageError::CustomTextAlreadyExists { .. } => ErrorCode::CustomTextAlreadyExists,
                StorageError::CustomLayoutAlreadyExists { .. } => {
                    ErrorCode::CustomLayoutAlreadyExists
                }
                StorageError::ResourceStore { .. } => ErrorCode::ResourceStoreFailure,
                StorageError::ContentStore { .. } | StorageError::LockPoisoned => {
                    ErrorCode::ContentStoreFailure
                }
                StorageError::TransactionFailed { .. } => ErrorCode::TransactionFailed,
                StorageError::CorruptData { .. } => ErrorCode::CorruptData,
                StorageError::Cache { .. } => ErrorCode::CacheFailure,
            },
            LiveryError::Notification(e) => match e {
                NotificationError::NotAllowed { .. } => ErrorCode::OperationNotAllowed,
                NotificationError::ListenerFailed { .. } => ErrorCode::ListenerFailure,
            },
            LiveryError::Config(_) => ErrorCode::InvalidConfig,
        }
    }

    pub fn class(&self) -> ErrorClass {
        self.code().class()
    }

    pub fn is_client_error(&self) -> bool {
        self.class() == ErrorClass::Client
    }

    pub fn is_server_error(&self) -> bool {
        self.class() == ErrorClass::Server
    }

    /// True for the "nothing configured" outcome of a lookup or resolution.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::PreferenceNotFound | ErrorCode::CustomTextNotFound
        )
    }
}

/// Result type alias for livery operations.
pub type LiveryResult<T> = Result<T, LiveryError>;

// =============================================================================
// TESTS
// =============================================================================
