//! Livery Core - Branding Data Types
//!
//! Pure data structures and pure functions shared by every livery crate:
//! owner kinds, preferences, custom text, custom layout content, the
//! resource naming convention, payload helpers, configuration and errors.
//! This crate performs no I/O.

pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod naming;
pub mod payload;

pub use config::LiveryConfig;
pub use entities::{
    ContentOwner, CustomLayoutContent, CustomLayoutContentBuilder, CustomText, Preference,
};
pub use enums::{ContentType, OwnerKind};
pub use error::{
    ConfigError, ErrorClass, ErrorCode, LiveryError, LiveryResult, NotificationError,
    ResolutionError, StorageError, ValidationError,
};
pub use naming::{
    custom_text_resource_name, normalize_locale, preference_resource_name,
    preference_resource_type, text_resource_type,
};

