//! Resource naming convention for the keyed resource store.
//!
//! These names are shared with other systems reading the same store, so the
//! formats are fixed:
//! - application preference: `lowercase(application_id) + "_" + locale`
//! - organization preference: `tenant_domain + "_" + locale`
//! - custom text: `uppercase(screen) + "_" + lowercase(normalized locale)`

use crate::OwnerKind;

pub const BRANDING_RESOURCE_TYPE: &str = "BRANDING_PREFERENCES";
pub const APPLICATION_BRANDING_RESOURCE_TYPE: &str = "APPLICATION_BRANDING_PREFERENCES";
pub const CUSTOM_TEXT_RESOURCE_TYPE: &str = "CUSTOM_TEXT";
pub const APPLICATION_CUSTOM_TEXT_RESOURCE_TYPE: &str = "APPLICATION_CUSTOM_TEXT";

/// Every resource type this system writes, for bulk tenant teardown.
pub const ALL_RESOURCE_TYPES: [&str; 4] = [
    BRANDING_RESOURCE_TYPE,
    APPLICATION_BRANDING_RESOURCE_TYPE,
    CUSTOM_TEXT_RESOURCE_TYPE,
    APPLICATION_CUSTOM_TEXT_RESOURCE_TYPE,
];

pub fn preference_resource_type(kind: OwnerKind) -> &'static str {
    match kind {
        OwnerKind::Organization => BRANDING_RESOURCE_TYPE,
        OwnerKind::Application => APPLICATION_BRANDING_RESOURCE_TYPE,
    }
}

pub fn text_resource_type(kind: OwnerKind) -> &'static str {
    match kind {
        OwnerKind::Organization => CUSTOM_TEXT_RESOURCE_TYPE,
        OwnerKind::Application => APPLICATION_CUSTOM_TEXT_RESOURCE_TYPE,
    }
}

pub fn preference_resource_name(kind: OwnerKind, owner_id: &str, locale: &str) -> String {
    match kind {
        OwnerKind::Application => format!("{}_{}", owner_id.to_lowercase(), locale),
        OwnerKind::Organization => format!("{}_{}", owner_id, locale),
    }
}

/// Replace `_` with `-` inside a locale token (`en_US` -> `en-US`).
pub fn normalize_locale(locale: &str) -> String {
    locale.replace('_', "-")
}

/// Name of a custom text resource.
///
/// Application texts live under their own resource type and are prefixed
/// with the lowercased application id so that two applications of one tenant
/// never share a name.
pub fn custom_text_resource_name(
    kind: OwnerKind,
    owner_id: &str,
    screen: &str,
    locale: &str,
) -> String {
    let base = format!(
        "{}_{}",
        screen.to_uppercase(),
        normalize_locale(locale).to_lowercase()
    );
    match kind {
        OwnerKind::Organization => base,
        OwnerKind::Application => format!("{}_{}", owner_id.to_lowercase(), base),
    }
}
