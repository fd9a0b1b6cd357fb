//! Helpers over the preference JSON payload.

use crate::CustomLayoutContent;
use serde_json::Value;

pub const CONFIGS_KEY: &str = "configs";
pub const IS_BRANDING_ENABLED_KEY: &str = "isBrandingEnabled";
pub const URLS_KEY: &str = "urls";
pub const LAYOUT_KEY: &str = "layout";
pub const ACTIVE_LAYOUT_KEY: &str = "activeLayout";
pub const LAYOUT_CONTENT_KEY: &str = "content";
pub const CUSTOM_LAYOUT: &str = "custom";

/// Published state of a payload: `configs.isBrandingEnabled`, default true.
///
/// The flag is accepted as a JSON boolean or as the strings `"true"`/`"false"`.
pub fn is_published(payload: &Value) -> bool {
    match payload
        .get(CONFIGS_KEY)
        .and_then(|configs| configs.get(IS_BRANDING_ENABLED_KEY))
    {
        Some(Value::Bool(enabled)) => *enabled,
        Some(Value::String(s)) => !s.trim().eq_ignore_ascii_case("false"),
        _ => true,
    }
}

/// Whether `layout.activeLayout` selects the custom layout.
pub fn uses_custom_layout(payload: &Value) -> bool {
    payload
        .get(LAYOUT_KEY)
        .and_then(|layout| layout.get(ACTIVE_LAYOUT_KEY))
        .and_then(Value::as_str)
        .map(|active| active.eq_ignore_ascii_case(CUSTOM_LAYOUT))
        .unwrap_or(false)
}

/// Remove and return `layout.content` from the payload.
pub fn take_layout_content(payload: &mut Value) -> Option<Value> {
    payload
        .get_mut(LAYOUT_KEY)
        .and_then(Value::as_object_mut)
        .and_then(|layout| layout.remove(LAYOUT_CONTENT_KEY))
}

/// Put stored layout content back under `layout.content`.
pub fn attach_layout_content(payload: &mut Value, content: &CustomLayoutContent) {
    if let Some(layout) = payload.get_mut(LAYOUT_KEY).and_then(Value::as_object_mut) {
        layout.insert(LAYOUT_CONTENT_KEY.to_string(), content.to_json());
    }
}
