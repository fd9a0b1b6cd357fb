//! Payload validation for preference writes.

use livery_core::config::MAIN_SECTION_PLACEHOLDER;
use livery_core::payload::URLS_KEY;
use livery_core::{CustomLayoutContent, ValidationError};
use serde_json::Value;
use url::{ParseError, Url};

/// URL schemes that execute script when followed.
const SCRIPT_SCHEMES: &[&str] = &["javascript"];

const PLACEHOLDER_OPEN: &str = "{{";
const PLACEHOLDER_CLOSE: &str = "}}";

/// A payload must be a JSON object with at least one member.
pub fn validate_payload(payload: &Value) -> Result<(), ValidationError> {
    match payload {
        Value::Object(map) if !map.is_empty() => Ok(()),
        Value::Object(_) => Err(ValidationError::InvalidPayload {
            reason: "payload must not be empty".to_string(),
        }),
        other => Err(ValidationError::InvalidPayload {
            reason: format!("payload must be a JSON object, found {}", json_type(other)),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Check every string under the payload's `urls` section.
pub fn validate_urls(payload: &Value) -> Result<(), ValidationError> {
    match payload.get(URLS_KEY) {
        Some(urls) => walk_urls(URLS_KEY, urls),
        None => Ok(()),
    }
}

fn walk_urls(path: &str, value: &Value) -> Result<(), ValidationError> {
    match value {
        Value::String(url) => validate_url(path, url),
        Value::Object(map) => map
            .iter()
            .try_for_each(|(key, nested)| walk_urls(&format!("{}.{}", path, key), nested)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .try_for_each(|(i, nested)| walk_urls(&format!("{}[{}]", path, i), nested)),
        _ => Ok(()),
    }
}

/// Validate one configured URL.
///
/// Placeholder delimiters are percent-encoded before parsing so that
/// templated URLs such as `https://example.com/{{tenant}}` parse. Relative
/// URLs are accepted.
pub fn validate_url(field: &str, raw: &str) -> Result<(), ValidationError> {
    if raw.trim().is_empty() {
        return Ok(());
    }

    let encoded = raw
        .replace(PLACEHOLDER_OPEN, &urlencoding::encode(PLACEHOLDER_OPEN))
        .replace(PLACEHOLDER_CLOSE, &urlencoding::encode(PLACEHOLDER_CLOSE));

    let invalid = |reason: String| ValidationError::InvalidUrl {
        field: field.to_string(),
        url: raw.to_string(),
        reason,
    };

    match Url::parse(&encoded) {
        Ok(url) => {
            if SCRIPT_SCHEMES
                .iter()
                .any(|scheme| url.scheme().eq_ignore_ascii_case(scheme))
            {
                return Err(invalid(format!("scheme '{}' is not allowed", url.scheme())));
            }
            Ok(())
        }
        Err(ParseError::RelativeUrlWithoutBase) => Ok(()),
        Err(e) => Err(invalid(e.to_string())),
    }
}

/// Validate the `layout.content` object of a payload using the custom layout.
///
/// `owner` names the preference owner in error messages.
pub fn validate_custom_layout(
    raw: Option<&Value>,
    max_html_bytes: usize,
    owner: &str,
) -> Result<CustomLayoutContent, ValidationError> {
    let content = raw
        .and_then(CustomLayoutContent::from_json)
        .ok_or_else(|| ValidationError::CustomLayoutMissingHtml {
            owner: owner.to_string(),
        })?;

    let size = content.html().len();
    if size > max_html_bytes {
        return Err(ValidationError::CustomLayoutTooLarge {
            owner: owner.to_string(),
            size,
            max: max_html_bytes,
        });
    }

    if !content.html().contains(MAIN_SECTION_PLACEHOLDER) {
        return Err(ValidationError::CustomLayoutMissingPlaceholder {
            owner: owner.to_string(),
            placeholder: MAIN_SECTION_PLACEHOLDER.to_string(),
        });
    }

    Ok(content)
}
