//! Branding entity types

use crate::{payload, ContentType, OwnerKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ============================================================================
// PREFERENCES
// ============================================================================

/// A branding preference: theme JSON for one owner and locale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preference {
    pub kind: OwnerKind,
    /// Tenant domain for organizations, application id for applications.
    pub owner_id: String,
    pub locale: String,
    pub payload: Value,
}

impl Preference {
    pub fn new(
        kind: OwnerKind,
        owner_id: impl Into<String>,
        locale: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            kind,
            owner_id: owner_id.into(),
            locale: locale.into(),
            payload,
        }
    }

    /// Whether the preference is active for end users.
    pub fn is_published(&self) -> bool {
        payload::is_published(&self.payload)
    }
}

/// Localized UI text for one screen of one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomText {
    pub kind: OwnerKind,
    pub owner_id: String,
    pub screen: String,
    pub locale: String,
    pub payload: Value,
}

impl CustomText {
    pub fn new(
        kind: OwnerKind,
        owner_id: impl Into<String>,
        screen: impl Into<String>,
        locale: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            kind,
            owner_id: owner_id.into(),
            screen: screen.into(),
            locale: locale.into(),
            payload,
        }
    }
}

// ============================================================================
// CUSTOM LAYOUT CONTENT
// ============================================================================

/// Owner of a custom layout: an organization, or an application inside one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContentOwner {
    Organization {
        organization_id: String,
    },
    Application {
        application_id: String,
        organization_id: String,
    },
}

impl ContentOwner {
    pub fn organization(organization_id: impl Into<String>) -> Self {
        ContentOwner::Organization {
            organization_id: organization_id.into(),
        }
    }

    pub fn application(
        application_id: impl Into<String>,
        organization_id: impl Into<String>,
    ) -> Self {
        ContentOwner::Application {
            application_id: application_id.into(),
            organization_id: organization_id.into(),
        }
    }

    pub fn kind(&self) -> OwnerKind {
        match self {
            ContentOwner::Organization { .. } => OwnerKind::Organization,
            ContentOwner::Application { .. } => OwnerKind::Application,
        }
    }

    /// The organization id or application id, depending on the kind.
    pub fn owner_id(&self) -> &str {
        match self {
            ContentOwner::Organization { organization_id } => organization_id,
            ContentOwner::Application { application_id, .. } => application_id,
        }
    }

    pub fn organization_id(&self) -> &str {
        match self {
            ContentOwner::Organization { organization_id }
            | ContentOwner::Application {
                organization_id, ..
            } => organization_id,
        }
    }
}

impl fmt::Display for ContentOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentOwner::Organization { organization_id } => {
                write!(f, "organization {}", organization_id)
            }
            ContentOwner::Application {
                application_id,
                organization_id,
            } => write!(
                f,
                "application {} (organization {})",
                application_id, organization_id
            ),
        }
    }
}

/// Custom HTML/CSS/JS page layout.
///
/// `html` is always present and non-blank. `css` and `js` are `None` rather
/// than empty strings. The only way to obtain a value is through
/// [`CustomLayoutContentBuilder::build`] or [`CustomLayoutContent::from_parts`],
/// both of which yield `None` when there is no usable HTML. Deserialization
/// goes through the builder as well and fails on a missing or blank `html`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CustomLayoutContentBuilder")]
pub struct CustomLayoutContent {
    html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    css: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    js: Option<String>,
}

impl CustomLayoutContent {
    pub fn builder() -> CustomLayoutContentBuilder {
        CustomLayoutContentBuilder::default()
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn css(&self) -> Option<&str> {
        self.css.as_deref()
    }

    pub fn js(&self) -> Option<&str> {
        self.js.as_deref()
    }

    /// The non-empty parts in storage order (html first).
    pub fn parts(&self) -> Vec<(ContentType, &str)> {
        let mut parts = vec![(ContentType::Html, self.html.as_str())];
        if let Some(css) = &self.css {
            parts.push((ContentType::Css, css.as_str()));
        }
        if let Some(js) = &self.js {
            parts.push((ContentType::Js, js.as_str()));
        }
        parts
    }

    /// Reassemble stored parts. Returns `None` when no HTML part is present.
    pub fn from_parts<I>(parts: I) -> Option<Self>
    where
        I: IntoIterator<Item = (ContentType, String)>,
    {
        let mut builder = Self::builder();
        for (content_type, content) in parts {
            builder = match content_type {
                ContentType::Html => builder.html(content),
                ContentType::Css => builder.css(content),
                ContentType::Js => builder.js(content),
            };
        }
        builder.build()
    }

    /// Read the `{html, css, js}` object embedded in a preference payload.
    pub fn from_json(value: &Value) -> Option<Self> {
        let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
        let mut builder = Self::builder();
        if let Some(html) = field("html") {
            builder = builder.html(html);
        }
        if let Some(css) = field("css") {
            builder = builder.css(css);
        }
        if let Some(js) = field("js") {
            builder = builder.js(js);
        }
        builder.build()
    }

    pub fn to_json(&self) -> Value {
        let mut object = serde_json::Map::new();
        object.insert("html".to_string(), Value::String(self.html.clone()));
        if let Some(css) = &self.css {
            object.insert("css".to_string(), Value::String(css.clone()));
        }
        if let Some(js) = &self.js {
            object.insert("js".to_string(), Value::String(js.clone()));
        }
        Value::Object(object)
    }
}

/// Builder for [`CustomLayoutContent`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomLayoutContentBuilder {
    html: Option<String>,
    css: Option<String>,
    js: Option<String>,
}

impl CustomLayoutContentBuilder {
    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn css(mut self, css: impl Into<String>) -> Self {
        self.css = Some(css.into());
        self
    }

    pub fn js(mut self, js: impl Into<String>) -> Self {
        self.js = Some(js.into());
        self
    }

    /// Build the content, or `None` if the HTML part is missing or blank.
    ///
    /// Blank CSS/JS parts are dropped.
    pub fn build(self) -> Option<CustomLayoutContent> {
        let html = non_blank(self.html)?;
        Some(CustomLayoutContent {
            html,
            css: non_blank(self.css),
            js: non_blank(self.js),
        })
    }
}

impl TryFrom<CustomLayoutContentBuilder> for CustomLayoutContent {
    type Error = String;

    fn try_from(builder: CustomLayoutContentBuilder) -> Result<Self, Self::Error> {
        builder
            .build()
            .ok_or_else(|| "custom layout html is missing or blank".to_string())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
