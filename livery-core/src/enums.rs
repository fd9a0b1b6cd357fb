//! Enum types shared across livery crates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scope a preference, custom text or layout belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    /// Owner id is a tenant/organization domain.
    Organization,
    /// Owner id is an application identifier.
    Application,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Organization => "organization",
            OwnerKind::Application => "application",
        }
    }

    /// Single-byte discriminant used in binary cache keys.
    pub fn to_byte(self) -> u8 {
        match self {
            OwnerKind::Organization => 0,
            OwnerKind::Application => 1,
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a custom layout, stored as its own row.
///
/// The lowercase names are the values of the `CONTENT_TYPE` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Html,
    Css,
    Js,
}

impl ContentType {
    pub const ALL: [ContentType; 3] = [ContentType::Html, ContentType::Css, ContentType::Js];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Html => "html",
            ContentType::Css => "css",
            ContentType::Js => "js",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "html" => Ok(ContentType::Html),
            "css" => Ok(ContentType::Css),
            "js" => Ok(ContentType::Js),
            other => Err(format!("unknown content type '{}'", other)),
        }
    }
}
