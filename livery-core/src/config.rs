//! Configuration types

use crate::{ConfigError, LiveryResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default ceiling for the HTML part of a custom layout (1 MiB).
pub const DEFAULT_CUSTOM_LAYOUT_MAX_HTML_BYTES: usize = 1024 * 1024;

/// Default time-to-live for resolution and content cache entries.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Token the platform replaces with its generated page body.
pub const MAIN_SECTION_PLACEHOLDER: &str = "{{MainSection}}";

/// Runtime configuration for resolution and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveryConfig {
    /// Maximum size of a custom layout's HTML part, in bytes.
    pub custom_layout_max_html_bytes: usize,
    /// Lifetime of a resolution cache entry.
    pub resolution_cache_ttl: Duration,
    /// Lifetime of a custom layout content cache entry.
    pub content_cache_ttl: Duration,
    /// When false every cache lookup misses and nothing is cached.
    pub cache_enabled: bool,
}

impl Default for LiveryConfig {
    fn default() -> Self {
        Self {
            custom_layout_max_html_bytes: DEFAULT_CUSTOM_LAYOUT_MAX_HTML_BYTES,
            resolution_cache_ttl: DEFAULT_CACHE_TTL,
            content_cache_ttl: DEFAULT_CACHE_TTL,
            cache_enabled: true,
        }
    }
}

impl LiveryConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `LIVERY_CUSTOM_LAYOUT_MAX_HTML_BYTES` (default: 1048576)
    /// - `LIVERY_RESOLUTION_CACHE_TTL_SECS` (default: 3600)
    /// - `LIVERY_CONTENT_CACHE_TTL_SECS` (default: 3600)
    /// - `LIVERY_CACHE_ENABLED` (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            custom_layout_max_html_bytes: lookup("LIVERY_CUSTOM_LAYOUT_MAX_HTML_BYTES")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.custom_layout_max_html_bytes),
            resolution_cache_ttl: lookup("LIVERY_RESOLUTION_CACHE_TTL_SECS")
                .and_then(|s| s.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.resolution_cache_ttl),
            content_cache_ttl: lookup("LIVERY_CONTENT_CACHE_TTL_SECS")
                .and_then(|s| s.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.content_cache_ttl),
            cache_enabled: lookup("LIVERY_CACHE_ENABLED")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.cache_enabled),
        }
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - custom_layout_max_html_bytes > 0
    /// - both cache TTLs are positive
    pub fn validate(&self) -> LiveryResult<()> {
        if self.custom_layout_max_html_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "custom_layout_max_html_bytes".to_string(),
                value: self.custom_layout_max_html_bytes.to_string(),
                reason: "custom_layout_max_html_bytes must be greater than 0".to_string(),
            }
            .into());
        }

        if self.resolution_cache_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "resolution_cache_ttl".to_string(),
                value: format!("{:?}", self.resolution_cache_ttl),
                reason: "resolution_cache_ttl must be positive".to_string(),
            }
            .into());
        }

        if self.content_cache_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "content_cache_ttl".to_string(),
                value: format!("{:?}", self.content_cache_ttl),
                reason: "content_cache_ttl must be positive".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
