//! Configuration validation rules.
//!
//! This module provides validation logic for `WorkerConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::WorkerConfig;
use crate::tile::MAX_ZOOM;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl WorkerConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_prefix` or `cache_version` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - `tile_url_template` lacks `{z}`, `{x}` or `{y}`
    /// - `max_zoom` exceeds the supported maximum
    /// - `max_bytes`, `timeout_ms`, `event_buffer` or `max_prefetch_tiles` are out of range
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_prefix.trim().is_empty() {
            return Err(invalid("cache_prefix", "must not be empty"));
        }
        if self.cache_version.trim().is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(_) => return Err(invalid("origin", "must use http or https")),
            Err(e) => return Err(invalid("origin", &e.to_string())),
        }

        if self.offline_page.trim().is_empty() {
            return Err(invalid("offline_page", "must not be empty"));
        }

        for placeholder in ["{z}", "{x}", "{y}"] {
            if !self.tile_url_template.contains(placeholder) {
                return Err(ConfigError::Invalid {
                    field: "tile_url_template".into(),
                    reason: format!("missing {placeholder} placeholder"),
                });
            }
        }
        if self.tile_url_template.contains("{s}") && self.tile_subdomains.is_empty() {
            return Err(invalid("tile_subdomains", "template uses {s} but no subdomains are configured"));
        }

        if self.max_zoom > MAX_ZOOM {
            return Err(ConfigError::Invalid {
                field: "max_zoom".into(),
                reason: format!("must not exceed {MAX_ZOOM}"),
            });
        }
        if self.max_prefetch_tiles == 0 {
            return Err(invalid("max_prefetch_tiles", "must be greater than 0"));
        }
        if self.event_buffer == 0 {
            return Err(invalid("event_buffer", "must be greater than 0"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.tile_hosts.is_empty() {
            tracing::warn!("tile_hosts is empty; only /tiles/{{z}}/{{x}}/{{y}}.png paths will be treated as tiles");
        }

        Ok(())
    }
}
