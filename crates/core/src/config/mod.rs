//! Worker configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (UNINAV_*)
//! 2. TOML config file (if UNINAV_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Worker configuration with layered loading.
///
/// Cache partition names are derived from `cache_prefix` and `cache_version`,
/// so deploying a new version is a config change rather than a code edit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Path to SQLite cache database.
    ///
    /// Set via UNINAV_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Prefix shared by every partition this worker owns.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version suffix for partition names. Bumping it retires the old partitions on activate.
    ///
    /// Set via UNINAV_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin the page is served from; relative manifest entries resolve against it.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Application shell assets precached on install.
    #[serde(default = "default_shell_manifest")]
    pub shell_manifest: Vec<String>,

    /// Cached page served when a navigation fails and nothing better is cached.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// Hosts whose `/{z}/{x}/{y}.png` paths are treated as map tiles.
    ///
    /// Subdomains match too, so `tile.openstreetmap.org` covers `a.tile.openstreetmap.org`.
    #[serde(default = "default_tile_hosts")]
    pub tile_hosts: Vec<String>,

    /// Tile URL template with `{s}`, `{z}`, `{x}` and `{y}` placeholders.
    #[serde(default = "default_tile_url_template")]
    pub tile_url_template: String,

    /// Mirror subdomains substituted for `{s}`.
    #[serde(default = "default_tile_subdomains")]
    pub tile_subdomains: Vec<String>,

    /// Highest zoom level a prefetch may request.
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,

    /// Largest number of tiles a single prefetch job may expand to.
    #[serde(default = "default_max_prefetch_tiles")]
    pub max_prefetch_tiles: usize,

    /// Prefetch fetches in flight at once. `0` dispatches every tile at once.
    #[serde(default)]
    pub prefetch_concurrency: usize,

    /// Pause after each tile fetched over the network during prefetch.
    #[serde(default)]
    pub prefetch_delay_ms: u64,

    /// Activate as soon as install completes instead of waiting.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Capacity of the client broadcast channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via UNINAV_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./uninav-cache.sqlite")
}

fn default_cache_prefix() -> String {
    "uninav".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_shell_manifest() -> Vec<String> {
    vec![
        "/".into(),
        "/index.html".into(),
        "https://unpkg.com/leaflet/dist/leaflet.css".into(),
        "https://unpkg.com/leaflet/dist/leaflet.js".into(),
    ]
}

fn default_offline_page() -> String {
    "/index.html".into()
}

fn default_tile_hosts() -> Vec<String> {
    vec!["tile.openstreetmap.org".into()]
}

fn default_tile_url_template() -> String {
    "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".into()
}

fn default_tile_subdomains() -> Vec<String> {
    vec!["a".into(), "b".into(), "c".into()]
}

fn default_max_zoom() -> u8 {
    19
}

fn default_max_prefetch_tiles() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_event_buffer() -> usize {
    4096
}

fn default_user_agent() -> String {
    "uninav-worker/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            shell_manifest: default_shell_manifest(),
            offline_page: default_offline_page(),
            tile_hosts: default_tile_hosts(),
            tile_url_template: default_tile_url_template(),
            tile_subdomains: default_tile_subdomains(),
            max_zoom: default_max_zoom(),
            max_prefetch_tiles: default_max_prefetch_tiles(),
            prefetch_concurrency: 0,
            prefetch_delay_ms: 0,
            skip_waiting: true,
            event_buffer: default_event_buffer(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

/// Versioned partition names owned by one worker version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
    pub shell: String,
    pub tiles: String,
}

impl CacheNames {
    /// Partitions that survive activation. Everything else is stale.
    pub fn allow_list(&self) -> Vec<String> {
        vec![self.shell.clone(), self.tiles.clone()]
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        name == self.shell || name == self.tiles
    }
}

impl WorkerConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Pacing delay between prefetched tiles, if any.
    pub fn prefetch_delay(&self) -> Option<Duration> {
        (self.prefetch_delay_ms > 0).then(|| Duration::from_millis(self.prefetch_delay_ms))
    }

    /// Partition names for the configured prefix and version.
    pub fn cache_names(&self) -> CacheNames {
        CacheNames {
            shell: format!("{}-app-{}", self.cache_prefix, self.cache_version),
            tiles: format!("{}-tiles-{}", self.cache_prefix, self.cache_version),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `UNINAV_`
    /// 2. TOML file from `UNINAV_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("UNINAV_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("UNINAV_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WorkerConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./uninav-cache.sqlite"));
        assert_eq!(config.user_agent, "uninav-worker/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.shell_manifest.len(), 4);
        assert_eq!(config.offline_page, "/index.html");
        assert!(config.skip_waiting);
        assert_eq!(config.prefetch_concurrency, 0);
        assert!(config.prefetch_delay().is_none());
    }

    #[test]
    fn test_timeout_duration() {
        let config = WorkerConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_cache_names_follow_version() {
        let v1 = WorkerConfig::default().cache_names();
        assert_eq!(v1.shell, "uninav-app-v1");
        assert_eq!(v1.tiles, "uninav-tiles-v1");

        let v2 = WorkerConfig { cache_version: "v2".into(), ..Default::default() }.cache_names();
        assert_eq!(v2.allow_list(), vec!["uninav-app-v2".to_string(), "uninav-tiles-v2".to_string()]);
        assert!(!v2.is_allowed("uninav-app-v1"));
        assert!(v2.is_allowed("uninav-tiles-v2"));
    }

    #[test]
    fn test_prefetch_delay() {
        let config = WorkerConfig { prefetch_delay_ms: 50, ..Default::default() };
        assert_eq!(config.prefetch_delay(), Some(Duration::from_millis(50)));
    }
}
