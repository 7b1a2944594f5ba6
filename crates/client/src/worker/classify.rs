//! Request classification.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetch::{FetchRequest, RequestMode};
use uninav_core::cache::hash::strip_search;

/// `/{z}/{x}/{y}.png` directly under a tile host.
static TILE_HOST_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/\d+/\d+/\d+\.png$").expect("tile path pattern is valid"));

/// `.../tiles/{z}/{x}/{y}.png` on any host, for self-hosted tile sets.
static LOCAL_TILE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/tiles/\d+/\d+/\d+\.png$").expect("local tile pattern is valid"));

/// Which caching policy a request gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestClass {
    /// Map tile image: cache-first, placeholder on failure.
    Tile,
    /// Application shell asset: cache-first with network fallback.
    Shell,
    /// Full page navigation: network-first, then cached page, then offline page.
    Navigation,
    /// Anything else: network-first with cache fallback.
    Other,
}

/// Classifies intercepted requests by URL and mode.
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    tile_hosts: Vec<String>,
    shell: HashSet<String>,
}

impl RequestClassifier {
    pub fn new(tile_hosts: Vec<String>, shell_urls: &[Url]) -> Self {
        Self {
            tile_hosts: tile_hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect(),
            shell: shell_urls.iter().map(strip_search).collect(),
        }
    }

    pub fn classify(&self, request: &FetchRequest) -> RequestClass {
        if request.is_get() && self.is_tile(&request.url) {
            RequestClass::Tile
        } else if request.mode == RequestMode::Navigate {
            RequestClass::Navigation
        } else if request.is_get() && self.shell.contains(&strip_search(&request.url)) {
            RequestClass::Shell
        } else {
            RequestClass::Other
        }
    }

    /// Whether the URL addresses a map tile.
    pub fn is_tile(&self, url: &Url) -> bool {
        let path = url.path();
        if LOCAL_TILE_PATH.is_match(path) {
            return true;
        }
        url.host_str().is_some_and(|host| self.is_tile_host(host)) && TILE_HOST_PATH.is_match(path)
    }

    fn is_tile_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.tile_hosts
            .iter()
            .any(|known| host == *known || host.strip_suffix(known.as_str()).is_some_and(|rest| rest.ends_with('.')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;

    fn classifier() -> RequestClassifier {
        let shell = [
            Url::parse("http://localhost:8080/").unwrap(),
            Url::parse("http://localhost:8080/index.html").unwrap(),
            Url::parse("https://unpkg.com/leaflet/dist/leaflet.js").unwrap(),
        ];
        RequestClassifier::new(vec!["tile.openstreetmap.org".into()], &shell)
    }

    fn get(u: &str) -> FetchRequest {
        FetchRequest::get(Url::parse(u).unwrap())
    }

    #[test]
    fn test_tile_host_paths() {
        let c = classifier();
        assert_eq!(c.classify(&get("https://a.tile.openstreetmap.org/16/46524/28183.png")), RequestClass::Tile);
        assert_eq!(c.classify(&get("https://tile.openstreetmap.org/0/0/0.png?x=1")), RequestClass::Tile);
    }

    #[test]
    fn test_local_tiles_any_host() {
        let c = classifier();
        assert_eq!(c.classify(&get("http://localhost:8080/tiles/15/23262/14091.png")), RequestClass::Tile);
        assert_eq!(c.classify(&get("https://cdn.example.com/map/tiles/3/1/2.png")), RequestClass::Tile);
    }

    #[test]
    fn test_non_tiles() {
        let c = classifier();
        assert_eq!(c.classify(&get("https://example.com/16/46524/28183.png")), RequestClass::Other);
        assert_eq!(c.classify(&get("https://a.tile.openstreetmap.org/copyright")), RequestClass::Other);
        assert_eq!(c.classify(&get("https://eviltile.openstreetmap.org.example/1/0/0.png")), RequestClass::Other);
        assert_eq!(c.classify(&get("https://nottile.openstreetmap.org/1/0/0.png")), RequestClass::Other);
        assert_eq!(c.classify(&get("https://a.tile.openstreetmap.org/1/0/0.jpg")), RequestClass::Other);
    }

    #[test]
    fn test_post_to_tile_is_other() {
        let c = classifier();
        let request = FetchRequest::new(
            Method::POST,
            Url::parse("https://a.tile.openstreetmap.org/1/0/0.png").unwrap(),
            RequestMode::Cors,
        );
        assert_eq!(c.classify(&request), RequestClass::Other);
    }

    #[test]
    fn test_navigation_and_shell() {
        let c = classifier();
        let nav = FetchRequest::navigate(Url::parse("http://localhost:8080/hostels").unwrap());
        assert_eq!(c.classify(&nav), RequestClass::Navigation);

        assert_eq!(c.classify(&get("https://unpkg.com/leaflet/dist/leaflet.js?v=1.9")), RequestClass::Shell);
        assert_eq!(c.classify(&get("http://localhost:8080/index.html")), RequestClass::Shell);
        assert_eq!(c.classify(&get("http://localhost:8080/script.js")), RequestClass::Other);
    }
}
