//! Request routing: one caching policy per request class.
//!
//! `handle_fetch` always resolves. Cache read failures count as misses and
//! cache write failures are logged; neither reaches the caller.

use reqwest::StatusCode;
use url::Url;

use super::{RequestClass, ResponseSource, RoutedResponse, Worker};
use crate::fetch::{FetchRequest, FetchResponse};
use uninav_core::{CachedResponse, MatchOptions};

impl Worker {
    /// Resolve an intercepted request.
    ///
    /// Before activation the worker doesn't control the page, so the request
    /// goes straight to the network.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> RoutedResponse {
        let class = self.classify(request);

        if !self.is_controlling().await {
            return self.passthrough(class, request).await;
        }

        match class {
            RequestClass::Tile => self.cache_first_tile(request).await,
            RequestClass::Shell => self.cache_first(class, request).await,
            RequestClass::Navigation => self.network_first_navigation(request).await,
            RequestClass::Other => self.network_first(class, request).await,
        }
    }

    /// Which caching policy a request falls under.
    pub fn classify(&self, request: &FetchRequest) -> RequestClass {
        self.classifier.classify(request)
    }

    async fn passthrough(&self, class: RequestClass, request: &FetchRequest) -> RoutedResponse {
        match self.network.fetch(request).await {
            Ok(response) => RoutedResponse::from_network(class, response),
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "uncontrolled request failed");
                RoutedResponse::offline(class)
            }
        }
    }

    async fn cache_first_tile(&self, request: &FetchRequest) -> RoutedResponse {
        let class = RequestClass::Tile;
        let partition = self.names.tiles.clone();

        if let Some(cached) = self.lookup(&partition, request.method.as_str(), &request.url).await {
            tracing::trace!(url = %request.url, "tile cache hit");
            return RoutedResponse::from_cache(class, ResponseSource::Cache, cached);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store(&partition, request, &response).await;
                RoutedResponse::from_network(class, response)
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "tile unavailable, serving placeholder");
                RoutedResponse::placeholder(class)
            }
        }
    }

    async fn cache_first(&self, class: RequestClass, request: &FetchRequest) -> RoutedResponse {
        let partition = self.names.shell.clone();

        if let Some(cached) = self.lookup(&partition, request.method.as_str(), &request.url).await {
            return RoutedResponse::from_cache(class, ResponseSource::Cache, cached);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store(&partition, request, &response).await;
                RoutedResponse::from_network(class, response)
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "shell asset unavailable");
                RoutedResponse::offline(class)
            }
        }
    }

    async fn network_first_navigation(&self, request: &FetchRequest) -> RoutedResponse {
        let class = RequestClass::Navigation;
        let partition = self.names.shell.clone();

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store(&partition, request, &response).await;
                return RoutedResponse::from_network(class, response);
            }
            Err(e) => tracing::debug!(url = %request.url, error = %e, "navigation failed, trying cache"),
        }

        if let Some(cached) = self.lookup(&partition, request.method.as_str(), &request.url).await {
            return RoutedResponse::from_cache(class, ResponseSource::Cache, cached);
        }

        if let Some(page) = self.lookup(&partition, "GET", &self.offline_page).await {
            tracing::info!(url = %request.url, offline_page = %self.offline_page, "serving offline page");
            return RoutedResponse::from_cache(class, ResponseSource::Fallback, page);
        }

        tracing::warn!(url = %request.url, "navigation failed with no cached fallback");
        RoutedResponse::offline(class)
    }

    async fn network_first(&self, class: RequestClass, request: &FetchRequest) -> RoutedResponse {
        let partition = self.names.shell.clone();

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store(&partition, request, &response).await;
                return RoutedResponse::from_network(class, response);
            }
            Err(e) => tracing::debug!(url = %request.url, error = %e, "network failed, trying cache"),
        }

        if request.is_get()
            && let Some(cached) = self.lookup(&partition, request.method.as_str(), &request.url).await
        {
            return RoutedResponse::from_cache(class, ResponseSource::Cache, cached);
        }

        RoutedResponse::offline(class)
    }

    /// Query-insensitive lookup; store errors are treated as a miss.
    async fn lookup(&self, partition: &str, method: &str, url: &Url) -> Option<CachedResponse> {
        match self.db.match_entry(partition, method, url, MatchOptions::ignore_search()).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(partition, url = %url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Write a copy of a `200 OK` `GET` response. Anything else is left out of the cache.
    async fn store(&self, partition: &str, request: &FetchRequest, response: &FetchResponse) -> bool {
        if !request.is_get() || response.status != StatusCode::OK {
            return false;
        }

        let entry = CachedResponse::new(
            request.method.as_str(),
            &request.url,
            response.status.as_u16(),
            response.content_type.clone(),
            response.header_pairs(),
            response.bytes.to_vec(),
        );

        match self.db.put_entry(partition, &entry).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(partition, url = %request.url, error = %e, "cache write failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{Reply, ScriptedNetwork, activated_worker, config};
    use super::super::{OFFLINE_BODY, TRANSPARENT_PNG};
    use super::*;
    use reqwest::Method;
    use crate::fetch::RequestMode;

    const TILE: &str = "https://a.tile.openstreetmap.org/16/46524/28183.png";

    fn get(u: &str) -> FetchRequest {
        FetchRequest::get(Url::parse(u).unwrap())
    }

    #[tokio::test]
    async fn test_tile_miss_then_hit() {
        let network = ScriptedNetwork::online();
        let worker = activated_worker(config(), network.clone()).await;
        let tiles = worker.cache_names().tiles.clone();

        let first = worker.handle_fetch(&get(TILE)).await;
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(worker.cache().count_entries(&tiles).await.unwrap(), 1);
        assert_eq!(network.calls_to(TILE), 1);

        let second = worker.handle_fetch(&get(TILE)).await;
        assert_eq!(second.source, ResponseSource::Cache);
        assert_eq!(second.body, first.body);
        assert_eq!(network.calls_to(TILE), 1);
        assert_eq!(worker.cache().count_entries(&tiles).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_tile_hit_ignores_query_and_skips_network() {
        let network = ScriptedNetwork::online();
        let worker = activated_worker(config(), network.clone()).await;

        worker.handle_fetch(&get(TILE)).await;
        let calls = network.call_count();

        let hit = worker.handle_fetch(&get(&format!("{TILE}?ts=123"))).await;
        assert_eq!(hit.source, ResponseSource::Cache);
        assert_eq!(network.call_count(), calls);
    }

    #[tokio::test]
    async fn test_tile_failure_serves_placeholder() {
        let network = ScriptedNetwork::online();
        network.route(TILE, Reply::Fail);
        let worker = activated_worker(config(), network.clone()).await;

        let response = worker.handle_fetch(&get(TILE)).await;
        assert_eq!(response.source, ResponseSource::Placeholder);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(&response.body[..], TRANSPARENT_PNG);
        assert_eq!(worker.cache().count_entries(&worker.cache_names().tiles).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_tile_error_status_not_cached() {
        let network = ScriptedNetwork::online();
        network.route(TILE, Reply::status(404));
        let worker = activated_worker(config(), network.clone()).await;

        let response = worker.handle_fetch(&get(TILE)).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(worker.cache().count_entries(&worker.cache_names().tiles).await.unwrap(), 0);

        worker.handle_fetch(&get(TILE)).await;
        assert_eq!(network.calls_to(TILE), 2);
    }

    #[tokio::test]
    async fn test_shell_served_from_precache() {
        let network = ScriptedNetwork::online();
        let worker = activated_worker(config(), network.clone()).await;
        let url = "https://unpkg.com/leaflet/dist/leaflet.js";
        let calls = network.calls_to(url);
        assert_eq!(calls, 1);

        network.set_offline(true);
        let response = worker.handle_fetch(&get(url)).await;
        assert_eq!(response.class, RequestClass::Shell);
        assert_eq!(response.source, ResponseSource::Cache);
        assert_eq!(network.calls_to(url), 1);
    }

    #[tokio::test]
    async fn test_navigation_falls_back_to_offline_page() {
        let network = ScriptedNetwork::online();
        let worker = activated_worker(config(), network.clone()).await;

        network.set_offline(true);
        let nav = FetchRequest::navigate(Url::parse("http://localhost:8080/hostels?block=3").unwrap());
        let response = worker.handle_fetch(&nav).await;

        assert_eq!(response.class, RequestClass::Navigation);
        assert_eq!(response.source, ResponseSource::Fallback);
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, bytes::Bytes::from("http://localhost:8080/index.html"));
    }

    #[tokio::test]
    async fn test_navigation_prefers_cached_page() {
        let network = ScriptedNetwork::online();
        let worker = activated_worker(config(), network.clone()).await;
        let nav = FetchRequest::navigate(Url::parse("http://localhost:8080/hostels").unwrap());

        let online = worker.handle_fetch(&nav).await;
        assert_eq!(online.source, ResponseSource::Network);

        network.set_offline(true);
        let offline = worker.handle_fetch(&nav).await;
        assert_eq!(offline.source, ResponseSource::Cache);
        assert_eq!(offline.body, online.body);
    }

    #[tokio::test]
    async fn test_navigation_without_fallback_is_503() {
        let network = ScriptedNetwork::offline();
        let worker = activated_worker(config(), network.clone()).await;

        let nav = FetchRequest::navigate(Url::parse("http://localhost:8080/").unwrap());
        let response = worker.handle_fetch(&nav).await;
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.source, ResponseSource::Offline);
    }

    #[tokio::test]
    async fn test_other_network_first_with_cache_fallback() {
        let network = ScriptedNetwork::online();
        let worker = activated_worker(config(), network.clone()).await;
        let url = "http://localhost:8080/script.js";

        let first = worker.handle_fetch(&get(url)).await;
        assert_eq!(first.class, RequestClass::Other);
        assert_eq!(first.source, ResponseSource::Network);

        let second = worker.handle_fetch(&get(url)).await;
        assert_eq!(second.source, ResponseSource::Network);
        assert_eq!(network.calls_to(url), 2);

        network.set_offline(true);
        let third = worker.handle_fetch(&get(url)).await;
        assert_eq!(third.source, ResponseSource::Cache);
    }

    #[tokio::test]
    async fn test_other_uncached_offline() {
        let network = ScriptedNetwork::online();
        let worker = activated_worker(config(), network.clone()).await;
        network.set_offline(true);

        let response = worker.handle_fetch(&get("http://localhost:8080/api/poi.json")).await;
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.text().as_deref(), Some(OFFLINE_BODY));
    }

    #[tokio::test]
    async fn test_post_never_cached() {
        let network = ScriptedNetwork::online();
        let worker = activated_worker(config(), network.clone()).await;
        let shell = worker.cache_names().shell.clone();
        let before = worker.cache().count_entries(&shell).await.unwrap();

        let post = FetchRequest::new(
            Method::POST,
            Url::parse("http://localhost:8080/contact").unwrap(),
            RequestMode::Cors,
        );
        let response = worker.handle_fetch(&post).await;
        assert_eq!(response.source, ResponseSource::Network);
        assert_eq!(worker.cache().count_entries(&shell).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_uncontrolled_passthrough() {
        let network = ScriptedNetwork::online();
        let worker = super::super::testing::worker(config(), network.clone()).await;

        let first = worker.handle_fetch(&get(TILE)).await;
        let second = worker.handle_fetch(&get(TILE)).await;
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(second.source, ResponseSource::Network);
        assert_eq!(network.calls_to(TILE), 2);
    }

    #[tokio::test]
    async fn test_tile_resolves_when_cache_unavailable() {
        let network = ScriptedNetwork::online();
        let worker = activated_worker(config(), network.clone()).await;
        worker.cache().clone().close().await.unwrap();

        let fetched = worker.handle_fetch(&get(TILE)).await;
        assert_eq!(fetched.source, ResponseSource::Network);
        assert_eq!(fetched.status, StatusCode::OK);

        network.set_offline(true);
        let placeholder = worker.handle_fetch(&get(TILE)).await;
        assert_eq!(placeholder.source, ResponseSource::Placeholder);
        assert_eq!(network.calls_to(TILE), 2);
    }

    #[tokio::test]
    async fn test_navigation_and_other_resolve_when_cache_unavailable() {
        let network = ScriptedNetwork::online();
        let worker = activated_worker(config(), network.clone()).await;
        worker.cache().clone().close().await.unwrap();

        let script = worker.handle_fetch(&get("http://localhost:8080/script.js")).await;
        assert_eq!(script.source, ResponseSource::Network);

        network.set_offline(true);
        let nav = FetchRequest::navigate(Url::parse("http://localhost:8080/hostels").unwrap());
        let response = worker.handle_fetch(&nav).await;
        assert_eq!(response.source, ResponseSource::Offline);
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
