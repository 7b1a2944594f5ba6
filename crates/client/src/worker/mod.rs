//! The offline-caching worker.
//!
//! A [`Worker`] owns the cache partitions for one deployed version of the
//! application. It resolves intercepted requests ([`Worker::handle_fetch`]),
//! moves through install and activate ([`Worker::install`],
//! [`Worker::activate`]), and answers control messages from pages
//! ([`Worker::handle_message`]), broadcasting progress to every subscribed
//! client.
//!
//! It depends on two capabilities only: a [`Network`] and a [`CacheDb`].

mod classify;
mod dispatch;
mod lifecycle;
mod messages;
mod prefetch;
mod response;
mod router;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use url::Url;

use crate::fetch::{Network, resolve};
use uninav_core::{CacheDb, CacheNames, Error, TileUrlTemplate, WorkerConfig};

pub use classify::{RequestClass, RequestClassifier};
pub use lifecycle::InstallReport;
pub use messages::{ControlMessage, WorkerEvent};
pub use prefetch::PrefetchSummary;
pub use response::{OFFLINE_BODY, ResponseSource, RoutedResponse, TRANSPARENT_PNG};

/// Where the worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Constructed, install not yet run.
    Parsed,
    Installing,
    /// Installed and waiting for activation.
    Installed,
    Activating,
    /// Controlling clients: requests go through the router.
    Activated,
}

/// Offline-caching worker for one application version.
pub struct Worker {
    config: WorkerConfig,
    names: CacheNames,
    origin: Url,
    shell_urls: Vec<Url>,
    offline_page: Url,
    classifier: RequestClassifier,
    template: TileUrlTemplate,
    db: CacheDb,
    network: Arc<dyn Network>,
    events: broadcast::Sender<WorkerEvent>,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
}

impl Worker {
    /// Build a worker from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the configuration fails validation and
    /// `Error::InvalidUrl` if a manifest entry or the offline page can't be resolved.
    pub fn new(config: WorkerConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        config.validate().map_err(|e| Error::InvalidInput(e.to_string()))?;

        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let shell_urls = config
            .shell_manifest
            .iter()
            .map(|entry| resolve(&origin, entry).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        let offline_page =
            resolve(&origin, &config.offline_page).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.offline_page)))?;

        let classifier = RequestClassifier::new(config.tile_hosts.clone(), &shell_urls);
        let template = TileUrlTemplate::new(config.tile_url_template.clone(), config.tile_subdomains.clone());
        let (events, _) = broadcast::channel(config.event_buffer);

        Ok(Self {
            names: config.cache_names(),
            skip_waiting: AtomicBool::new(config.skip_waiting),
            origin,
            shell_urls,
            offline_page,
            classifier,
            template,
            db,
            network,
            events,
            state: RwLock::new(WorkerState::Parsed),
            config,
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Partition names this version owns.
    pub fn cache_names(&self) -> &CacheNames {
        &self.names
    }

    pub fn cache(&self) -> &CacheDb {
        &self.db
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    /// Whether intercepted requests are routed through the caches.
    pub async fn is_controlling(&self) -> bool {
        self.state().await == WorkerState::Activated
    }

    /// Register a client. Every event broadcast afterwards is delivered to it.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.events.subscribe()
    }

    async fn set_state(&self, state: WorkerState) {
        *self.state.write().await = state;
        tracing::debug!(?state, version = %self.config.cache_version, "worker state changed");
    }

    fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// Post an event to every client, including ones the worker doesn't control.
    fn notify_all(&self, event: WorkerEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!(?event, "no clients subscribed");
        }
    }
}
