//! Bulk tile prefetch and tile cache clearing.
//!
//! A prefetch job fans out one task per tile. Progress is reported from the
//! single loop that collects finished tasks, so `done` counts up by one per
//! tile regardless of completion order. A failed tile still counts as done.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use super::{Worker, WorkerEvent};
use crate::fetch::{FetchRequest, Network, resolve};
use uninav_core::{BoundingBox, CacheDb, CachedResponse, Error, MatchOptions, build_tile_url_list, tile::tile_count};

/// Totals for a finished prefetch job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefetchSummary {
    pub total: usize,
    /// Already cached; no network request made.
    pub cached: usize,
    /// Fetched and stored.
    pub stored: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileOutcome {
    Cached,
    Stored,
    Failed,
}

/// Everything a tile task needs, cloned once per job.
#[derive(Clone)]
struct TileTask {
    db: CacheDb,
    network: Arc<dyn Network>,
    partition: String,
    origin: Url,
    limiter: Option<Arc<Semaphore>>,
    delay: Option<Duration>,
}

impl TileTask {
    async fn run(self, raw_url: String) -> TileOutcome {
        let url = match resolve(&self.origin, &raw_url) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(url = %raw_url, error = %e, "skipping invalid tile URL");
                return TileOutcome::Failed;
            }
        };

        match self.db.match_entry(&self.partition, "GET", &url, MatchOptions::ignore_search()).await {
            Ok(Some(_)) => return TileOutcome::Cached,
            Ok(None) => {}
            Err(e) => tracing::warn!(url = %url, error = %e, "tile lookup failed, fetching anyway"),
        }

        let _permit = match &self.limiter {
            Some(limiter) => limiter.clone().acquire_owned().await.ok(),
            None => None,
        };

        let outcome = match self.network.fetch(&FetchRequest::get(url.clone())).await {
            Ok(response) if response.status == StatusCode::OK => {
                let entry = CachedResponse::new(
                    "GET",
                    &url,
                    response.status.as_u16(),
                    response.content_type.clone(),
                    response.header_pairs(),
                    response.bytes.to_vec(),
                );
                match self.db.put_entry(&self.partition, &entry).await {
                    Ok(()) => TileOutcome::Stored,
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "failed to store prefetched tile");
                        TileOutcome::Failed
                    }
                }
            }
            Ok(response) => {
                tracing::warn!(url = %url, status = response.status.as_u16(), "prefetch tile rejected");
                TileOutcome::Failed
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "prefetch tile failed");
                TileOutcome::Failed
            }
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        outcome
    }
}

impl Worker {
    /// Expand a prefetch request into the URLs to fetch.
    ///
    /// An explicit `urls` list wins over `bbox` + `zooms`.
    pub fn plan_prefetch(&self, bbox: Option<[f64; 4]>, zooms: &[u8], urls: &[String]) -> Result<Vec<String>, Error> {
        let planned = if !urls.is_empty() {
            urls.to_vec()
        } else {
            let bbox = bbox.ok_or_else(|| Error::InvalidInput("PREFETCH_TILES needs bbox and zooms, or urls".into()))?;
            let bbox = BoundingBox::from_array(bbox)?;

            if let Some(zoom) = zooms.iter().find(|z| **z > self.config.max_zoom) {
                return Err(Error::InvalidInput(format!("zoom {zoom} exceeds max_zoom {}", self.config.max_zoom)));
            }
            if zooms.is_empty() {
                return Err(Error::InvalidInput("zooms cannot be empty".into()));
            }

            let count = tile_count(&bbox, zooms)?;
            if count > self.config.max_prefetch_tiles {
                return Err(Error::InvalidInput(format!(
                    "{count} tiles exceeds max_prefetch_tiles {}",
                    self.config.max_prefetch_tiles
                )));
            }

            build_tile_url_list(&bbox, zooms, &self.template)?
        };

        if planned.len() > self.config.max_prefetch_tiles {
            return Err(Error::InvalidInput(format!(
                "{} tiles exceeds max_prefetch_tiles {}",
                planned.len(),
                self.config.max_prefetch_tiles
            )));
        }

        Ok(planned)
    }

    /// Fetch and cache every tile of a prefetch request, broadcasting progress.
    ///
    /// Emits `PREFETCH_PROGRESS` after each tile and `PREFETCH_DONE` at the end.
    /// Individual tile failures are logged and counted, never returned.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the request can't be planned; nothing is broadcast then.
    pub async fn prefetch_tiles(
        &self, bbox: Option<[f64; 4]>, zooms: &[u8], urls: &[String],
    ) -> Result<PrefetchSummary, Error> {
        let planned = self.plan_prefetch(bbox, zooms, urls)?;
        let total = planned.len();
        tracing::info!(total, "prefetch started");

        let task = TileTask {
            db: self.db.clone(),
            network: self.network.clone(),
            partition: self.names.tiles.clone(),
            origin: self.origin.clone(),
            limiter: (self.config.prefetch_concurrency > 0)
                .then(|| Arc::new(Semaphore::new(self.config.prefetch_concurrency))),
            delay: self.config.prefetch_delay(),
        };

        let mut join_set = JoinSet::new();
        for url in planned {
            join_set.spawn(task.clone().run(url));
        }

        let mut summary = PrefetchSummary { total, ..Default::default() };
        let mut done = 0usize;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(TileOutcome::Cached) => summary.cached += 1,
                Ok(TileOutcome::Stored) => summary.stored += 1,
                Ok(TileOutcome::Failed) => summary.failed += 1,
                Err(e) => {
                    tracing::error!(error = %e, "prefetch task aborted");
                    summary.failed += 1;
                }
            }
            done += 1;
            self.notify_all(WorkerEvent::PrefetchProgress { done, total });
        }

        self.notify_all(WorkerEvent::PrefetchDone);
        tracing::info!(
            total,
            cached = summary.cached,
            stored = summary.stored,
            failed = summary.failed,
            "prefetch finished"
        );

        Ok(summary)
    }

    /// Drop the tiles partition and recreate it empty, then tell every client.
    pub async fn clear_tile_cache(&self) -> Result<(), Error> {
        let tiles = &self.names.tiles;
        self.db.delete_partition(tiles).await?;
        self.db.open_partition(tiles).await?;
        tracing::info!(partition = %tiles, "tile cache cleared");

        self.notify_all(WorkerEvent::TilesCleared);
        Ok(())
    }
}
