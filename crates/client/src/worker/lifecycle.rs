//! Install and activate.
//!
//! Install opens this version's partitions and precaches the shell. Activate
//! deletes every partition outside the allow-list and starts controlling
//! clients.

use std::sync::atomic::Ordering;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{Worker, WorkerState};
use crate::fetch::FetchRequest;
use uninav_core::{CachedResponse, Error};

/// Outcome of an install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReport {
    /// Shell URLs stored.
    pub cached: usize,
    /// Shell URLs that could not be fetched or returned a non-200 status.
    pub failed: Vec<String>,
    /// Partitions deleted if install went straight on to activate.
    pub activated: Option<Vec<String>>,
}

impl Worker {
    /// Open this version's partitions and precache the shell manifest.
    ///
    /// A failed shell asset is logged and skipped; it doesn't fail the install.
    /// If skip-waiting was requested the worker activates immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if a partition can't be opened or written.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.set_state(WorkerState::Installing).await;

        for name in self.names.allow_list() {
            if self.db.open_partition(&name).await? {
                tracing::debug!(partition = %name, "created partition");
            }
        }

        let mut report = InstallReport::default();
        for url in &self.shell_urls {
            let request = FetchRequest::get(url.clone());
            match self.network.fetch(&request).await {
                Ok(response) if response.status == StatusCode::OK => {
                    let entry = CachedResponse::new(
                        "GET",
                        url,
                        response.status.as_u16(),
                        response.content_type.clone(),
                        response.header_pairs(),
                        response.bytes.to_vec(),
                    );
                    self.db.put_entry(&self.names.shell, &entry).await?;
                    report.cached += 1;
                }
                Ok(response) => {
                    tracing::warn!(url = %url, status = response.status.as_u16(), "shell asset not cached");
                    report.failed.push(url.to_string());
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "shell asset not cached");
                    report.failed.push(url.to_string());
                }
            }
        }

        self.set_state(WorkerState::Installed).await;
        tracing::info!(
            version = %self.config.cache_version,
            cached = report.cached,
            failed = report.failed.len(),
            "worker installed"
        );

        if self.skip_waiting_requested() && self.claim_activation().await {
            report.activated = Some(self.finish_activation().await?);
        }

        Ok(report)
    }

    /// Delete stale partitions and start controlling clients.
    ///
    /// Returns the names of the deleted partitions.
    ///
    /// # Errors
    ///
    /// Returns an error if partitions can't be listed or deleted.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        self.set_state(WorkerState::Activating).await;
        self.finish_activation().await
    }

    /// Move a waiting worker to `Activating`. Only one caller wins.
    async fn claim_activation(&self) -> bool {
        let mut state = self.state.write().await;
        if *state != WorkerState::Installed {
            return false;
        }
        *state = WorkerState::Activating;
        tracing::debug!(version = %self.config.cache_version, "activation claimed");
        true
    }

    /// Prune partitions outside the allow-list and start controlling clients.
    async fn finish_activation(&self) -> Result<Vec<String>, Error> {
        let mut deleted = Vec::new();
        for name in self.db.partition_names().await? {
            if !self.names.is_allowed(&name) && self.db.delete_partition(&name).await? {
                tracing::info!(partition = %name, "deleted stale partition");
                deleted.push(name);
            }
        }

        self.set_state(WorkerState::Activated).await;
        tracing::info!(version = %self.config.cache_version, deleted = deleted.len(), "worker activated, claiming clients");

        Ok(deleted)
    }

    /// Stop waiting: a worker that is installed activates now, one still
    /// installing activates as soon as install completes.
    ///
    /// Returns true if this call performed the activation.
    pub async fn skip_waiting(&self) -> Result<bool, Error> {
        self.skip_waiting.store(true, Ordering::SeqCst);

        if self.claim_activation().await {
            self.finish_activation().await?;
            return Ok(true);
        }

        Ok(false)
    }
}
