//! Scripted network and worker builders for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{StatusCode, header};

use super::Worker;
use crate::fetch::{FetchRequest, FetchResponse, Network};
use uninav_core::{CacheDb, Error, WorkerConfig};

/// Scripted answer for one URL.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Status with a body echoing the URL.
    Status(u16),
    /// Transport failure.
    Fail,
}

impl Reply {
    pub fn status(code: u16) -> Self {
        Reply::Status(code)
    }
}

/// A network that answers from a script and records every call.
///
/// Unscripted URLs get `200` with the URL as body, or fail when offline.
#[derive(Default)]
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
}

impl ScriptedNetwork {
    pub fn online() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn offline() -> Arc<Self> {
        let network = Self::default();
        network.offline.store(true, Ordering::SeqCst);
        Arc::new(network)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn route(&self, url: &str, reply: Reply) {
        self.routes.lock().unwrap().insert(url.to_string(), reply);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

fn content_type_for(url: &str) -> &'static str {
    if url.ends_with(".png") {
        "image/png"
    } else if url.ends_with(".js") {
        "application/javascript"
    } else if url.ends_with(".css") {
        "text/css"
    } else {
        "text/html; charset=utf-8"
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, Error> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());

        let scripted = self.routes.lock().unwrap().get(&url).cloned();
        let status = match scripted {
            Some(Reply::Fail) => return Err(Error::HttpError(format!("scripted failure: {url}"))),
            Some(Reply::Status(code)) => code,
            None if self.offline.load(Ordering::SeqCst) => {
                return Err(Error::HttpError(format!("offline: {url}")));
            }
            None => 200,
        };

        let content_type = content_type_for(request.url.path());
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static(content_type));

        Ok(FetchResponse {
            url: request.url.clone(),
            final_url: request.url.clone(),
            status: StatusCode::from_u16(status).unwrap(),
            content_type: Some(content_type.to_string()),
            bytes: Bytes::from(url),
            headers,
            fetch_ms: 1,
        })
    }
}

/// Default config with skip-waiting off, so tests drive activation explicitly.
pub fn config() -> WorkerConfig {
    WorkerConfig { skip_waiting: false, ..Default::default() }
}

/// A worker over an in-memory cache, not yet installed.
pub async fn worker(config: WorkerConfig, network: Arc<ScriptedNetwork>) -> Arc<Worker> {
    let db = CacheDb::open_in_memory().await.unwrap();
    Arc::new(Worker::new(config, db, network).unwrap())
}

/// A worker that has installed and activated.
pub async fn activated_worker(config: WorkerConfig, network: Arc<ScriptedNetwork>) -> Arc<Worker> {
    let worker = worker(config, network).await;
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    worker
}
