//! uninav-worker entry point.
//!
//! Loads configuration, opens the cache, installs the worker, and serves its
//! MCP tools on stdio. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use uninav_client::{FetchClient, FetchConfig, Worker};
use uninav_core::{CacheDb, WorkerConfig};

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = WorkerConfig::load()?;
    tracing::info!(
        version = %config.cache_version,
        origin = %config.origin,
        db = %config.db_path.display(),
        "Starting uninav worker on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from(&config))?;
    let worker = Arc::new(Worker::new(config, db, Arc::new(network))?);

    let report = worker.install().await?;
    tracing::info!(
        cached = report.cached,
        failed = report.failed.len(),
        activated = report.activated.is_some(),
        "worker installed"
    );

    let cache = worker.cache().clone();
    let handler = handler::UninavServer::new(worker);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    cache.close().await?;
    tracing::info!("cache closed, shutting down");

    Ok(())
}
