//! Core types and shared functionality for the uninav offline worker.
//!
//! This crate provides:
//! - Partitioned response cache with SQLite backend
//! - Unified error types
//! - Configuration structures
//! - Slippy-map tile math and tile URL expansion

pub mod cache;
pub mod config;
pub mod error;
pub mod tile;

pub use cache::{CacheDb, CachedResponse, MatchOptions, PartitionInfo};
pub use config::{CacheNames, ConfigError, WorkerConfig};
pub use error::Error;
pub use tile::{BoundingBox, TileCoord, TileUrlTemplate, build_tile_url_list};
