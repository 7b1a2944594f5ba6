//! SQLite-backed partitioned response cache.
//!
//! This module provides the persistent store the worker reads and writes in
//! place of a browser's Cache Storage. It supports:
//!
//! - Named partitions, created on demand and dropped as a unit
//! - Entries keyed by a SHA-256 hash of method and URL
//! - Query-insensitive matching (`ignore_search`)
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CachedResponse, MatchOptions};
pub use partitions::PartitionInfo;
