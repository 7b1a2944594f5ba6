//! Cache-related MCP tools.
//!
//! This module provides read-only views of the worker's cache partitions.

pub mod lookup;
pub mod status;

pub use lookup::{CacheMatchParams, match_impl};
pub use status::{CacheStatusParams, status_impl};
