//! MCP tool implementations.
//!
//! This module contains all tools exposed by the uninav worker server.

pub mod cache;
pub mod post_message;
pub mod worker_fetch;

pub use post_message::PostMessageParams;
pub use worker_fetch::WorkerFetchParams;
