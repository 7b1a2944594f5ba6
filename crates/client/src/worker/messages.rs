//! Control protocol between pages and the worker.

use serde::{Deserialize, Serialize};

/// A message posted by a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Fetch and cache tiles, either for `bbox` at `zooms` or for an explicit `urls` list.
    PrefetchTiles {
        /// `[minLon, minLat, maxLon, maxLat]`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bbox: Option<[f64; 4]>,
        #[serde(default)]
        zooms: Vec<u8>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        urls: Vec<String>,
    },
    /// Drop every cached tile.
    ClearTileCache,
    /// Activate without waiting.
    SkipWaiting,
    /// Any other `type`; ignored.
    #[serde(other)]
    Unknown,
}

/// A message broadcast to every client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerEvent {
    PrefetchProgress { done: usize, total: usize },
    PrefetchDone,
    TilesCleared,
}
