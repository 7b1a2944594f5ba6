//! Slippy-map tile math.
//!
//! Converts geographic coordinates to Web Mercator tile coordinates and
//! expands bounding boxes into the tile URLs a prefetch job fetches.

mod coords;
mod urls;

pub use coords::{BoundingBox, MAX_LAT, MAX_ZOOM, TileCoord, tile_range, to_tile_coords};
pub use urls::{TileUrlTemplate, build_tile_url_list, tile_count};
