use std::collections::BTreeSet;

use super::coords::{BoundingBox, TileCoord, tile_range};
use crate::Error;

/// Tile URL template such as `https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png`.
#[derive(Debug, Clone)]
pub struct TileUrlTemplate {
    template: String,
    subdomains: Vec<String>,
}

impl TileUrlTemplate {
    pub fn new(template: impl Into<String>, subdomains: Vec<String>) -> Self {
        Self { template: template.into(), subdomains }
    }

    /// Mirror host for a tile: `subdomains[(x + y) mod n]`.
    ///
    /// Deterministic, so the same tile always resolves to the same URL and cache key.
    pub fn subdomain(&self, tile: &TileCoord) -> Option<&str> {
        if self.subdomains.is_empty() {
            return None;
        }
        let index = (tile.x as u64 + tile.y as u64) % self.subdomains.len() as u64;
        Some(self.subdomains[index as usize].as_str())
    }

    pub fn expand(&self, tile: &TileCoord) -> String {
        let mut url = self
            .template
            .replace("{z}", &tile.zoom.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string());
        if let Some(s) = self.subdomain(tile) {
            url = url.replace("{s}", s);
        }
        url
    }
}

/// Number of tiles covering `bbox` across the distinct `zooms`.
pub fn tile_count(bbox: &BoundingBox, zooms: &[u8]) -> Result<usize, Error> {
    let mut total = 0usize;
    for zoom in zooms.iter().copied().collect::<BTreeSet<_>>() {
        let (nw, se) = tile_range(bbox, zoom)?;
        total += (se.x - nw.x + 1) as usize * (se.y - nw.y + 1) as usize;
    }
    Ok(total)
}

/// Expand a bounding box into tile URLs, zoom ascending, then column, then row.
///
/// Duplicate zooms are collapsed.
///
/// # Errors
///
/// Returns `Error::InvalidInput` for an empty zoom list or a zoom the tile math rejects.
pub fn build_tile_url_list(bbox: &BoundingBox, zooms: &[u8], template: &TileUrlTemplate) -> Result<Vec<String>, Error> {
    if zooms.is_empty() {
        return Err(Error::InvalidInput("zooms cannot be empty".into()));
    }

    let mut urls = Vec::with_capacity(tile_count(bbox, zooms)?);
    for zoom in zooms.iter().copied().collect::<BTreeSet<_>>() {
        let (nw, se) = tile_range(bbox, zoom)?;
        for x in nw.x..=se.x {
            for y in nw.y..=se.y {
                urls.push(template.expand(&TileCoord { zoom, x, y }));
            }
        }
    }

    Ok(urls)
}
