use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Highest zoom level accepted. `2^24` columns still fit comfortably in a `u32`.
pub const MAX_ZOOM: u8 = 24;

/// Latitude limit of the Web Mercator projection.
pub const MAX_LAT: f64 = 85.051_128_78;

/// A map tile address.
///
/// Invariant: `x` and `y` are both in `[0, 2^zoom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

/// Converts a longitude/latitude pair to the tile containing it.
///
/// Latitude is clamped to the projection limit and the result is clamped into
/// the tile grid, so the poles and the antimeridian map to edge tiles.
///
/// # Errors
///
/// Returns `Error::InvalidInput` for non-finite coordinates or a zoom above [`MAX_ZOOM`].
pub fn to_tile_coords(lon: f64, lat: f64, zoom: u8) -> Result<TileCoord, Error> {
    if !lon.is_finite() || !lat.is_finite() {
        return Err(Error::InvalidInput(format!("non-finite coordinate ({lon}, {lat})")));
    }
    if zoom > MAX_ZOOM {
        return Err(Error::InvalidInput(format!("zoom {zoom} exceeds {MAX_ZOOM}")));
    }

    let n = 2.0_f64.powi(zoom as i32);
    let max_index = (1u64 << zoom) - 1;

    let x = ((lon + 180.0) / 360.0 * n).floor();

    let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT) * PI / 180.0;
    let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();

    Ok(TileCoord { zoom, x: clamp_index(x, max_index), y: clamp_index(y, max_index) })
}

fn clamp_index(value: f64, max_index: u64) -> u32 {
    if value <= 0.0 { 0 } else { (value as u64).min(max_index) as u32 }
}

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Build a box from `[minLon, minLat, maxLon, maxLat]`, the order pages send.
    ///
    /// Swapped corners are normalized.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for non-finite values or longitudes outside [-180, 180].
    pub fn from_array(bbox: [f64; 4]) -> Result<Self, Error> {
        let [lon_a, lat_a, lon_b, lat_b] = bbox;
        if bbox.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(format!("bbox contains non-finite values: {bbox:?}")));
        }
        if !(-180.0..=180.0).contains(&lon_a) || !(-180.0..=180.0).contains(&lon_b) {
            return Err(Error::InvalidInput(format!("bbox longitude out of range: {bbox:?}")));
        }
        if !(-90.0..=90.0).contains(&lat_a) || !(-90.0..=90.0).contains(&lat_b) {
            return Err(Error::InvalidInput(format!("bbox latitude out of range: {bbox:?}")));
        }

        Ok(Self {
            min_lon: lon_a.min(lon_b),
            min_lat: lat_a.min(lat_b),
            max_lon: lon_a.max(lon_b),
            max_lat: lat_a.max(lat_b),
        })
    }
}

/// Inclusive tile ranges `(x_min..=x_max, y_min..=y_max)` covering `bbox` at `zoom`.
///
/// The north edge gives the smallest `y`, since tile rows grow southwards.
pub fn tile_range(bbox: &BoundingBox, zoom: u8) -> Result<(TileCoord, TileCoord), Error> {
    let north_west = to_tile_coords(bbox.min_lon, bbox.max_lat, zoom)?;
    let south_east = to_tile_coords(bbox.max_lon, bbox.min_lat, zoom)?;
    Ok((north_west, south_east))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_zero_is_single_tile() {
        for (lon, lat) in [(0.0, 0.0), (-180.0, 85.0), (180.0, -85.0), (75.56, 26.84), (-74.006, 40.7128)] {
            let tile = to_tile_coords(lon, lat, 0).unwrap();
            assert_eq!((tile.x, tile.y), (0, 0), "({lon}, {lat})");
        }
    }

    #[test]
    fn test_new_york_city_at_zoom_16() {
        let tile = to_tile_coords(-74.0060, 40.7128, 16).unwrap();
        assert_eq!(tile.x, 19295);
        assert_eq!(tile.y, 24640);
        assert_eq!(tile.zoom, 16);
    }

    #[test]
    fn test_edges_stay_in_grid() {
        for zoom in [1u8, 5, 12, 19] {
            let max = (1u32 << zoom) - 1;
            let east = to_tile_coords(180.0, 0.0, zoom).unwrap();
            assert_eq!(east.x, max);

            let north_pole = to_tile_coords(0.0, 90.0, zoom).unwrap();
            assert_eq!(north_pole.y, 0);

            let south_pole = to_tile_coords(0.0, -90.0, zoom).unwrap();
            assert_eq!(south_pole.y, max);
        }
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(to_tile_coords(f64::NAN, 0.0, 3).is_err());
        assert!(to_tile_coords(0.0, f64::INFINITY, 3).is_err());
        assert!(to_tile_coords(0.0, 0.0, MAX_ZOOM + 1).is_err());
    }

    #[test]
    fn test_bbox_normalizes_corners() {
        let bbox = BoundingBox::from_array([75.57, 26.85, 75.56, 26.84]).unwrap();
        assert_eq!(bbox.min_lon, 75.56);
        assert_eq!(bbox.max_lon, 75.57);
        assert_eq!(bbox.min_lat, 26.84);
        assert_eq!(bbox.max_lat, 26.85);
    }

    #[test]
    fn test_bbox_rejects_out_of_range() {
        assert!(BoundingBox::from_array([-181.0, 0.0, 0.0, 1.0]).is_err());
        assert!(BoundingBox::from_array([0.0, -91.0, 1.0, 1.0]).is_err());
        assert!(BoundingBox::from_array([0.0, f64::NAN, 1.0, 1.0]).is_err());
    }

    #[test]
    fn test_tile_range_ordering() {
        let bbox = BoundingBox::from_array([75.55, 26.83, 75.58, 26.86]).unwrap();
        for zoom in 0..=18 {
            let (nw, se) = tile_range(&bbox, zoom).unwrap();
            assert!(nw.x <= se.x, "zoom {zoom}");
            assert!(nw.y <= se.y, "zoom {zoom}");
        }
    }
}
