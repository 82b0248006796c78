//! Incremental quad-tree vector tile generation for GeoJSON feature tables.
//!
//! The source preprocesses a feature collection once (projection,
//! simplification weights, antimeridian wrapping), builds an initial tile
//! pyramid down to a configurable index zoom, then serves deeper tiles on
//! demand by drilling down from the nearest indexed ancestor. Every generated
//! tile is cached, so repeated requests are cheap.
//!
//! ```
//! use geojson::FeatureCollection;
//! use table_tiles_core::{TableTileSource, TileOptions};
//!
//! let data: FeatureCollection = serde_json::from_str(
//!     r#"{
//!         "type": "FeatureCollection",
//!         "features": [{
//!             "type": "Feature",
//!             "properties": {"name": "null island"},
//!             "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}
//!         }]
//!     }"#,
//! )?;
//!
//! let mut source = TableTileSource::new(&data, TileOptions::default())?;
//! let tile = source.get_tile(0, 0, 0);
//! assert!(tile.is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod clip;
pub mod convert;
pub mod feature;
pub mod simplify;
pub mod source;
pub mod tile;
pub mod transform;
pub mod wrap;

pub use feature::{VtFeature, VtGeometry, VtPoint, VtRing};
pub use source::TableTileSource;
pub use tile::{GeomClass, Tile, TileCoord};
pub use transform::{TransformedFeature, TransformedGeometry, TransformedTile};

use serde::Serialize;

/// Errors from tile source construction.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("maxZoom must be in the 0-24 range, got {0}")]
    MaxZoomOutOfRange(u8),

    #[error("promoteId and generateId cannot be used together")]
    PromoteAndGenerateId,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Coordinate system of GeoJSON tiles returned by
/// [`TableTileSource::get_tile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateMode {
    /// Geographic lng/lat degrees.
    #[default]
    Wgs84,
    /// Integer tile units relative to the tile origin, 0..extent across the
    /// tile interior.
    Local,
}

/// Tiling parameters.
#[derive(Debug, Clone)]
pub struct TileOptions {
    /// Coordinate system of returned GeoJSON tiles.
    pub coordinates: CoordinateMode,
    /// Deepest zoom that can be requested; tiles there keep full detail.
    pub max_zoom: u8,
    /// Zoom ceiling for the eager indexing pass at construction.
    pub index_max_zoom: u8,
    /// Tiles with at most this many points stop splitting during indexing.
    pub max_points_per_tile: usize,
    /// Simplification tolerance in tile units at `max_zoom`.
    pub tolerance: f64,
    /// Tile width and height in integer tile units.
    pub extent: u32,
    /// Margin kept around each tile, in the same units as `extent`.
    pub buffer: u32,
    /// Attach `mapbox_clip_start`/`mapbox_clip_end` running-length fractions
    /// to clipped lines.
    pub line_metrics: bool,
    /// Promote this property to the feature id.
    pub promote_id: Option<String>,
    /// Number features by input position. Mutually exclusive with
    /// `promote_id`.
    pub generate_id: bool,
    /// Logging verbosity: 0 silent, 1 summary, 2 per-tile.
    pub debug: u8,
    /// Opaque attribute schema passed through to [`Metadata`].
    pub schema: Option<serde_json::Value>,
}

impl Default for TileOptions {
    fn default() -> Self {
        Self {
            coordinates: CoordinateMode::Wgs84,
            max_zoom: 14,
            index_max_zoom: 5,
            max_points_per_tile: 100_000,
            tolerance: 3.0,
            extent: 4096,
            buffer: 64,
            line_metrics: false,
            promote_id: None,
            generate_id: false,
            debug: 0,
            schema: None,
        }
    }
}

/// Tileset metadata served alongside tiles.
#[derive(Debug, Clone, Serialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<serde_json::Value>,
    #[serde(rename = "minZoom")]
    pub min_zoom: u8,
    #[serde(rename = "maxZoom")]
    pub max_zoom: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::MaxZoomOutOfRange(30).to_string(),
            "maxZoom must be in the 0-24 range, got 30"
        );
        assert_eq!(
            Error::PromoteAndGenerateId.to_string(),
            "promoteId and generateId cannot be used together"
        );
    }

    #[test]
    fn test_default_options() {
        let options = TileOptions::default();
        assert_eq!(options.max_zoom, 14);
        assert_eq!(options.index_max_zoom, 5);
        assert_eq!(options.extent, 4096);
        assert_eq!(options.buffer, 64);
        assert_eq!(options.coordinates, CoordinateMode::Wgs84);
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let metadata = Metadata {
            schema: None,
            min_zoom: 0,
            max_zoom: 14,
        };
        let json = serde_json::to_value(&metadata).expect("serializable");
        assert_eq!(json, serde_json::json!({"minZoom": 0, "maxZoom": 14}));
    }
}
