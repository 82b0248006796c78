//! Read-side coordinate transform.
//!
//! Cached tiles store world-normalized coordinates; every read produces a
//! fresh copy scaled to integer tile units, so the cache stays valid when the
//! same tile is requested again with a different extent in play.

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

use crate::tile::{GeomClass, Tile, TileGeometry};
use crate::CoordinateMode;

/// A tile feature scaled to integer tile units.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformedFeature {
    pub geometry: TransformedGeometry,
    pub class: GeomClass,
    pub tags: JsonObject,
    pub id: Option<Id>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformedGeometry {
    Points(Vec<[i32; 2]>),
    Rings(Vec<Vec<[i32; 2]>>),
}

/// A tile in integer tile units, ready for encoding or GeoJSON conversion.
#[derive(Debug, Clone)]
pub struct TransformedTile {
    pub features: Vec<TransformedFeature>,
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

/// Scale a cached tile into integer tile units relative to its own origin.
pub fn transform_tile(tile: &Tile, extent: u32) -> TransformedTile {
    let z2 = (1u64 << tile.z) as f64;
    let tx = tile.x as f64;
    let ty = tile.y as f64;
    let extent = extent as f64;

    let to_units = |p: &[f64; 2]| -> [i32; 2] {
        [
            (extent * (p[0] * z2 - tx)).round() as i32,
            (extent * (p[1] * z2 - ty)).round() as i32,
        ]
    };

    let features = tile
        .features
        .iter()
        .map(|feature| {
            let geometry = match &feature.geometry {
                TileGeometry::Points(points) => {
                    TransformedGeometry::Points(points.iter().map(to_units).collect())
                }
                TileGeometry::Rings(rings) => TransformedGeometry::Rings(
                    rings
                        .iter()
                        .map(|ring| ring.iter().map(to_units).collect())
                        .collect(),
                ),
            };
            TransformedFeature {
                geometry,
                class: feature.class,
                tags: feature.tags.clone(),
                id: feature.id.clone(),
            }
        })
        .collect();

    TransformedTile {
        features,
        x: tile.x,
        y: tile.y,
        z: tile.z,
    }
}

/// Convert a transformed tile back to a GeoJSON feature collection.
///
/// Geometry class plus part count picks the output type: one point is a
/// `Point`, several a `MultiPoint`, and so on. Returns `None` for a tile with
/// no features.
pub fn to_feature_collection(
    tile: &TransformedTile,
    mode: CoordinateMode,
    extent: u32,
) -> Option<FeatureCollection> {
    if tile.features.is_empty() {
        return None;
    }

    let project: Box<dyn Fn(&[i32; 2]) -> Vec<f64>> = match mode {
        CoordinateMode::Local => Box::new(|p: &[i32; 2]| vec![p[0] as f64, p[1] as f64]),
        CoordinateMode::Wgs84 => {
            let z2 = (1u64 << tile.z) as f64;
            let tx = tile.x as f64;
            let ty = tile.y as f64;
            let extent = extent as f64;
            Box::new(move |p: &[i32; 2]| {
                let lng = (p[0] as f64 / extent + tx) * 360.0 / z2 - 180.0;
                let y2 = 180.0 - (p[1] as f64 / extent + ty) * 360.0 / z2;
                let lat = 360.0 / std::f64::consts::PI
                    * (y2 * std::f64::consts::PI / 180.0).exp().atan()
                    - 90.0;
                vec![lng, lat]
            })
        }
    };

    let features = tile
        .features
        .iter()
        .map(|feature| {
            let value = match (&feature.geometry, feature.class) {
                (TransformedGeometry::Points(points), _) => {
                    if points.len() == 1 {
                        Value::Point(project(&points[0]))
                    } else {
                        Value::MultiPoint(points.iter().map(&project).collect())
                    }
                }
                (TransformedGeometry::Rings(rings), GeomClass::Line) => {
                    let lines: Vec<Vec<Vec<f64>>> = rings
                        .iter()
                        .map(|ring| ring.iter().map(&project).collect())
                        .collect();
                    if lines.len() == 1 {
                        Value::LineString(lines.into_iter().next().unwrap_or_default())
                    } else {
                        Value::MultiLineString(lines)
                    }
                }
                (TransformedGeometry::Rings(rings), _) => {
                    let rings: Vec<Vec<Vec<f64>>> = rings
                        .iter()
                        .map(|ring| ring.iter().map(&project).collect())
                        .collect();
                    if rings.len() > 1 {
                        Value::MultiPolygon(vec![rings])
                    } else {
                        Value::Polygon(rings)
                    }
                }
            };
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(value)),
                id: feature.id.clone(),
                properties: Some(feature.tags.clone()),
                foreign_members: None,
            }
        })
        .collect();

    Some(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}
