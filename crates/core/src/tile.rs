//! Tile assembly: per-zoom simplification, winding correction and statistics.
//!
//! A tile keeps its feature geometry in world-normalized coordinates; scaling
//! to integer tile units happens lazily at read time (see
//! [`crate::transform`]) so one cached tile can serve any extent.

use geojson::feature::Id;
use geojson::JsonObject;
use serde_json::json;

use crate::feature::{VtFeature, VtGeometry, VtRing};
use crate::TileOptions;

/// Tile coordinates: x, y, and zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

/// Encode tile coordinates into a single map key:
/// `((2^z * y) + x) * 32 + z`.
///
/// Injective for `0 <= z <= 24` and `0 <= x, y < 2^z`; the largest value is
/// below 2^54 so it fits a u64 with room to spare.
pub fn tile_id(z: u8, x: u32, y: u32) -> u64 {
    (((1u64 << z) * y as u64 + x as u64) << 5) | z as u64
}

/// Geometry class tag carried by tile features: points, lines or polygons.
/// Multiplicity is recovered from the ring count on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeomClass {
    Point = 1,
    Line = 2,
    Polygon = 3,
}

/// Simplified tile-feature geometry, still in world-normalized coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum TileGeometry {
    Points(Vec<[f64; 2]>),
    Rings(Vec<Vec<[f64; 2]>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileFeature {
    pub geometry: TileGeometry,
    pub class: GeomClass,
    pub tags: JsonObject,
    pub id: Option<Id>,
}

/// A materialized tile.
///
/// `source` holds the unclipped working features only while this tile is a
/// current leaf; it is cleared the moment the tile is split, after which the
/// four children are authoritative.
#[derive(Debug, Clone)]
pub struct Tile {
    pub features: Vec<TileFeature>,
    pub num_points: usize,
    pub num_simplified: usize,
    pub num_features: usize,
    pub source: Option<Vec<VtFeature>>,
    pub x: u32,
    pub y: u32,
    pub z: u8,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// Build a tile from the features that intersect it, applying the per-zoom
/// simplification tolerance.
pub fn create_tile(features: &[VtFeature], z: u8, x: u32, y: u32, options: &TileOptions) -> Tile {
    // full detail at the base zoom
    let tolerance = if z == options.max_zoom {
        0.0
    } else {
        options.tolerance / ((1u64 << z) as f64 * options.extent as f64)
    };

    let mut tile = Tile {
        features: Vec::new(),
        num_points: 0,
        num_simplified: 0,
        num_features: features.len(),
        source: None,
        x,
        y,
        z,
        min_x: 2.0,
        min_y: 1.0,
        max_x: -1.0,
        max_y: 0.0,
    };

    for feature in features {
        add_feature(&mut tile, feature, tolerance, options);
    }

    tile
}

fn add_feature(tile: &mut Tile, feature: &VtFeature, tolerance: f64, options: &TileOptions) {
    tile.min_x = tile.min_x.min(feature.min_x);
    tile.min_y = tile.min_y.min(feature.min_y);
    tile.max_x = tile.max_x.max(feature.max_x);
    tile.max_y = tile.max_y.max(feature.max_y);

    let (geometry, class) = match &feature.geometry {
        VtGeometry::Point(p) => {
            tile.num_points += 1;
            tile.num_simplified += 1;
            (TileGeometry::Points(vec![[p.x, p.y]]), GeomClass::Point)
        }
        VtGeometry::MultiPoint(points) => {
            tile.num_points += points.len();
            tile.num_simplified += points.len();
            (
                TileGeometry::Points(points.iter().map(|p| [p.x, p.y]).collect()),
                GeomClass::Point,
            )
        }
        VtGeometry::LineString(ring) => {
            let mut rings = Vec::with_capacity(1);
            add_line(&mut rings, ring, tile, tolerance, false, false);
            (TileGeometry::Rings(rings), GeomClass::Line)
        }
        VtGeometry::MultiLineString(source) => {
            let mut rings = Vec::with_capacity(source.len());
            for ring in source {
                add_line(&mut rings, ring, tile, tolerance, false, false);
            }
            (TileGeometry::Rings(rings), GeomClass::Line)
        }
        VtGeometry::Polygon(source) => {
            let mut rings = Vec::with_capacity(source.len());
            for (i, ring) in source.iter().enumerate() {
                add_line(&mut rings, ring, tile, tolerance, true, i == 0);
            }
            (TileGeometry::Rings(rings), GeomClass::Polygon)
        }
        VtGeometry::MultiPolygon(polygons) => {
            // ring lists are flattened; polygon grouping is recovered on
            // output from ring count alone
            let mut rings = Vec::new();
            for polygon in polygons {
                for (i, ring) in polygon.iter().enumerate() {
                    add_line(&mut rings, ring, tile, tolerance, true, i == 0);
                }
            }
            (TileGeometry::Rings(rings), GeomClass::Polygon)
        }
    };

    let empty = match &geometry {
        TileGeometry::Points(points) => points.is_empty(),
        TileGeometry::Rings(rings) => rings.is_empty(),
    };
    if empty {
        return;
    }

    let mut tags = feature.tags.clone();
    if options.line_metrics {
        if let VtGeometry::LineString(ring) = &feature.geometry {
            if ring.size > 0.0 {
                tags.insert("mapbox_clip_start".to_string(), json!(ring.start / ring.size));
                tags.insert("mapbox_clip_end".to_string(), json!(ring.end / ring.size));
            }
        }
    }

    tile.features.push(TileFeature {
        geometry,
        class,
        tags,
        id: feature.id.clone(),
    });
}

fn add_line(
    result: &mut Vec<Vec<[f64; 2]>>,
    ring: &VtRing,
    tile: &mut Tile,
    tolerance: f64,
    is_polygon: bool,
    is_outer: bool,
) {
    let sq_tolerance = tolerance * tolerance;

    // whole rings below tile resolution vanish: length for lines, area for
    // polygon rings
    let threshold = if is_polygon { sq_tolerance } else { tolerance };
    if tolerance > 0.0 && ring.size < threshold {
        tile.num_points += ring.points.len();
        return;
    }

    let mut out = Vec::with_capacity(ring.points.len());
    for p in &ring.points {
        if tolerance == 0.0 || p.w > sq_tolerance {
            tile.num_simplified += 1;
            out.push([p.x, p.y]);
        }
        tile.num_points += 1;
    }

    if is_polygon {
        rewind(&mut out, is_outer);
    }

    result.push(out);
}

/// Enforce ring winding: outer rings one way, holes the other.
fn rewind(ring: &mut [[f64; 2]], clockwise: bool) {
    let mut area = 0.0;
    let len = ring.len();
    if len == 0 {
        return;
    }
    let mut j = len - 1;
    for i in 0..len {
        area += (ring[i][0] - ring[j][0]) * (ring[i][1] + ring[j][1]);
        j = i;
    }
    if (area > 0.0) == clockwise {
        ring.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::VtPoint;
    use std::collections::HashSet;

    fn point_feature(x: f64, y: f64) -> VtFeature {
        VtFeature::new(
            None,
            VtGeometry::Point(VtPoint::new(x, y, 0.0)),
            JsonObject::new(),
        )
    }

    fn weighted_line(points: &[(f64, f64, f64)], size: f64) -> VtFeature {
        let ring = VtRing {
            points: points.iter().map(|&(x, y, w)| VtPoint::new(x, y, w)).collect(),
            size,
            start: 0.0,
            end: size,
        };
        VtFeature::new(None, VtGeometry::LineString(ring), JsonObject::new())
    }

    // ========== Tile id encoding ==========

    #[test]
    fn test_tile_id_injective_low_zooms() {
        let mut seen = HashSet::new();
        for z in 0u8..=6 {
            let n = 1u32 << z;
            for y in 0..n {
                for x in 0..n {
                    assert!(seen.insert(tile_id(z, x, y)), "collision at z{z}-{x}-{y}");
                }
            }
        }
    }

    #[test]
    fn test_tile_id_max_zoom_fits() {
        let max = (1u32 << 24) - 1;
        let id = tile_id(24, max, max);
        assert!(id < 1u64 << 54);
        assert_ne!(id, tile_id(24, max - 1, max));
        assert_ne!(id, tile_id(23, max >> 1, max >> 1));
    }

    // ========== Tile creation ==========

    #[test]
    fn test_create_tile_counts_points() {
        let features = vec![point_feature(0.1, 0.1), point_feature(0.2, 0.2)];
        let tile = create_tile(&features, 0, 0, 0, &TileOptions::default());
        assert_eq!(tile.num_features, 2);
        assert_eq!(tile.num_points, 2);
        assert_eq!(tile.num_simplified, 2);
        assert_eq!(tile.features.len(), 2);
        assert!(tile.source.is_none());
    }

    #[test]
    fn test_low_weight_vertices_dropped() {
        // interior vertex has weight below the zoom-0 squared tolerance
        let features = vec![weighted_line(
            &[
                (0.0, 0.0, f64::INFINITY),
                (0.5, 1e-9, 1e-18),
                (1.0, 0.0, f64::INFINITY),
            ],
            1.0,
        )];
        let tile = create_tile(&features, 0, 0, 0, &TileOptions::default());
        let TileGeometry::Rings(rings) = &tile.features[0].geometry else {
            panic!("expected rings");
        };
        assert_eq!(rings[0].len(), 2);
        assert_eq!(tile.num_points, 3);
        assert_eq!(tile.num_simplified, 2);
    }

    #[test]
    fn test_max_zoom_keeps_all_vertices() {
        let features = vec![weighted_line(
            &[
                (0.0, 0.0, f64::INFINITY),
                (0.5, 1e-9, 1e-18),
                (1.0, 0.0, f64::INFINITY),
            ],
            1.0,
        )];
        let options = TileOptions::default();
        let tile = create_tile(&features, options.max_zoom, 0, 0, &options);
        let TileGeometry::Rings(rings) = &tile.features[0].geometry else {
            panic!("expected rings");
        };
        assert_eq!(rings[0].len(), 3);
    }

    #[test]
    fn test_tiny_line_vanishes() {
        // shorter than one tolerance unit at zoom 0
        let features = vec![weighted_line(
            &[(0.5, 0.5, f64::INFINITY), (0.5 + 1e-9, 0.5, f64::INFINITY)],
            1e-9,
        )];
        let tile = create_tile(&features, 0, 0, 0, &TileOptions::default());
        assert!(tile.features.is_empty());
        assert_eq!(tile.num_points, 2);
    }

    // ========== Winding ==========

    #[test]
    fn test_rewind_flips_inconsistent_rings() {
        let mut a = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]];
        let mut b = a.clone();
        rewind(&mut a, true);
        rewind(&mut b, false);
        assert_ne!(a, b);
        let mut a2 = a.clone();
        rewind(&mut a2, true);
        assert_eq!(a, a2); // idempotent once the winding is right
    }
}
