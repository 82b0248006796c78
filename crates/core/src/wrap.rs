//! Date line processing.
//!
//! Features that straddle ±180° project to the far left/right edges of the
//! [0,1] world. To render them seamlessly in both hemispheres, the edge strips
//! are clipped out, shifted by a full world width and merged back, so both
//! copies are available to the tiler.

use crate::clip::{clip, Axis};
use crate::feature::{VtFeature, VtGeometry, VtPoint, VtRing};
use crate::TileOptions;

/// Duplicate features that straddle the antimeridian.
///
/// Leaves the feature list untouched when nothing reaches into the buffered
/// edge strips.
pub fn wrap(features: Vec<VtFeature>, options: &TileOptions) -> Vec<VtFeature> {
    let buffer = options.buffer as f64 / options.extent as f64;

    let left = clip(
        &features,
        1.0,
        -1.0 - buffer,
        buffer,
        Axis::X,
        -1.0,
        2.0,
        options,
    );
    let right = clip(
        &features,
        1.0,
        1.0 - buffer,
        2.0 + buffer,
        Axis::X,
        -1.0,
        2.0,
        options,
    );

    if left.is_none() && right.is_none() {
        return features;
    }

    let mut merged = clip(
        &features,
        1.0,
        -buffer,
        1.0 + buffer,
        Axis::X,
        -1.0,
        2.0,
        options,
    )
    .unwrap_or_default();

    if let Some(left) = left {
        let mut shifted = shift_features(left, 1.0);
        shifted.append(&mut merged);
        merged = shifted;
    }
    if let Some(right) = right {
        merged.extend(shift_features(right, -1.0));
    }

    merged
}

/// Shift all x coordinates by `offset` world widths, rebuilding bounding
/// boxes.
fn shift_features(features: Vec<VtFeature>, offset: f64) -> Vec<VtFeature> {
    features
        .into_iter()
        .map(|feature| {
            let geometry = match feature.geometry {
                VtGeometry::Point(p) => VtGeometry::Point(shift_point(p, offset)),
                VtGeometry::MultiPoint(points) => VtGeometry::MultiPoint(
                    points.into_iter().map(|p| shift_point(p, offset)).collect(),
                ),
                VtGeometry::LineString(ring) => VtGeometry::LineString(shift_ring(ring, offset)),
                VtGeometry::MultiLineString(rings) => VtGeometry::MultiLineString(
                    rings.into_iter().map(|r| shift_ring(r, offset)).collect(),
                ),
                VtGeometry::Polygon(rings) => VtGeometry::Polygon(
                    rings.into_iter().map(|r| shift_ring(r, offset)).collect(),
                ),
                VtGeometry::MultiPolygon(polygons) => VtGeometry::MultiPolygon(
                    polygons
                        .into_iter()
                        .map(|rings| rings.into_iter().map(|r| shift_ring(r, offset)).collect())
                        .collect(),
                ),
            };
            VtFeature::new(feature.id, geometry, feature.tags)
        })
        .collect()
}

fn shift_point(p: VtPoint, offset: f64) -> VtPoint {
    VtPoint::new(p.x + offset, p.y, p.w)
}

fn shift_ring(mut ring: VtRing, offset: f64) -> VtRing {
    for p in &mut ring.points {
        p.x += offset;
    }
    ring
}
