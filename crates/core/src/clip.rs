//! Stripe clipping along a single axis.
//!
//! The splitter cuts a tile's features into halves with two calls per axis,
//! so this clipper only ever deals with one axis-aligned interval at a time.
//! Intersection points are produced by linear interpolation and carry weight
//! 1.0, large enough to survive simplification at any practical tolerance.
//!
//! `None` means "nothing intersects the interval at all" and tells the caller
//! not to recurse into that quadrant; it is distinct from a feature list that
//! became empty after degenerate filtering.

use crate::feature::{VtFeature, VtGeometry, VtPoint, VtRing};
use crate::TileOptions;

/// Axis along which a clip interval applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    fn value(self, p: &VtPoint) -> f64 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }
}

/// Clip features to the `[k1, k2]` interval along `axis`.
///
/// `k1`/`k2` are given in tile counts at the current zoom and divided by
/// `scale`; `min_all`/`max_all` are the bounding range of the whole feature
/// set along the axis, used for trivial accept/reject before any per-feature
/// work.
pub fn clip(
    features: &[VtFeature],
    scale: f64,
    k1: f64,
    k2: f64,
    axis: Axis,
    min_all: f64,
    max_all: f64,
    options: &TileOptions,
) -> Option<Vec<VtFeature>> {
    let k1 = k1 / scale;
    let k2 = k2 / scale;

    if min_all >= k1 && max_all < k2 {
        return Some(features.to_vec()); // trivial accept
    } else if max_all < k1 || min_all >= k2 {
        return None; // trivial reject
    }

    let mut clipped = Vec::new();

    for feature in features {
        let (min, max) = match axis {
            Axis::X => (feature.min_x, feature.max_x),
            Axis::Y => (feature.min_y, feature.max_y),
        };

        if min >= k1 && max < k2 {
            clipped.push(feature.clone());
            continue;
        } else if max < k1 || min >= k2 {
            continue;
        }

        match &feature.geometry {
            VtGeometry::Point(p) => {
                let v = axis.value(p);
                if v >= k1 && v <= k2 {
                    clipped.push(remake(feature, VtGeometry::Point(*p)));
                }
            }
            VtGeometry::MultiPoint(points) => {
                let kept: Vec<VtPoint> = points
                    .iter()
                    .filter(|p| {
                        let v = axis.value(p);
                        v >= k1 && v <= k2
                    })
                    .copied()
                    .collect();
                match kept.len() {
                    0 => {}
                    1 => clipped.push(remake(feature, VtGeometry::Point(kept[0]))),
                    _ => clipped.push(remake(feature, VtGeometry::MultiPoint(kept))),
                }
            }
            VtGeometry::LineString(ring) => {
                let mut slices = Vec::new();
                clip_line(ring, &mut slices, k1, k2, axis, false, options.line_metrics);
                slices.retain(|slice| slice.len() >= 2);
                if options.line_metrics {
                    // each slice keeps its own running-length offsets
                    for slice in slices {
                        clipped.push(remake(feature, VtGeometry::LineString(slice)));
                    }
                } else {
                    match slices.len() {
                        0 => {}
                        1 => clipped.push(remake(
                            feature,
                            VtGeometry::LineString(slices.into_iter().next().unwrap_or_default()),
                        )),
                        _ => clipped.push(remake(feature, VtGeometry::MultiLineString(slices))),
                    }
                }
            }
            VtGeometry::MultiLineString(rings) => {
                let mut slices = Vec::new();
                for ring in rings {
                    clip_line(ring, &mut slices, k1, k2, axis, false, false);
                }
                slices.retain(|slice| slice.len() >= 2);
                match slices.len() {
                    0 => {}
                    1 => clipped.push(remake(
                        feature,
                        VtGeometry::LineString(slices.into_iter().next().unwrap_or_default()),
                    )),
                    _ => clipped.push(remake(feature, VtGeometry::MultiLineString(slices))),
                }
            }
            VtGeometry::Polygon(rings) => {
                let kept = clip_rings(rings, k1, k2, axis);
                if !kept.is_empty() {
                    clipped.push(remake(feature, VtGeometry::Polygon(kept)));
                }
            }
            VtGeometry::MultiPolygon(polygons) => {
                let kept: Vec<Vec<VtRing>> = polygons
                    .iter()
                    .map(|polygon| clip_rings(polygon, k1, k2, axis))
                    .filter(|rings| !rings.is_empty())
                    .collect();
                if !kept.is_empty() {
                    clipped.push(remake(feature, VtGeometry::MultiPolygon(kept)));
                }
            }
        }
    }

    if clipped.is_empty() {
        None
    } else {
        Some(clipped)
    }
}

/// Rebuild a feature around new geometry, recomputing its bounding box.
fn remake(feature: &VtFeature, geometry: VtGeometry) -> VtFeature {
    VtFeature::new(feature.id.clone(), geometry, feature.tags.clone())
}

fn clip_rings(rings: &[VtRing], k1: f64, k2: f64, axis: Axis) -> Vec<VtRing> {
    let mut kept = Vec::with_capacity(rings.len());
    for ring in rings {
        let mut out = Vec::new();
        clip_line(ring, &mut out, k1, k2, axis, true, false);
        // a closed ring needs at least 3 distinct points plus the closing one
        kept.extend(out.into_iter().filter(|ring| ring.len() >= 4));
    }
    kept
}

fn clip_line(
    ring: &VtRing,
    out: &mut Vec<VtRing>,
    k1: f64,
    k2: f64,
    axis: Axis,
    is_polygon: bool,
    track_metrics: bool,
) {
    let mut slice = new_slice(ring);
    let mut len = ring.start;
    let points = &ring.points;

    for i in 0..points.len().saturating_sub(1) {
        let a = points[i];
        let b = points[i + 1];
        let av = axis.value(&a);
        let bv = axis.value(&b);
        let mut exited = false;
        let mut t = 0.0;

        let seg_len = if track_metrics {
            ((a.x - b.x) * (a.x - b.x) + (a.y - b.y) * (a.y - b.y)).sqrt()
        } else {
            0.0
        };

        if av < k1 {
            // segment enters from below k1
            if bv > k1 {
                t = intersect(&mut slice, a, b, k1, axis);
                if track_metrics {
                    slice.start = len + seg_len * t;
                }
            }
        } else if av > k2 {
            // segment enters from above k2
            if bv < k2 {
                t = intersect(&mut slice, a, b, k2, axis);
                if track_metrics {
                    slice.start = len + seg_len * t;
                }
            }
        } else {
            slice.points.push(a);
        }

        if bv < k1 && av >= k1 {
            t = intersect(&mut slice, a, b, k1, axis);
            exited = true;
        }
        if bv > k2 && av <= k2 {
            t = intersect(&mut slice, a, b, k2, axis);
            exited = true;
        }

        if !is_polygon && exited {
            if track_metrics {
                slice.end = len + seg_len * t;
            }
            out.push(std::mem::replace(&mut slice, new_slice(ring)));
        }

        if track_metrics {
            len += seg_len;
        }
    }

    if let Some(&last) = points.last() {
        let v = axis.value(&last);
        if v >= k1 && v <= k2 {
            slice.points.push(last);
        }
    }

    // close the ring if its endpoints drifted apart during clipping
    if is_polygon && slice.points.len() >= 2 {
        let first = slice.points[0];
        let last = slice.points[slice.points.len() - 1];
        if first.x != last.x || first.y != last.y {
            slice.points.push(first);
        }
    }

    if !slice.points.is_empty() {
        out.push(slice);
    }
}

/// New empty slice inheriting the source ring's metric fields.
fn new_slice(ring: &VtRing) -> VtRing {
    VtRing {
        points: Vec::new(),
        size: ring.size,
        start: ring.start,
        end: ring.end,
    }
}

/// Add the interpolated boundary crossing to the slice; returns the
/// interpolation parameter for metric tracking.
fn intersect(slice: &mut VtRing, a: VtPoint, b: VtPoint, v: f64, axis: Axis) -> f64 {
    match axis {
        Axis::X => {
            let t = (v - a.x) / (b.x - a.x);
            slice.points.push(VtPoint::new(v, a.y + (b.y - a.y) * t, 1.0));
            t
        }
        Axis::Y => {
            let t = (v - a.y) / (b.y - a.y);
            slice.points.push(VtPoint::new(a.x + (b.x - a.x) * t, v, 1.0));
            t
        }
    }
}
