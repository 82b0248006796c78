//! GeoJSON conversion and preprocessing.
//!
//! Projects input features into normalized [0,1] tile-pyramid space
//! (Web Mercator), computes per-ring metrics, and runs the simplification
//! weight pass so later tiling never has to touch raw coordinates again.

use std::f64::consts::PI;

use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, JsonObject, Value};
use serde_json::Value as Json;

use crate::feature::{VtFeature, VtGeometry, VtPoint, VtRing};
use crate::simplify::simplify;
use crate::TileOptions;

/// Convert a GeoJSON feature table into the working representation.
///
/// Features without geometry, with empty coordinate arrays, or with degenerate
/// rings are skipped per-feature rather than failing the whole conversion.
pub fn convert(table: &FeatureCollection, options: &TileOptions) -> Vec<VtFeature> {
    let mut features = Vec::with_capacity(table.features.len());
    for (index, feature) in table.features.iter().enumerate() {
        convert_feature(&mut features, feature, options, index);
    }
    features
}

fn convert_feature(out: &mut Vec<VtFeature>, feature: &Feature, options: &TileOptions, index: usize) {
    let Some(geometry) = &feature.geometry else {
        log::warn!("skipping feature {index}: no geometry");
        return;
    };

    let id = if let Some(name) = &options.promote_id {
        feature
            .properties
            .as_ref()
            .and_then(|props| props.get(name))
            .and_then(json_to_id)
    } else if options.generate_id {
        Some(Id::Number((index as u64).into()))
    } else {
        feature.id.clone()
    };

    let tags = feature.properties.clone().unwrap_or_default();
    convert_geometry(out, &geometry.value, id, tags, options, index);
}

fn convert_geometry(
    out: &mut Vec<VtFeature>,
    value: &Value,
    id: Option<Id>,
    tags: JsonObject,
    options: &TileOptions,
    index: usize,
) {
    // base tolerance: weights below this are left at zero, which is exactly
    // the set of vertices invisible at every zoom up to max_zoom
    let sq_tolerance = (options.tolerance
        / ((1u64 << options.max_zoom) as f64 * options.extent as f64))
        .powi(2);

    let geometry = match value {
        Value::Point(p) => {
            if p.len() < 2 {
                log::warn!("skipping feature {index}: malformed position");
                return;
            }
            VtGeometry::Point(project_point(p))
        }
        Value::MultiPoint(coords) => {
            if coords.is_empty() {
                return;
            }
            if !positions_valid(coords) {
                log::warn!("skipping feature {index}: malformed position");
                return;
            }
            VtGeometry::MultiPoint(coords.iter().map(|p| project_point(p)).collect())
        }
        Value::LineString(line) => {
            if line.len() < 2 {
                log::warn!("skipping feature {index}: degenerate line");
                return;
            }
            if !positions_valid(line) {
                log::warn!("skipping feature {index}: malformed position");
                return;
            }
            VtGeometry::LineString(convert_line(line, sq_tolerance, false))
        }
        Value::MultiLineString(lines) => {
            if lines.iter().any(|line| !positions_valid(line)) {
                log::warn!("skipping feature {index}: malformed position");
                return;
            }
            if options.line_metrics {
                // explode into one feature per part so running-length offsets
                // stay meaningful through clipping
                for line in lines {
                    if line.len() < 2 {
                        continue;
                    }
                    let ring = convert_line(line, sq_tolerance, false);
                    out.push(VtFeature::new(
                        id.clone(),
                        VtGeometry::LineString(ring),
                        tags.clone(),
                    ));
                }
                return;
            }
            let rings: Vec<VtRing> = lines
                .iter()
                .filter(|line| line.len() >= 2)
                .map(|line| convert_line(line, sq_tolerance, false))
                .collect();
            if rings.is_empty() {
                return;
            }
            VtGeometry::MultiLineString(rings)
        }
        Value::Polygon(polygon) => {
            if polygon.iter().any(|ring| !positions_valid(ring)) {
                log::warn!("skipping feature {index}: malformed position");
                return;
            }
            let rings = convert_rings(polygon, sq_tolerance);
            if rings.is_empty() {
                return;
            }
            VtGeometry::Polygon(rings)
        }
        Value::MultiPolygon(polygons) => {
            if polygons
                .iter()
                .any(|polygon| polygon.iter().any(|ring| !positions_valid(ring)))
            {
                log::warn!("skipping feature {index}: malformed position");
                return;
            }
            let converted: Vec<Vec<VtRing>> = polygons
                .iter()
                .map(|polygon| convert_rings(polygon, sq_tolerance))
                .filter(|rings| !rings.is_empty())
                .collect();
            if converted.is_empty() {
                return;
            }
            VtGeometry::MultiPolygon(converted)
        }
        Value::GeometryCollection(members) => {
            for member in members {
                convert_geometry(out, &member.value, id.clone(), tags.clone(), options, index);
            }
            return;
        }
    };

    out.push(VtFeature::new(id, geometry, tags));
}

/// Convert a polygon's rings, dropping degenerate zero-area rings. An empty
/// result means the whole polygon was degenerate.
fn convert_rings(polygon: &[Vec<Vec<f64>>], sq_tolerance: f64) -> Vec<VtRing> {
    let mut rings = Vec::with_capacity(polygon.len());
    for (i, ring) in polygon.iter().enumerate() {
        if ring.len() < 3 {
            continue;
        }
        let converted = convert_line(ring, sq_tolerance, true);
        if converted.size == 0.0 {
            // zero-area ring: an outer ring kills the polygon, a hole is
            // simply dropped
            if i == 0 {
                return Vec::new();
            }
            continue;
        }
        rings.push(converted);
    }
    rings
}

fn convert_line(line: &[Vec<f64>], sq_tolerance: f64, is_polygon: bool) -> VtRing {
    let mut ring = VtRing::with_capacity(line.len() + 1);
    let mut size = 0.0;
    let (mut x0, mut y0) = (0.0, 0.0);

    for (j, coord) in line.iter().enumerate() {
        let x = project_x(coord[0]);
        let y = project_y(coord[1]);
        ring.points.push(VtPoint::new(x, y, 0.0));
        if j > 0 {
            if is_polygon {
                size += (x0 * y - x * y0) / 2.0; // signed area contribution
            } else {
                size += ((x - x0) * (x - x0) + (y - y0) * (y - y0)).sqrt();
            }
        }
        x0 = x;
        y0 = y;
    }

    // polygon rings must be closed for the shoelace sum and the clipper
    if is_polygon {
        let first = ring.points[0];
        let last = ring.points[ring.points.len() - 1];
        if first.x != last.x || first.y != last.y {
            size += (last.x * first.y - first.x * last.y) / 2.0;
            ring.points.push(first);
        }
    }

    let last = ring.points.len() - 1;
    ring.points[0].w = f64::INFINITY;
    if last > 0 {
        simplify(&mut ring.points, 0, last, sq_tolerance);
        ring.points[last].w = f64::INFINITY;
    }

    ring.size = size.abs();
    ring.start = 0.0;
    ring.end = ring.size;
    ring
}

/// Positions built through the typed API can be arbitrarily short; anything
/// below an x/y pair cannot be projected.
fn positions_valid(coords: &[Vec<f64>]) -> bool {
    coords.iter().all(|coord| coord.len() >= 2)
}

fn project_point(coord: &[f64]) -> VtPoint {
    VtPoint::new(project_x(coord[0]), project_y(coord[1]), 0.0)
}

fn project_x(x: f64) -> f64 {
    x / 360.0 + 0.5
}

fn project_y(y: f64) -> f64 {
    let sin = (y * PI / 180.0).sin();
    let y2 = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y2.clamp(0.0, 1.0)
}

fn json_to_id(value: &Json) -> Option<Id> {
    match value {
        Json::String(s) => Some(Id::String(s.clone())),
        Json::Number(n) => Some(Id::Number(n.clone())),
        _ => None,
    }
}
