//! End-to-end tiling tests over a small mixed feature collection.
//!
//! These exercise the whole pipeline: GeoJSON in, preprocessing, eager
//! indexing, lazy drill-down, and GeoJSON back out in both coordinate modes.

use geojson::{FeatureCollection, Value};
use serde_json::json;
use table_tiles_core::{CoordinateMode, TableTileSource, TileOptions};

fn sample_collection() -> FeatureCollection {
    FeatureCollection::try_from(json!({
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"kind": "region"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [-10.0, -10.0],
                        [30.0, -10.0],
                        [30.0, 25.0],
                        [-10.0, 25.0],
                        [-10.0, -10.0]
                    ]]
                }
            },
            {
                "type": "Feature",
                "properties": {"kind": "route"},
                "geometry": {
                    "type": "LineString",
                    "coordinates": [
                        [-60.0, -30.0],
                        [0.0, 10.0],
                        [60.0, -20.0],
                        [120.0, 40.0]
                    ]
                }
            },
            {
                "type": "Feature",
                "properties": {"kind": "city", "name": "origin"},
                "geometry": {"type": "Point", "coordinates": [5.0, 5.0]}
            }
        ]
    }))
    .expect("valid collection")
}

/// Collect every coordinate pair in a feature collection.
fn all_positions(fc: &FeatureCollection) -> Vec<(f64, f64)> {
    fn from_value(value: &Value, out: &mut Vec<(f64, f64)>) {
        match value {
            Value::Point(p) => out.push((p[0], p[1])),
            Value::MultiPoint(ps) => out.extend(ps.iter().map(|p| (p[0], p[1]))),
            Value::LineString(line) => out.extend(line.iter().map(|p| (p[0], p[1]))),
            Value::MultiLineString(lines) => {
                for line in lines {
                    out.extend(line.iter().map(|p| (p[0], p[1])));
                }
            }
            Value::Polygon(rings) => {
                for ring in rings {
                    out.extend(ring.iter().map(|p| (p[0], p[1])));
                }
            }
            Value::MultiPolygon(polygons) => {
                for rings in polygons {
                    for ring in rings {
                        out.extend(ring.iter().map(|p| (p[0], p[1])));
                    }
                }
            }
            Value::GeometryCollection(members) => {
                for member in members {
                    from_value(&member.value, out);
                }
            }
        }
    }

    let mut out = Vec::new();
    for feature in &fc.features {
        if let Some(geometry) = &feature.geometry {
            from_value(&geometry.value, &mut out);
        }
    }
    out
}

#[test]
fn root_tile_contains_every_feature() {
    let mut source = TableTileSource::new(&sample_collection(), TileOptions::default()).unwrap();
    let tile = source.get_tile(0, 0, 0).expect("root tile");
    assert_eq!(tile.features.len(), 3);
}

#[test]
fn local_coordinates_stay_within_buffered_extent() {
    let options = TileOptions {
        coordinates: CoordinateMode::Local,
        ..TileOptions::default()
    };
    let extent = options.extent as f64;
    let buffer = options.buffer as f64;
    let mut source = TableTileSource::new(&sample_collection(), options).unwrap();

    for z in 0u8..=4 {
        let n = 1i64 << z;
        for x in 0..n {
            for y in 0..n as u32 {
                let Some(tile) = source.get_tile(z, x, y) else {
                    continue;
                };
                for (px, py) in all_positions(&tile) {
                    assert!(
                        px >= -buffer && px <= extent + buffer,
                        "x {px} out of range in z{z}-{x}-{y}"
                    );
                    assert!(
                        py >= -buffer && py <= extent + buffer,
                        "y {py} out of range in z{z}-{x}-{y}"
                    );
                }
            }
        }
    }
}

#[test]
fn wgs84_point_round_trips_within_tile_resolution() {
    let mut source = TableTileSource::new(&sample_collection(), TileOptions::default()).unwrap();
    // the point at (5, 5) lives in z3-4-3
    let tile = source.get_tile(3, 4, 3).expect("tile with the city");
    let city = tile
        .features
        .iter()
        .find(|f| {
            f.properties
                .as_ref()
                .and_then(|p| p.get("kind"))
                .map(|k| k == "city")
                .unwrap_or(false)
        })
        .expect("city feature present");
    let Some(geometry) = &city.geometry else {
        panic!("city has geometry");
    };
    let Value::Point(coords) = &geometry.value else {
        panic!("expected point");
    };
    // one tile unit at z3 is 360 / (8 * 4096) degrees of longitude
    assert!((coords[0] - 5.0).abs() < 0.05, "lng {}", coords[0]);
    assert!((coords[1] - 5.0).abs() < 0.05, "lat {}", coords[1]);
}

#[test]
fn properties_survive_the_pipeline() {
    let mut source = TableTileSource::new(&sample_collection(), TileOptions::default()).unwrap();
    let tile = source.get_tile(0, 0, 0).expect("root tile");
    let kinds: Vec<&serde_json::Value> = tile
        .features
        .iter()
        .filter_map(|f| f.properties.as_ref().and_then(|p| p.get("kind")))
        .collect();
    assert_eq!(kinds.len(), 3);
    assert!(kinds.contains(&&json!("region")));
    assert!(kinds.contains(&&json!("route")));
    assert!(kinds.contains(&&json!("city")));
}

#[test]
fn repeated_requests_reuse_the_cache() {
    let mut source = TableTileSource::new(&sample_collection(), TileOptions::default()).unwrap();
    let first = source.get_tile(6, 33, 31);
    let after_first = source.total();
    let second = source.get_tile(6, 33, 31);
    assert_eq!(first, second);
    assert_eq!(source.total(), after_first);
}

#[test]
fn deep_zoom_line_is_split_across_neighboring_tiles() {
    let mut source = TableTileSource::new(&sample_collection(), TileOptions::default()).unwrap();
    // the route crosses the prime meridian near lat 10, so both z5 tiles on
    // either side of it carry a slice
    let west = source.get_tile(5, 15, 15).expect("west tile");
    let east = source.get_tile(5, 16, 15).expect("east tile");
    let has_route = |fc: &FeatureCollection| {
        fc.features.iter().any(|f| {
            f.properties
                .as_ref()
                .and_then(|p| p.get("kind"))
                .map(|k| k == "route")
                .unwrap_or(false)
        })
    };
    assert!(has_route(&west));
    assert!(has_route(&east));
}

#[test]
fn line_metrics_tags_accumulate_across_clips() {
    let options = TileOptions {
        line_metrics: true,
        ..TileOptions::default()
    };
    let mut source = TableTileSource::new(&sample_collection(), options).unwrap();
    let tile = source.get_tile(2, 2, 1).expect("tile with a route slice");
    let route = tile
        .features
        .iter()
        .find(|f| {
            f.properties
                .as_ref()
                .and_then(|p| p.get("kind"))
                .map(|k| k == "route")
                .unwrap_or(false)
        })
        .expect("route slice present");
    let props = route.properties.as_ref().expect("properties");
    let start = props
        .get("mapbox_clip_start")
        .and_then(|v| v.as_f64())
        .expect("clip start");
    let end = props
        .get("mapbox_clip_end")
        .and_then(|v| v.as_f64())
        .expect("clip end");
    assert!((0.0..=1.0).contains(&start));
    assert!((0.0..=1.0).contains(&end));
    assert!(start < end);
}

#[test]
fn metadata_matches_options() {
    let options = TileOptions {
        max_zoom: 10,
        schema: Some(json!({"fields": [{"name": "kind", "type": "string"}]})),
        ..TileOptions::default()
    };
    let source = TableTileSource::new(&sample_collection(), options).unwrap();
    let metadata = source.metadata();
    assert_eq!(metadata.min_zoom, 0);
    assert_eq!(metadata.max_zoom, 10);
    let json = serde_json::to_value(&metadata).expect("serializable");
    assert_eq!(json["maxZoom"], json!(10));
    assert!(json["schema"]["fields"].is_array());
}
