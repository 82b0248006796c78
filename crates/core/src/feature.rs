//! Working feature representation used throughout the tiling pipeline.
//!
//! Input GeoJSON is converted once into these types: coordinates are projected
//! into normalized [0,1] tile-pyramid space and every vertex carries a
//! simplification weight alongside x/y. Geometry multiplicity is resolved at
//! conversion time into a closed sum type, so the clipper and tile builder
//! never dispatch on runtime type tags.

use geojson::feature::Id;
use geojson::JsonObject;

/// A projected vertex: normalized world coordinates plus the simplification
/// weight computed during preprocessing.
///
/// Line endpoints and polygon-ring anchors carry `w = f64::INFINITY` so no
/// tolerance can ever drop them; points introduced by clipping carry `w = 1.0`
/// which survives any practical tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VtPoint {
    pub x: f64,
    pub y: f64,
    pub w: f64,
}

impl VtPoint {
    pub fn new(x: f64, y: f64, w: f64) -> Self {
        Self { x, y, w }
    }
}

/// A line or polygon ring with its precomputed metric.
///
/// `size` is the projected length for lines and the absolute shoelace area for
/// polygon rings. `start`/`end` are running-length offsets into the original
/// line, updated by the clipper when line metrics are enabled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VtRing {
    pub points: Vec<VtPoint>,
    pub size: f64,
    pub start: f64,
    pub end: f64,
}

impl VtRing {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Geometry of a working feature.
///
/// Polygon rings are closed (first point equals last point); the first ring of
/// a polygon is the outer ring, the rest are holes.
#[derive(Debug, Clone, PartialEq)]
pub enum VtGeometry {
    Point(VtPoint),
    MultiPoint(Vec<VtPoint>),
    LineString(VtRing),
    MultiLineString(Vec<VtRing>),
    Polygon(Vec<VtRing>),
    MultiPolygon(Vec<Vec<VtRing>>),
}

/// A feature in the working representation, with a cached bounding box used
/// for trivial accept/reject during clipping.
#[derive(Debug, Clone, PartialEq)]
pub struct VtFeature {
    pub id: Option<Id>,
    pub geometry: VtGeometry,
    pub tags: JsonObject,
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl VtFeature {
    /// Build a feature and compute its bounding box from the geometry.
    pub fn new(id: Option<Id>, geometry: VtGeometry, tags: JsonObject) -> Self {
        let mut feature = Self {
            id,
            geometry,
            tags,
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        feature.calc_bbox();
        feature
    }

    fn calc_bbox(&mut self) {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        let mut expand = |points: &[VtPoint]| {
            for p in points {
                min_x = min_x.min(p.x);
                min_y = min_y.min(p.y);
                max_x = max_x.max(p.x);
                max_y = max_y.max(p.y);
            }
        };

        match &self.geometry {
            VtGeometry::Point(p) => expand(std::slice::from_ref(p)),
            VtGeometry::MultiPoint(points) => expand(points),
            VtGeometry::LineString(ring) => expand(&ring.points),
            VtGeometry::MultiLineString(rings) | VtGeometry::Polygon(rings) => {
                for ring in rings {
                    expand(&ring.points);
                }
            }
            VtGeometry::MultiPolygon(polygons) => {
                for polygon in polygons {
                    for ring in polygon {
                        expand(&ring.points);
                    }
                }
            }
        }

        self.min_x = min_x;
        self.min_y = min_y;
        self.max_x = max_x;
        self.max_y = max_y;
    }
}
