//! The tile source: initial indexing plus on-demand drill-down.
//!
//! Construction preprocesses the input and tiles it down to `index_max_zoom`,
//! stopping early wherever a tile falls under the point budget. Deeper tiles
//! are produced lazily on first request by re-splitting the retained source
//! geometry of the nearest indexed ancestor, and every produced tile is kept
//! in the cache.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use geojson::FeatureCollection;

use crate::clip::{clip, Axis};
use crate::convert::convert;
use crate::feature::VtFeature;
use crate::tile::{create_tile, tile_id, Tile, TileCoord};
use crate::transform::{to_feature_collection, transform_tile, TransformedTile};
use crate::wrap::wrap;
use crate::{Error, Metadata, Result, TileOptions};

/// Incremental tile index over a GeoJSON feature collection.
///
/// A successfully constructed source is always ready to serve tiles; invalid
/// option combinations are rejected up front.
#[derive(Debug)]
pub struct TableTileSource {
    options: TileOptions,
    tiles: HashMap<u64, Tile>,
    tile_coords: Vec<TileCoord>,
    stats: HashMap<u8, usize>,
    total: usize,
}

impl TableTileSource {
    /// Index a feature collection for tiling.
    ///
    /// # Arguments
    /// * `data` - the input features, in WGS84 lng/lat
    /// * `options` - tiling parameters, see [`TileOptions`]
    pub fn new(data: &FeatureCollection, options: TileOptions) -> Result<Self> {
        if options.max_zoom > 24 {
            return Err(Error::MaxZoomOutOfRange(options.max_zoom));
        }
        if options.promote_id.is_some() && options.generate_id {
            return Err(Error::PromoteAndGenerateId);
        }

        let mut source = TableTileSource {
            options,
            tiles: HashMap::new(),
            tile_coords: Vec::new(),
            stats: HashMap::new(),
            total: 0,
        };

        if source.options.debug > 0 {
            log::info!("preprocessing {} input features", data.features.len());
        }

        let features = convert(data, &source.options);
        let features = wrap(features, &source.options);

        if !features.is_empty() {
            source.split_tile(features, 0, 0, 0, None);
        }

        if source.options.debug > 0 {
            log::info!(
                "initial indexing produced {} tiles up to z{}",
                source.total,
                source.options.index_max_zoom
            );
        }

        Ok(source)
    }

    /// Fetch a tile as GeoJSON, generating it on demand.
    ///
    /// Coordinates follow [`TileOptions::coordinates`]: projected back to
    /// WGS84 or left in integer tile units. Returns `None` when no feature
    /// intersects the tile.
    pub fn get_tile(&mut self, z: u8, x: i64, y: u32) -> Option<FeatureCollection> {
        let tile = self.get_raw_tile(z, x, y)?;
        to_feature_collection(&tile, self.options.coordinates, self.options.extent)
    }

    /// Fetch a tile in integer tile units, generating it on demand.
    ///
    /// `x` wraps across the antimeridian, so `x = -1` at zoom 1 is the tile
    /// at `x = 1`.
    pub fn get_raw_tile(&mut self, z: u8, x: i64, y: u32) -> Option<TransformedTile> {
        if z > 24 {
            return None;
        }

        let x = x.rem_euclid(1i64 << z) as u32;
        let id = tile_id(z, x, y);
        if let Some(tile) = self.tiles.get(&id) {
            return Some(transform_tile(tile, self.options.extent));
        }

        if self.options.debug > 1 {
            log::debug!("drilling down to z{z}-{x}-{y}");
        }

        // walk up to the nearest ancestor that still holds source geometry
        let mut z0 = z;
        let mut x0 = x;
        let mut y0 = y;
        let mut source = None;
        while source.is_none() && z0 > 0 {
            z0 -= 1;
            x0 >>= 1;
            y0 >>= 1;
            source = self
                .tiles
                .get_mut(&tile_id(z0, x0, y0))
                .and_then(|tile| tile.source.take());
        }
        let source = source?;

        if self.options.debug > 1 {
            log::debug!("found parent tile z{z0}-{x0}-{y0}");
        }
        self.split_tile(source, z0, x0, y0, Some((z, x, y)));

        self.tiles
            .get(&id)
            .map(|tile| transform_tile(tile, self.options.extent))
    }

    /// Tileset metadata for clients: zoom range and the optional user schema.
    pub fn metadata(&self) -> Metadata {
        Metadata {
            schema: self.options.schema.clone(),
            min_zoom: 0,
            max_zoom: self.options.max_zoom,
        }
    }

    /// Coordinates of every tile materialized so far, in creation order.
    pub fn tile_coords(&self) -> &[TileCoord] {
        &self.tile_coords
    }

    /// Number of tiles created per zoom level.
    pub fn stats(&self) -> &HashMap<u8, usize> {
        &self.stats
    }

    /// Total number of tiles created.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Split tiles breadth-agnostically down from `(z, x, y)`.
    ///
    /// Without a target this is the initial indexing pass, stopping at
    /// `index_max_zoom` or when a tile is simple enough. With a target it
    /// descends only along the ancestor chain of the requested tile, leaving
    /// retained source geometry on every sibling it touches.
    fn split_tile(
        &mut self,
        features: Vec<VtFeature>,
        z: u8,
        x: u32,
        y: u32,
        target: Option<(u8, u32, u32)>,
    ) {
        let mut stack = vec![(features, z, x, y)];

        while let Some((features, z, x, y)) = stack.pop() {
            let id = tile_id(z, x, y);

            let tile = match self.tiles.entry(id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let tile = create_tile(&features, z, x, y, &self.options);
                    if self.options.debug > 1 {
                        log::debug!(
                            "tile z{z}-{x}-{y}: {} points ({} simplified)",
                            tile.num_points,
                            tile.num_simplified
                        );
                    }
                    self.tile_coords.push(TileCoord { x, y, z });
                    *self.stats.entry(z).or_insert(0) += 1;
                    self.total += 1;
                    entry.insert(tile)
                }
            };

            let stop = match target {
                // initial pass: stop at the index ceiling or when simple enough
                None => {
                    z == self.options.index_max_zoom
                        || tile.num_points <= self.options.max_points_per_tile
                }
                Some((tz, tx, ty)) => {
                    if z == self.options.max_zoom || z == tz {
                        true
                    } else {
                        // abandon branches that are not ancestors of the target
                        let steps = tz - z;
                        x != tx >> steps || y != ty >> steps
                    }
                }
            };

            if stop {
                // retain the working geometry for later drill-down
                tile.source = Some(features);
                continue;
            }
            tile.source = None;

            if features.is_empty() {
                continue;
            }

            let (min_x, min_y, max_x, max_y) = (tile.min_x, tile.min_y, tile.max_x, tile.max_y);

            let z2 = (1u64 << z) as f64;
            let k1 = 0.5 * self.options.buffer as f64 / self.options.extent as f64;
            let k2 = 0.5 - k1;
            let k3 = 0.5 + k1;
            let k4 = 1.0 + k1;

            let xf = x as f64;
            let yf = y as f64;

            let left = clip(
                &features,
                z2,
                xf - k1,
                xf + k3,
                Axis::X,
                min_x,
                max_x,
                &self.options,
            );
            let right = clip(
                &features,
                z2,
                xf + k2,
                xf + k4,
                Axis::X,
                min_x,
                max_x,
                &self.options,
            );
            drop(features);

            let mut quads = [None, None, None, None];
            if let Some(left) = left {
                quads[0] = clip(&left, z2, yf - k1, yf + k3, Axis::Y, min_y, max_y, &self.options);
                quads[1] = clip(&left, z2, yf + k2, yf + k4, Axis::Y, min_y, max_y, &self.options);
            }
            if let Some(right) = right {
                quads[2] = clip(&right, z2, yf - k1, yf + k3, Axis::Y, min_y, max_y, &self.options);
                quads[3] = clip(&right, z2, yf + k2, yf + k4, Axis::Y, min_y, max_y, &self.options);
            }

            let [tl, bl, tr, br] = quads;
            // empty quadrants still materialize, so repeated requests skip them
            stack.push((tl.unwrap_or_default(), z + 1, x * 2, y * 2));
            stack.push((bl.unwrap_or_default(), z + 1, x * 2, y * 2 + 1));
            stack.push((tr.unwrap_or_default(), z + 1, x * 2 + 1, y * 2));
            stack.push((br.unwrap_or_default(), z + 1, x * 2 + 1, y * 2 + 1));
        }
    }
}
