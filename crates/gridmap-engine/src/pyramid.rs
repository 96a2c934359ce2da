//! Zoom pyramid builder.

use gridmap_db::queries::tiles;
use gridmap_pyramid::{compose, decode, encode_png, Layout, RebuildPlan};
use gridmap_types::{Coord, MapId, TileData};
use image::RgbaImage;
use tracing::{info, warn};

use crate::{check_coord, EngineError, MapEngine, Result};

impl MapEngine {
    /// Recompute the tile at `(map, coord, zoom)` from its four children at
    /// `zoom - 1` and save it. Does not touch higher levels.
    pub fn rebuild_tile(&self, map: MapId, coord: Coord, zoom: u8) -> Result<TileData> {
        if zoom == 0 || zoom > self.config.max_zoom {
            return Err(EngineError::InvalidZoom(zoom));
        }
        check_coord(coord)?;
        let children = {
            let conn = self.db.lock();
            let mut out: [Option<TileData>; 4] = Default::default();
            for (slot, (_, _, child)) in coord.children().into_iter().enumerate() {
                out[slot] = tiles::get(&conn, map, zoom - 1, child)?;
            }
            out
        };
        let images = children.map(|child| child.and_then(|t| self.load_child(&t)));
        let canvas = compose(&images, self.config.tile_size);
        let file = Layout::zoom_file(map, zoom, coord);
        self.layout.write_atomic(&file, &encode_png(&canvas)?)?;
        self.save_tile_now(map, coord, zoom, &file)
    }

    /// Rebuild every ancestor of the given zoom-0 tiles, one level at a time,
    /// each shared ancestor once per level. Returns the number of tiles
    /// written.
    pub fn rebuild_ancestors<I>(&self, leaves: I) -> Result<usize>
    where
        I: IntoIterator<Item = (MapId, Coord)>,
    {
        let mut written = 0;
        for (zoom, batch) in RebuildPlan::from_leaves(self.config.max_zoom, leaves) {
            for (map, coord) in batch {
                self.rebuild_tile(map, coord, zoom)?;
                written += 1;
            }
        }
        Ok(written)
    }

    /// Rebuild every pyramid level of every map from zoom-0 records.
    pub fn rebuild_all(&self) -> Result<usize> {
        let leaves: Vec<_> = {
            let conn = self.db.lock();
            tiles::list_zoom(&conn, 0)?
                .into_iter()
                .map(|t| (t.map, t.coord))
                .collect()
        };
        info!(leaves = leaves.len(), "rebuilding all zoom levels");
        let written = self.rebuild_ancestors(leaves)?;
        info!(written, "zoom rebuild complete");
        Ok(written)
    }

    /// A child's pixels, or `None` for holes and unreadable images.
    fn load_child(&self, tile: &TileData) -> Option<RgbaImage> {
        if tile.is_hole() {
            return None;
        }
        match self.layout.read(&tile.file).and_then(|bytes| decode(&bytes)) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!(
                    map = tile.map,
                    zoom = tile.zoom,
                    coord = %tile.coord,
                    file = %tile.file,
                    "unreadable child tile, leaving quadrant empty: {e}"
                );
                None
            }
        }
    }
}
