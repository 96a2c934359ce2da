//! Fragment image uploads.

use gridmap_db::queries::{grids, tiles};
use gridmap_pyramid::Layout;
use gridmap_types::{Coord, MapId, TileData};
use tracing::{debug, info};

use crate::{unix_now, EngineError, MapEngine, Result};

/// What happened to an upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Stored as the zoom-0 tile at this position, ancestors rebuilt.
    Stored { map: MapId, coord: Coord },
    /// The fragment was uploaded recently; nothing written.
    Throttled,
}

impl MapEngine {
    /// Store the image of a registered fragment and refresh its pyramid.
    ///
    /// The bytes are stored as given; undecodable images only show up as
    /// empty quadrants in the ancestors.
    pub fn upload_grid(&self, id: &str, bytes: &[u8]) -> Result<UploadOutcome> {
        let grid = {
            let conn = self.db.lock();
            grids::get(&conn, id)?.ok_or_else(|| EngineError::UnknownGrid(id.to_string()))?
        };
        let now = unix_now();
        if !grid.upload_due(now) {
            debug!(grid = id, "upload throttled");
            return Ok(UploadOutcome::Throttled);
        }

        let file = Layout::grid_file(id)?;
        self.layout.write_atomic(&file, bytes)?;

        let leaf = {
            let mut conn = self.db.lock();
            let tx = conn.transaction()?;
            // re-read: a merge may have moved the fragment meanwhile
            let mut grid =
                grids::get(&tx, id)?.ok_or_else(|| EngineError::UnknownGrid(id.to_string()))?;
            grid.next_update = now + self.config.reupload_interval_secs;
            grids::upsert(&tx, &grid)?;
            let leaf = TileData {
                map: grid.map,
                coord: grid.coord,
                zoom: 0,
                file,
                cache: self.clock.next(),
            };
            tiles::upsert(&tx, &leaf)?;
            tx.commit()?;
            leaf
        };
        info!(grid = id, map = leaf.map, coord = %leaf.coord, "grid stored");
        self.publish_saved(std::slice::from_ref(&leaf));
        self.rebuild_ancestors([(leaf.map, leaf.coord)])?;
        Ok(UploadOutcome::Stored {
            map: leaf.map,
            coord: leaf.coord,
        })
    }
}
