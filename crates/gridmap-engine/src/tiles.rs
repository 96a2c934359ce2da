//! Tile store: persisted tile records plus change notification.

use std::path::PathBuf;

use gridmap_db::queries::{maps, tiles};
use gridmap_types::{CacheVersion, Coord, MapId, TileCache, TileData};
use tracing::debug;

use crate::{check_coord, EngineError, MapEngine, Result};

impl MapEngine {
    /// Fetch one tile record. `None` means never computed.
    pub fn get_tile(&self, map: MapId, coord: Coord, zoom: u8) -> Result<Option<TileData>> {
        let conn = self.db.lock();
        Ok(tiles::get(&conn, map, zoom, coord)?)
    }

    /// Upsert a tile record, then notify subscribers before returning.
    ///
    /// An empty `file` records a known-blank tile. `cache` must be
    /// non-negative and newer than the version already stored for the tile.
    pub fn save_tile(
        &self,
        map: MapId,
        coord: Coord,
        zoom: u8,
        file: &str,
        cache: CacheVersion,
    ) -> Result<TileData> {
        check_coord(coord)?;
        if cache < 0 {
            return Err(EngineError::StaleCacheVersion(cache));
        }
        let tile = TileData {
            map,
            coord,
            zoom,
            file: file.to_string(),
            cache,
        };
        {
            let conn = self.db.lock();
            if maps::get(&conn, map)?.is_none() {
                return Err(EngineError::UnknownMap(map));
            }
            if let Some(stored) = tiles::get(&conn, map, zoom, coord)? {
                if cache <= stored.cache {
                    return Err(EngineError::StaleCacheVersion(cache));
                }
            }
            tiles::upsert(&conn, &tile)?;
        }
        self.clock.observe(cache);
        debug!(map, zoom, coord = %coord, cache, "tile saved");
        self.updates.publish_tile(&TileCache::from(&tile));
        Ok(tile)
    }

    /// Save with a freshly minted cache-version.
    pub fn save_tile_now(&self, map: MapId, coord: Coord, zoom: u8, file: &str) -> Result<TileData> {
        let cache = self.clock.next();
        self.save_tile(map, coord, zoom, file, cache)
    }

    /// Version table of every known tile, for seeding a new viewer.
    pub fn tile_snapshot(&self) -> Result<Vec<TileCache>> {
        let conn = self.db.lock();
        Ok(tiles::list_all(&conn)?
            .iter()
            .map(TileCache::from)
            .collect())
    }

    /// Absolute path of a tile's encoded image, if it has one.
    pub fn tile_path(&self, map: MapId, coord: Coord, zoom: u8) -> Result<Option<PathBuf>> {
        Ok(self
            .get_tile(map, coord, zoom)?
            .filter(|t| !t.is_hole())
            .map(|t| self.layout.resolve(&t.file)))
    }

    pub(crate) fn publish_saved(&self, saved: &[TileData]) {
        for tile in saved {
            self.updates.publish_tile(&TileCache::from(tile));
        }
    }
}
