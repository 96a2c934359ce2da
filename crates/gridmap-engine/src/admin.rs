//! Administrative operations.

use gridmap_db::queries::{grids, maps, settings, tiles};
use gridmap_types::{Coord, MapId, MapInfo, TileData};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{check_coord, EngineError, MapEngine, Result};

/// Partial update of a map's attributes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MapPatch {
    pub name: Option<String>,
    pub hidden: Option<bool>,
    pub priority: Option<bool>,
}

impl MapEngine {
    /// Maps ordered by id, optionally leaving out hidden ones.
    pub fn list_maps(&self, include_hidden: bool) -> Result<Vec<MapInfo>> {
        let conn = self.db.lock();
        let mut all = maps::list(&conn)?;
        if !include_hidden {
            all.retain(|m| !m.hidden);
        }
        Ok(all)
    }

    pub fn update_map(&self, id: MapId, patch: &MapPatch) -> Result<MapInfo> {
        let conn = self.db.lock();
        let mut info = maps::get(&conn, id)?.ok_or(EngineError::UnknownMap(id))?;
        if let Some(name) = &patch.name {
            info.name.clone_from(name);
        }
        if let Some(hidden) = patch.hidden {
            info.hidden = hidden;
        }
        if let Some(priority) = patch.priority {
            info.priority = priority;
        }
        maps::update(&conn, &info)?;
        info!(map = id, hidden = info.hidden, priority = info.priority, "map updated");
        Ok(info)
    }

    /// Whether maps created from now on start hidden.
    pub fn default_hidden(&self) -> Result<bool> {
        let conn = self.db.lock();
        Ok(settings::get_bool(
            &conn,
            settings::DEFAULT_HIDDEN,
            self.config.default_hidden,
        )?)
    }

    pub fn set_default_hidden(&self, value: bool) -> Result<()> {
        let conn = self.db.lock();
        settings::set_bool(&conn, settings::DEFAULT_HIDDEN, value)?;
        Ok(())
    }

    /// Forget the fragment at `coord`, leave a blank leaf and refresh its
    /// ancestors.
    pub fn wipe_tile(&self, map: MapId, coord: Coord) -> Result<()> {
        check_coord(coord)?;
        let hole = {
            let mut conn = self.db.lock();
            let tx = conn.transaction()?;
            if maps::get(&tx, map)?.is_none() {
                return Err(EngineError::UnknownMap(map));
            }
            let removed = grids::delete_at(&tx, map, coord)?;
            let hole = TileData {
                map,
                coord,
                zoom: 0,
                file: String::new(),
                cache: self.clock.next(),
            };
            tiles::upsert(&tx, &hole)?;
            tx.commit()?;
            info!(map, coord = %coord, removed, "tile wiped");
            hole
        };
        self.publish_saved(std::slice::from_ref(&hole));
        self.rebuild_ancestors([(map, coord)])?;
        Ok(())
    }

    /// Delete every grid, tile and map, then the rendered pyramids.
    ///
    /// Connected viewers are disconnected so they reload an empty snapshot.
    pub fn wipe_all(&self) -> Result<()> {
        {
            let mut conn = self.db.lock();
            let tx = conn.transaction()?;
            grids::delete_all(&tx)?;
            tiles::delete_all(&tx)?;
            maps::delete_all(&tx)?;
            tx.commit()?;
        }
        self.layout.remove_all_pyramids()?;
        self.updates.close_all();
        info!("all map data wiped");
        Ok(())
    }
}
