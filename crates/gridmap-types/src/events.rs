//! Live-update wire shapes pushed to map viewers.

use serde::{Deserialize, Serialize};

use crate::{CacheVersion, Coord, MapId, TileData};

/// "Tile changed" notification, also used for the initial snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCache {
    #[serde(rename = "mapID")]
    pub map: MapId,
    pub x: i32,
    pub y: i32,
    pub zoom: u8,
    #[serde(rename = "cacheVersion")]
    pub cache: CacheVersion,
}

impl TileCache {
    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y)
    }
}

impl From<&TileData> for TileCache {
    fn from(td: &TileData) -> Self {
        Self {
            map: td.map,
            x: td.coord.x,
            y: td.coord.y,
            zoom: td.zoom,
            cache: td.cache,
        }
    }
}

/// "Map merged" notification: everything under `from` now lives under `to`,
/// translated by `(shift_x, shift_y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeEvent {
    pub from: MapId,
    pub to: MapId,
    pub shift_x: i32,
    pub shift_y: i32,
}

impl MergeEvent {
    pub fn new(from: MapId, to: MapId, shift: Coord) -> Self {
        Self {
            from,
            to,
            shift_x: shift.x,
            shift_y: shift.y,
        }
    }

    pub fn shift(&self) -> Coord {
        Coord::new(self.shift_x, self.shift_y)
    }
}
