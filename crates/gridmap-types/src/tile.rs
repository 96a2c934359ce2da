//! Rendered pyramid tile records.

use serde::{Deserialize, Serialize};

use crate::{CacheVersion, Coord, MapId};

/// One rendered tile at some zoom level.
///
/// An empty `file` marks a tile that was computed and is known to be blank,
/// which is different from a tile that has never been computed (no record).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileData {
    pub map: MapId,
    pub coord: Coord,
    /// 0 is native resolution; each level above halves it.
    pub zoom: u8,
    /// Path of the encoded image, relative to the tile storage root.
    pub file: String,
    pub cache: CacheVersion,
}

impl TileData {
    pub fn is_hole(&self) -> bool {
        self.file.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hole() {
        let mut td = TileData {
            map: 1,
            coord: Coord::new(1, 2),
            zoom: 0,
            file: String::new(),
            cache: 5,
        };
        assert!(td.is_hole());
        td.file = "grids/abc.png".to_string();
        assert!(!td.is_hole());
    }
}
