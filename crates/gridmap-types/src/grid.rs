//! Fragment and map records.

use serde::{Deserialize, Serialize};

use crate::{Coord, MapId};

/// One persisted fragment ("grid").
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridData {
    /// Opaque client-supplied fragment id.
    pub id: String,
    /// Owning map.
    pub map: MapId,
    /// Position inside the owning map.
    pub coord: Coord,
    /// Unix seconds after which the client may upload the image again.
    pub next_update: u64,
}

impl GridData {
    /// Whether an upload received at `now` (Unix seconds) should be accepted.
    pub fn upload_due(&self, now: u64) -> bool {
        now > self.next_update
    }
}

/// One logical map.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapInfo {
    pub id: MapId,
    pub name: String,
    pub hidden: bool,
    /// A priority map survives every merge against a non-priority map.
    pub priority: bool,
}

impl MapInfo {
    /// A freshly allocated map named after its id.
    pub fn new(id: MapId, hidden: bool) -> Self {
        Self {
            id,
            name: id.to_string(),
            hidden,
            priority: false,
        }
    }
}
