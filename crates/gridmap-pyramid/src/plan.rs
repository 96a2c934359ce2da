//! Breadth-first ancestor planning.
//!
//! Every write at level `z` dirties exactly one tile at `z + 1`. Collecting
//! each level into a set before moving up means an ancestor shared by many
//! writes is rebuilt once per pass.

use std::collections::BTreeSet;

use gridmap_types::{Coord, MapId};

/// Ancestors still to rebuild, one level at a time.
#[derive(Clone, Debug)]
pub struct RebuildPlan {
    next_zoom: u8,
    max_zoom: u8,
    pending: BTreeSet<(MapId, Coord)>,
}

impl RebuildPlan {
    /// Plan from a set of tiles written at `zoom`.
    pub fn from_level<I>(zoom: u8, max_zoom: u8, written: I) -> Self
    where
        I: IntoIterator<Item = (MapId, Coord)>,
    {
        RebuildPlan {
            next_zoom: zoom.saturating_add(1),
            max_zoom,
            pending: written.into_iter().map(|(m, c)| (m, c.parent())).collect(),
        }
    }

    /// Plan from zoom-0 leaves.
    pub fn from_leaves<I>(max_zoom: u8, leaves: I) -> Self
    where
        I: IntoIterator<Item = (MapId, Coord)>,
    {
        Self::from_level(0, max_zoom, leaves)
    }

    pub fn is_done(&self) -> bool {
        self.pending.is_empty() || self.next_zoom > self.max_zoom
    }

    /// Take the next level's deduplicated batch and queue its parents.
    pub fn next_level(&mut self) -> Option<(u8, Vec<(MapId, Coord)>)> {
        if self.is_done() {
            return None;
        }
        let zoom = self.next_zoom;
        let batch: Vec<_> = std::mem::take(&mut self.pending).into_iter().collect();
        self.pending = batch.iter().map(|&(m, c)| (m, c.parent())).collect();
        self.next_zoom += 1;
        Some((zoom, batch))
    }
}

impl Iterator for RebuildPlan {
    type Item = (u8, Vec<(MapId, Coord)>);

    fn next(&mut self) -> Option<Self::Item> {
        self.next_level()
    }
}
