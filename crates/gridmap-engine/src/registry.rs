//! Grid registry: assigns map ids and coordinates to viewport batches.
//!
//! A batch is a 2-D array of fragment ids indexed `grids[lx][ly]`; the cell
//! at `anchor` is the client's reference fragment.

use std::collections::{BTreeMap, HashSet};

use gridmap_db::queries::{grids, maps, settings};
use gridmap_pyramid::layout::valid_grid_id;
use gridmap_types::{Coord, GridData, MapId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{check_coord, merge, unix_now, EngineError, MapEngine, Result};

/// Longest accepted batch row or column.
pub const MAX_BATCH_SIDE: usize = 1024;

/// One registration request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchRequest {
    pub grids: Vec<Vec<String>>,
    /// `[lx, ly]` of the reference cell; the center cell when absent.
    #[serde(default)]
    pub anchor: Option<[usize; 2]>,
}

/// Registration answer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRequest {
    /// Fragments whose image the client should upload.
    pub grid_requests: Vec<String>,
    /// Same shape as the request: whether each cell should be uploaded.
    pub needs_fetch: Vec<Vec<bool>>,
    pub map: MapId,
    /// Coordinate of the anchor fragment.
    pub coords: Coord,
}

impl BatchRequest {
    pub fn new(grids: Vec<Vec<String>>) -> Self {
        Self { grids, anchor: None }
    }

    fn cells(&self) -> impl Iterator<Item = (Coord, &str)> {
        self.grids.iter().enumerate().flat_map(|(lx, row)| {
            row.iter()
                .enumerate()
                .map(move |(ly, id)| (Coord::new(lx as i32, ly as i32), id.as_str()))
        })
    }

    /// Check the batch shape and ids, returning the anchor's local position.
    fn validate(&self) -> Result<Coord> {
        if self.grids.iter().all(Vec::is_empty) {
            return Err(EngineError::EmptyBatch);
        }
        if self.grids.len() > MAX_BATCH_SIDE
            || self.grids.iter().any(|row| row.len() > MAX_BATCH_SIDE)
        {
            return Err(EngineError::InvalidBatch(format!(
                "batch wider than {MAX_BATCH_SIDE} cells"
            )));
        }
        let mut seen = HashSet::new();
        for (_, id) in self.cells() {
            if !valid_grid_id(id) {
                return Err(EngineError::InvalidBatch(format!("bad grid id {id:?}")));
            }
            if !seen.insert(id) {
                return Err(EngineError::InvalidBatch(format!("duplicate grid id {id:?}")));
            }
        }
        let [ax, ay] = match self.anchor {
            Some(anchor) => anchor,
            None => {
                let mid = self.grids.len() / 2;
                [mid, self.grids[mid].len() / 2]
            }
        };
        if self.grids.get(ax).and_then(|row| row.get(ay)).is_none() {
            return Err(EngineError::InvalidBatch(format!(
                "anchor [{ax}, {ay}] outside batch"
            )));
        }
        Ok(Coord::new(ax as i32, ay as i32))
    }
}

impl MapEngine {
    /// Resolve a viewport batch to a map, registering unknown fragments and
    /// merging every map the batch proves to overlap.
    pub fn register_batch(&self, batch: &BatchRequest) -> Result<GridRequest> {
        let anchor = batch.validate()?;
        let now = unix_now();

        let mut conn = self.db.lock();
        let tx = conn.transaction()?;

        let mut offsets: BTreeMap<MapId, Coord> = BTreeMap::new();
        for (local, id) in batch.cells() {
            let Some(grid) = grids::get(&tx, id)? else {
                continue;
            };
            let offset = grid.coord.minus(local);
            match offsets.get(&grid.map) {
                None => {
                    offsets.insert(grid.map, offset);
                }
                Some(&seen) if seen != offset => {
                    warn!(map = grid.map, grid = id, %seen, %offset, "inconsistent offset in batch");
                }
                Some(_) => {}
            }
        }

        let mut merged = None;
        let (map, offset, fresh) = match offsets.len() {
            0 => {
                let hidden =
                    settings::get_bool(&tx, settings::DEFAULT_HIDDEN, self.config.default_hidden)?;
                let info = maps::create(&tx, hidden)?;
                info!(map = info.id, hidden, "new map");
                (info.id, Coord::ORIGIN.minus(anchor), true)
            }
            1 => {
                let (&map, &offset) = offsets.iter().next().ok_or(EngineError::EmptyBatch)?;
                (map, offset, false)
            }
            _ => {
                let outcome = merge::resolve(&tx, &offsets, &self.clock)?;
                let picked = (outcome.survivor, outcome.survivor_offset, false);
                merged = Some(outcome);
                picked
            }
        };

        let dropped: HashSet<&str> = merged
            .iter()
            .flat_map(|outcome| outcome.dropped.iter().map(String::as_str))
            .collect();
        let mut response = GridRequest {
            grid_requests: Vec::new(),
            needs_fetch: batch.grids.iter().map(|row| vec![false; row.len()]).collect(),
            map,
            coords: anchor.shifted(offset),
        };
        for (local, id) in batch.cells() {
            let needs = match grids::get(&tx, id)? {
                // lost its cell to a survivor fragment during this merge
                None if dropped.contains(id) => {
                    debug!(grid = id, "not re-registering dropped fragment");
                    false
                }
                Some(grid) if !fresh => {
                    if local == anchor {
                        response.map = grid.map;
                        response.coords = grid.coord;
                    }
                    grid.upload_due(now)
                }
                _ => {
                    grids::upsert(
                        &tx,
                        &GridData {
                            id: id.to_string(),
                            map,
                            coord: check_coord(local.shifted(offset))?,
                            next_update: 0,
                        },
                    )?;
                    true
                }
            };
            if needs {
                response.grid_requests.push(id.to_string());
            }
            response.needs_fetch[local.x as usize][local.y as usize] = needs;
        }

        tx.commit()?;
        drop(conn);

        if let Some(outcome) = merged {
            self.publish_saved(&outcome.saved);
            for event in &outcome.events {
                self.updates.publish_merge(event);
            }
            for &retired in &outcome.retired {
                if let Err(e) = self.layout.remove_map(retired) {
                    warn!(map = retired, "could not remove pyramid of merged map: {e}");
                }
            }
            self.rebuild_ancestors(outcome.saved.iter().map(|t| (t.map, t.coord)))?;
        }
        Ok(response)
    }

    /// Map and coordinate of a known fragment.
    pub fn locate(&self, id: &str) -> Result<(MapId, Coord)> {
        let conn = self.db.lock();
        let grid = grids::get(&conn, id)?.ok_or_else(|| EngineError::UnknownGrid(id.to_string()))?;
        Ok((grid.map, grid.coord))
    }
}
