//! Map merge resolver.
//!
//! A batch that sees fragments from several maps proves those maps overlap.
//! Each map's offset is `absolute − local` for one of its fragments in the
//! batch, so a loser coordinate `c` lands at `c + (survivorOffset −
//! loserOffset)` in the survivor.

use std::collections::BTreeMap;

use gridmap_db::queries::{grids, maps, tiles};
use gridmap_types::{Coord, MapId, MapInfo, MergeEvent, TileData};
use rusqlite::Connection;
use tracing::{debug, info};

use crate::{check_coord, CacheClock, EngineError, Result};

/// Everything a merge changed, for the caller to publish after commit.
#[derive(Debug, Default)]
pub struct MergeOutcome {
    pub survivor: MapId,
    pub survivor_offset: Coord,
    pub events: Vec<MergeEvent>,
    /// Zoom-0 tiles re-saved under the survivor.
    pub saved: Vec<TileData>,
    pub retired: Vec<MapId>,
    /// Loser fragments discarded because their target cell was taken.
    pub dropped: Vec<String>,
}

/// Pick the surviving map: priority maps first, then the lowest id.
pub fn select_survivor(candidates: &[(MapInfo, Coord)]) -> Option<(MapId, Coord)> {
    candidates
        .iter()
        .min_by_key(|(info, _)| (!info.priority, info.id))
        .map(|(info, offset)| (info.id, *offset))
}

/// Fold every map in `offsets` into the survivor inside the caller's
/// transaction.
pub fn resolve(
    conn: &Connection,
    offsets: &BTreeMap<MapId, Coord>,
    clock: &CacheClock,
) -> Result<MergeOutcome> {
    let mut candidates = Vec::with_capacity(offsets.len());
    for (&id, &offset) in offsets {
        let info = maps::get(conn, id)?.ok_or(EngineError::UnknownMap(id))?;
        candidates.push((info, offset));
    }
    let (survivor, survivor_offset) = select_survivor(&candidates)
        .ok_or_else(|| EngineError::InvalidBatch("no maps to merge".to_string()))?;

    let mut outcome = MergeOutcome {
        survivor,
        survivor_offset,
        ..MergeOutcome::default()
    };
    for (&loser, &loser_offset) in offsets {
        if loser == survivor {
            continue;
        }
        let shift = survivor_offset.minus(loser_offset);
        fold(conn, loser, survivor, shift, clock, &mut outcome)?;
        outcome.events.push(MergeEvent::new(loser, survivor, shift));
        outcome.retired.push(loser);
        info!(from = loser, to = survivor, shift = %shift, "maps merged");
    }
    Ok(outcome)
}

fn fold(
    conn: &Connection,
    loser: MapId,
    survivor: MapId,
    shift: Coord,
    clock: &CacheClock,
    outcome: &mut MergeOutcome,
) -> Result<()> {
    for mut grid in grids::list_by_map(conn, loser)? {
        let target = check_coord(grid.coord.shifted(shift))?;
        if grids::find_at(conn, survivor, target)?.is_some() {
            debug!(grid = %grid.id, coord = %target, "coordinate taken in survivor, dropping");
            grids::delete(conn, &grid.id)?;
            outcome.dropped.push(grid.id);
            continue;
        }
        let leaf = tiles::get(conn, loser, 0, grid.coord)?;
        grid.map = survivor;
        grid.coord = target;
        grids::upsert(conn, &grid)?;
        if let Some(leaf) = leaf {
            let moved = TileData {
                map: survivor,
                coord: target,
                zoom: 0,
                file: leaf.file,
                cache: clock.next(),
            };
            tiles::upsert(conn, &moved)?;
            outcome.saved.push(moved);
        }
    }
    tiles::delete_map(conn, loser)?;
    maps::delete(conn, loser)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridmap_types::GridData;

    fn info(id: MapId, priority: bool) -> MapInfo {
        MapInfo {
            priority,
            ..MapInfo::new(id, false)
        }
    }

    fn put_grid(conn: &Connection, id: &str, map: MapId, x: i32, y: i32, with_tile: bool) {
        let coord = Coord::new(x, y);
        grids::upsert(
            conn,
            &GridData {
                id: id.to_string(),
                map,
                coord,
                next_update: 0,
            },
        )
        .expect("grid");
        if with_tile {
            tiles::upsert(
                conn,
                &TileData {
                    map,
                    coord,
                    zoom: 0,
                    file: format!("grids/{id}.png"),
                    cache: 1,
                },
            )
            .expect("tile");
        }
    }

    #[test]
    fn test_lowest_id_survives() {
        let c = [(info(4, false), Coord::new(1, 0)), (info(2, false), Coord::ORIGIN)];
        assert_eq!(select_survivor(&c), Some((2, Coord::ORIGIN)));
    }

    #[test]
    fn test_priority_beats_lower_id() {
        let c = [(info(2, false), Coord::ORIGIN), (info(9, true), Coord::new(3, 3))];
        assert_eq!(select_survivor(&c), Some((9, Coord::new(3, 3))));
    }

    #[test]
    fn test_several_priority_maps_lowest_wins() {
        let c = [
            (info(7, true), Coord::ORIGIN),
            (info(1, false), Coord::ORIGIN),
            (info(5, true), Coord::ORIGIN),
        ];
        assert_eq!(select_survivor(&c).map(|(id, _)| id), Some(5));
        assert_eq!(select_survivor(&[]), None);
    }

    #[test]
    fn test_resolve_rekeys_grids_and_tiles() {
        let conn = gridmap_db::open_memory().expect("db");
        let a = maps::create(&conn, false).expect("map").id;
        let b = maps::create(&conn, false).expect("map").id;
        put_grid(&conn, "a1", a, 0, 0, true);
        put_grid(&conn, "a2", a, 1, 0, true);
        put_grid(&conn, "b1", b, 0, 0, true);
        put_grid(&conn, "b2", b, 1, 0, false);

        // batch saw a2 at local (0,0) and b1 at local (1,0)
        let offsets = BTreeMap::from([(a, Coord::new(1, 0)), (b, Coord::new(-1, 0))]);
        let clock = CacheClock::new();
        let out = resolve(&conn, &offsets, &clock).expect("merge");

        assert_eq!(out.survivor, a);
        assert_eq!(out.events, vec![MergeEvent::new(b, a, Coord::new(2, 0))]);
        assert_eq!(out.retired, vec![b]);

        let b1 = grids::get(&conn, "b1").expect("get").expect("b1");
        assert_eq!((b1.map, b1.coord), (a, Coord::new(2, 0)));
        let b2 = grids::get(&conn, "b2").expect("get").expect("b2");
        assert_eq!((b2.map, b2.coord), (a, Coord::new(3, 0)));

        assert_eq!(out.saved.len(), 1);
        let moved = tiles::get(&conn, a, 0, Coord::new(2, 0))
            .expect("get")
            .expect("moved tile");
        assert_eq!(moved.file, "grids/b1.png");
        assert!(moved.cache > 1);

        assert!(maps::get(&conn, b).expect("get").is_none());
        assert!(tiles::list_level(&conn, b, 0).expect("list").is_empty());
    }

    #[test]
    fn test_occupied_coordinate_keeps_existing_grid() {
        let conn = gridmap_db::open_memory().expect("db");
        let a = maps::create(&conn, false).expect("map").id;
        let b = maps::create(&conn, false).expect("map").id;
        put_grid(&conn, "a1", a, 0, 0, true);
        put_grid(&conn, "b1", b, 5, 5, true);
        put_grid(&conn, "b2", b, 6, 5, true);

        let offsets = BTreeMap::from([(a, Coord::ORIGIN), (b, Coord::new(6, 5))]);
        let out = resolve(&conn, &offsets, &CacheClock::new()).expect("merge");

        // b2 lands on a1's cell; a1 is kept untouched
        assert!(grids::get(&conn, "b2").expect("get").is_none());
        let a1 = tiles::get(&conn, a, 0, Coord::ORIGIN).expect("get").expect("a1");
        assert_eq!((a1.file.as_str(), a1.cache), ("grids/a1.png", 1));
        let b1 = grids::get(&conn, "b1").expect("get").expect("b1");
        assert_eq!(b1.coord, Coord::new(-1, 0));
        assert_eq!(out.saved.len(), 1);
        assert_eq!(out.dropped, vec!["b2".to_string()]);
    }

    #[test]
    fn test_three_way_merge_into_priority_map() {
        let conn = gridmap_db::open_memory().expect("db");
        let a = maps::create(&conn, false).expect("map").id;
        let b = maps::create(&conn, false).expect("map").id;
        let mut c = maps::create(&conn, false).expect("map");
        c.priority = true;
        maps::update(&conn, &c).expect("flag");
        put_grid(&conn, "a1", a, 0, 0, false);
        put_grid(&conn, "b1", b, 0, 0, false);
        put_grid(&conn, "c1", c.id, 0, 0, false);

        let offsets = BTreeMap::from([
            (a, Coord::new(0, 0)),
            (b, Coord::new(0, -1)),
            (c.id, Coord::new(10, 10)),
        ]);
        let out = resolve(&conn, &offsets, &CacheClock::new()).expect("merge");
        assert_eq!(out.survivor, c.id);
        assert_eq!(out.retired, vec![a, b]);
        assert_eq!(maps::list(&conn).expect("list").len(), 1);
        let b1 = grids::get(&conn, "b1").expect("get").expect("b1");
        assert_eq!(b1.coord, Coord::new(10, 11));
    }
}
