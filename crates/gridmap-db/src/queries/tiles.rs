//! Tile query functions.
//!
//! Rows are keyed by `(map_id, zoom, coord)` where `coord` is the
//! [`Coord::name`] key; `x`/`y` are stored alongside for range scans.

use gridmap_types::{CacheVersion, Coord, MapId, TileData};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::Result;

const COLUMNS: &str = "map_id, zoom, x, y, file, cache";

fn from_row(row: &Row<'_>) -> rusqlite::Result<TileData> {
    Ok(TileData {
        map: row.get(0)?,
        zoom: row.get(1)?,
        coord: Coord::new(row.get(2)?, row.get(3)?),
        file: row.get(4)?,
        cache: row.get(5)?,
    })
}

/// Fetch one tile record.
pub fn get(conn: &Connection, map: MapId, zoom: u8, coord: Coord) -> Result<Option<TileData>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM tiles WHERE map_id = ?1 AND zoom = ?2 AND coord = ?3"),
            rusqlite::params![map, zoom, coord.name()],
            from_row,
        )
        .optional()?)
}

/// Insert or overwrite a tile record.
pub fn upsert(conn: &Connection, tile: &TileData) -> Result<()> {
    conn.execute(
        "INSERT INTO tiles (map_id, zoom, coord, x, y, file, cache)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(map_id, zoom, coord) DO UPDATE SET
            file = excluded.file,
            cache = excluded.cache",
        rusqlite::params![
            tile.map,
            tile.zoom,
            tile.coord.name(),
            tile.coord.x,
            tile.coord.y,
            tile.file,
            tile.cache,
        ],
    )?;
    Ok(())
}

/// Every tile of one map at one zoom level.
pub fn list_level(conn: &Connection, map: MapId, zoom: u8) -> Result<Vec<TileData>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM tiles WHERE map_id = ?1 AND zoom = ?2 ORDER BY x, y"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![map, zoom], from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every tile of every map at one zoom level.
pub fn list_zoom(conn: &Connection, zoom: u8) -> Result<Vec<TileData>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM tiles WHERE zoom = ?1 ORDER BY map_id, x, y"
    ))?;
    let rows = stmt
        .query_map([zoom], from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every tile record.
pub fn list_all(conn: &Connection) -> Result<Vec<TileData>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM tiles ORDER BY map_id, zoom, x, y"
    ))?;
    let rows = stmt
        .query_map([], from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Highest cache-version stored, if any tile exists.
pub fn max_cache(conn: &Connection) -> Result<Option<CacheVersion>> {
    Ok(conn.query_row("SELECT MAX(cache) FROM tiles", [], |row| row.get(0))?)
}

/// Drop every tile record of one map.
pub fn delete_map(conn: &Connection, map: MapId) -> Result<usize> {
    Ok(conn.execute("DELETE FROM tiles WHERE map_id = ?1", [map])?)
}

/// Delete every tile record.
pub fn delete_all(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM tiles", [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::maps;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    fn tile(map: MapId, zoom: u8, x: i32, y: i32, file: &str, cache: i64) -> TileData {
        TileData {
            map,
            coord: Coord::new(x, y),
            zoom,
            file: file.to_string(),
            cache,
        }
    }

    #[test]
    fn test_absent_vs_hole() {
        let conn = test_db();
        let m = maps::create(&conn, false).expect("map");
        assert_eq!(get(&conn, m.id, 0, Coord::ORIGIN).expect("get"), None);

        upsert(&conn, &tile(m.id, 0, 0, 0, "", 1)).expect("hole");
        let hole = get(&conn, m.id, 0, Coord::ORIGIN)
            .expect("get")
            .expect("present");
        assert!(hole.is_hole());
    }

    #[test]
    fn test_upsert_overwrites() {
        let conn = test_db();
        let m = maps::create(&conn, false).expect("map");
        upsert(&conn, &tile(m.id, 1, -1, -1, "1/1/-1_-1.png", 10)).expect("insert");
        upsert(&conn, &tile(m.id, 1, -1, -1, "1/1/-1_-1.png", 11)).expect("overwrite");
        let all = list_all(&conn).expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].cache, 11);
        assert_eq!(all[0].coord, Coord::new(-1, -1));
    }

    #[test]
    fn test_levels_are_separate() {
        let conn = test_db();
        let m = maps::create(&conn, false).expect("map");
        upsert(&conn, &tile(m.id, 0, 0, 0, "grids/a.png", 1)).expect("insert");
        upsert(&conn, &tile(m.id, 1, 0, 0, "1/1/0_0.png", 2)).expect("insert");
        assert_eq!(list_level(&conn, m.id, 0).expect("list").len(), 1);
        assert_eq!(list_zoom(&conn, 1).expect("list").len(), 1);
    }

    #[test]
    fn test_max_cache() {
        let conn = test_db();
        assert_eq!(max_cache(&conn).expect("empty"), None);
        let m = maps::create(&conn, false).expect("map");
        upsert(&conn, &tile(m.id, 0, 0, 0, "grids/a.png", 7)).expect("insert");
        upsert(&conn, &tile(m.id, 1, 0, 0, "1/1/0_0.png", 3)).expect("insert");
        assert_eq!(max_cache(&conn).expect("max"), Some(7));
    }

    #[test]
    fn test_tiles_cascade_with_map() {
        let conn = test_db();
        let m = maps::create(&conn, false).expect("map");
        upsert(&conn, &tile(m.id, 0, 0, 0, "grids/a.png", 1)).expect("insert");
        maps::delete(&conn, m.id).expect("delete map");
        assert!(list_all(&conn).expect("list").is_empty());
    }
}
