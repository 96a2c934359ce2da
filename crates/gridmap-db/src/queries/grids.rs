//! Fragment query functions.

use gridmap_types::{Coord, GridData, MapId};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::Result;

const COLUMNS: &str = "id, map_id, x, y, next_update";

fn from_row(row: &Row<'_>) -> rusqlite::Result<GridData> {
    Ok(GridData {
        id: row.get(0)?,
        map: row.get(1)?,
        coord: Coord::new(row.get(2)?, row.get(3)?),
        next_update: row.get::<_, i64>(4)?.max(0) as u64,
    })
}

/// Fetch a fragment by id.
pub fn get(conn: &Connection, id: &str) -> Result<Option<GridData>> {
    Ok(conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM grids WHERE id = ?1"),
            [id],
            from_row,
        )
        .optional()?)
}

/// Insert or replace a fragment record.
pub fn upsert(conn: &Connection, grid: &GridData) -> Result<()> {
    conn.execute(
        "INSERT INTO grids (id, map_id, x, y, next_update) VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            map_id = excluded.map_id,
            x = excluded.x,
            y = excluded.y,
            next_update = excluded.next_update",
        rusqlite::params![
            grid.id,
            grid.map,
            grid.coord.x,
            grid.coord.y,
            grid.next_update as i64,
        ],
    )?;
    Ok(())
}

/// Fragment occupying `coord` in `map`, if any.
///
/// When several fragments share a cell the earliest inserted one wins.
pub fn find_at(conn: &Connection, map: MapId, coord: Coord) -> Result<Option<GridData>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {COLUMNS} FROM grids WHERE map_id = ?1 AND x = ?2 AND y = ?3
                 ORDER BY rowid LIMIT 1"
            ),
            rusqlite::params![map, coord.x, coord.y],
            from_row,
        )
        .optional()?)
}

/// All fragments of one map, in insertion order.
pub fn list_by_map(conn: &Connection, map: MapId) -> Result<Vec<GridData>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM grids WHERE map_id = ?1 ORDER BY rowid"
    ))?;
    let rows = stmt
        .query_map([map], from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Delete one fragment.
pub fn delete(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM grids WHERE id = ?1", [id])?;
    Ok(())
}

/// Delete every fragment at `coord` in `map`. Returns the number removed.
pub fn delete_at(conn: &Connection, map: MapId, coord: Coord) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM grids WHERE map_id = ?1 AND x = ?2 AND y = ?3",
        rusqlite::params![map, coord.x, coord.y],
    )?)
}

/// Delete every fragment.
pub fn delete_all(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM grids", [])?;
    Ok(())
}
