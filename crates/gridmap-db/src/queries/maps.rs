//! Map query functions.

use gridmap_types::{MapId, MapInfo};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::{DbError, Result};

fn from_row(row: &Row<'_>) -> rusqlite::Result<MapInfo> {
    Ok(MapInfo {
        id: row.get(0)?,
        name: row.get(1)?,
        hidden: row.get(2)?,
        priority: row.get(3)?,
    })
}

/// Allocate the next map id and persist a new map named after it.
pub fn create(conn: &Connection, hidden: bool) -> Result<MapInfo> {
    conn.execute(
        "INSERT INTO maps (name, hidden, priority) VALUES ('', ?1, 0)",
        [hidden],
    )?;
    let info = MapInfo::new(conn.last_insert_rowid(), hidden);
    conn.execute(
        "UPDATE maps SET name = ?1 WHERE id = ?2",
        rusqlite::params![info.name, info.id],
    )?;
    Ok(info)
}

/// Fetch one map.
pub fn get(conn: &Connection, id: MapId) -> Result<Option<MapInfo>> {
    Ok(conn
        .query_row(
            "SELECT id, name, hidden, priority FROM maps WHERE id = ?1",
            [id],
            from_row,
        )
        .optional()?)
}

/// List all maps ordered by id.
pub fn list(conn: &Connection) -> Result<Vec<MapInfo>> {
    let mut stmt = conn.prepare("SELECT id, name, hidden, priority FROM maps ORDER BY id")?;
    let rows = stmt
        .query_map([], from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Update the mutable attributes of a map.
pub fn update(conn: &Connection, info: &MapInfo) -> Result<()> {
    let changed = conn.execute(
        "UPDATE maps SET name = ?1, hidden = ?2, priority = ?3 WHERE id = ?4",
        rusqlite::params![info.name, info.hidden, info.priority, info.id],
    )?;
    if changed == 0 {
        return Err(DbError::NotFound(format!("map {}", info.id)));
    }
    Ok(())
}

/// Retire a map. Fails while any grid still references it.
pub fn delete(conn: &Connection, id: MapId) -> Result<()> {
    conn.execute("DELETE FROM maps WHERE id = ?1", [id])?;
    Ok(())
}

/// Delete every map.
pub fn delete_all(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM maps", [])?;
    Ok(())
}
