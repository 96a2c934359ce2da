//! # gridmap-db
//!
//! Persistence layer for fragments, maps and pyramid tiles.
//! Manages the single SQLite database at `$GRIDMAP_DATA_DIR/grids.db`.
//!
//! ## Schema
//!
//! - WAL mode, foreign keys enforced
//! - `grids.map_id` must reference a live map, so a merge that forgets to
//!   re-key a fragment cannot commit
//! - `tiles` rows cascade away with their map
//! - Timestamps are Unix epoch seconds, cache-versions are nanoseconds
//! - Schema version stored in `PRAGMA user_version`
//!
//! Query functions take `&Connection`; a `rusqlite::Transaction` derefs to
//! one, so callers compose them into atomic multi-record updates.

pub mod migrations;
pub mod queries;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;

/// Current schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Database error types.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Open or create the database at the given path.
///
/// Configures WAL mode, foreign keys, and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}
