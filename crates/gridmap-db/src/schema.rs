//! SQL schema definitions.

/// Complete schema for the v1 database.
pub const SCHEMA_V1: &str = r#"
-- Logical maps. AUTOINCREMENT keeps retired (merged away) ids from being
-- handed out again.
CREATE TABLE IF NOT EXISTS maps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    hidden INTEGER NOT NULL DEFAULT 0,
    priority INTEGER NOT NULL DEFAULT 0
);

-- Every fragment ever seen, keyed by its client-supplied id.
CREATE TABLE IF NOT EXISTS grids (
    id TEXT PRIMARY KEY,
    map_id INTEGER NOT NULL REFERENCES maps(id),
    x INTEGER NOT NULL,
    y INTEGER NOT NULL,
    next_update INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_grids_map_coord ON grids(map_id, x, y);

-- Rendered tiles, one row per (map, zoom, coordinate key).
CREATE TABLE IF NOT EXISTS tiles (
    map_id INTEGER NOT NULL REFERENCES maps(id) ON DELETE CASCADE,
    zoom INTEGER NOT NULL,
    coord TEXT NOT NULL,
    x INTEGER NOT NULL,
    y INTEGER NOT NULL,
    file TEXT NOT NULL,
    cache INTEGER NOT NULL,
    PRIMARY KEY (map_id, zoom, coord)
);

CREATE INDEX IF NOT EXISTS idx_tiles_zoom ON tiles(zoom);

CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;
