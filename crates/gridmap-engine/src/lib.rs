//! # gridmap-engine
//!
//! The map engine: tile store, zoom pyramid builder, grid registry, map
//! merge resolver and update broadcaster, behind one [`MapEngine`] handle.
//!
//! All database work goes through a single connection guarded by a mutex,
//! so registration batches (and the merges they trigger) are serialized.
//! Pyramid rebuilds take the lock once per tile read or write and may
//! interleave with uploads; each tile write is atomic on its own.
//!
//! Every call is blocking. Async callers run them on a blocking pool.

pub mod admin;
pub mod broadcast;
pub mod clock;
pub mod merge;
pub mod pyramid;
pub mod registry;
pub mod tiles;
pub mod upload;

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use gridmap_db::DbError;
use gridmap_pyramid::{Layout, PyramidError};
use gridmap_types::{CacheVersion, Coord, MapId};
use parking_lot::Mutex;
use rusqlite::Connection;

pub use admin::MapPatch;
pub use broadcast::{Broadcaster, Subscription, TileBatch, Topic};
pub use clock::CacheClock;
pub use registry::{BatchRequest, GridRequest};
pub use upload::UploadOutcome;

/// Engine error types.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("pyramid error: {0}")]
    Pyramid(#[from] PyramidError),

    #[error("unknown grid: {0}")]
    UnknownGrid(String),

    #[error("unknown map: {0}")]
    UnknownMap(MapId),

    #[error("empty batch")]
    EmptyBatch,

    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    #[error("invalid zoom level: {0}")]
    InvalidZoom(u8),

    #[error("coordinate out of range: {0}")]
    CoordOutOfRange(Coord),

    #[error("cache version {0} is negative or not newer than the stored one")]
    StaleCacheVersion(CacheVersion),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Db(DbError::Sqlite(e))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Engine tunables.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Highest pyramid level.
    pub max_zoom: u8,
    /// Pixel edge of every tile.
    pub tile_size: u32,
    /// Seconds before a stored fragment is requested again.
    pub reupload_interval_secs: u64,
    /// Whether new maps start hidden until an administrator says otherwise.
    pub default_hidden: bool,
    /// Per-subscriber queue length for tile events.
    pub tile_queue_capacity: usize,
    /// Per-subscriber queue length for merge events.
    pub merge_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_zoom: gridmap_types::DEFAULT_MAX_ZOOM,
            tile_size: gridmap_types::DEFAULT_TILE_SIZE,
            reupload_interval_secs: gridmap_types::DEFAULT_REUPLOAD_INTERVAL_SECS,
            default_hidden: false,
            tile_queue_capacity: 1000,
            merge_queue_capacity: 5,
        }
    }
}

/// Shared handle to the map state.
pub struct MapEngine {
    db: Mutex<Connection>,
    layout: Layout,
    clock: CacheClock,
    updates: Broadcaster,
    config: EngineConfig,
}

impl MapEngine {
    pub fn new(conn: Connection, layout: Layout, config: EngineConfig) -> Self {
        let updates = Broadcaster::new(config.tile_queue_capacity, config.merge_queue_capacity);
        Self {
            db: Mutex::new(conn),
            layout,
            clock: CacheClock::new(),
            updates,
            config,
        }
    }

    /// Open the database at `data_dir/grids.db` with tiles under
    /// `data_dir/tiles`.
    ///
    /// Minted cache-versions continue above the highest one stored.
    pub fn open(data_dir: &Path, config: EngineConfig) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let conn = gridmap_db::open(&data_dir.join("grids.db"))?;
        let newest = gridmap_db::queries::tiles::max_cache(&conn)?;
        let engine = Self::new(conn, Layout::new(data_dir.join("tiles")), config);
        if let Some(newest) = newest {
            engine.clock.observe(newest);
        }
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn updates(&self) -> &Broadcaster {
        &self.updates
    }

    /// Register a new viewer session.
    ///
    /// Subscribe before taking [`MapEngine::tile_snapshot`] so no write
    /// falls between the two.
    pub fn subscribe(&self) -> Subscription {
        self.updates.subscribe()
    }
}

pub(crate) fn check_coord(coord: Coord) -> Result<Coord> {
    if coord.in_range() {
        Ok(coord)
    } else {
        Err(EngineError::CoordOutOfRange(coord))
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use image::{Rgba, RgbaImage};

    pub fn engine() -> (MapEngine, tempfile::TempDir) {
        engine_with(EngineConfig::default())
    }

    pub fn engine_with(config: EngineConfig) -> (MapEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = gridmap_db::open_memory().expect("open db");
        let engine = MapEngine::new(conn, Layout::new(dir.path()), config);
        (engine, dir)
    }

    pub fn solid_png(px: [u8; 4]) -> Vec<u8> {
        gridmap_pyramid::encode_png(&RgbaImage::from_pixel(100, 100, Rgba(px))).expect("encode")
    }

    /// 3×3 batch of ids `{prefix}{i}{j}`.
    pub fn batch3(prefix: &str) -> Vec<Vec<String>> {
        (0..3)
            .map(|i| (0..3).map(|j| format!("{prefix}{i}{j}")).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = MapEngine::open(dir.path(), EngineConfig::default()).expect("open");
        assert!(dir.path().join("grids.db").exists());
        assert_eq!(engine.layout().root(), dir.path().join("tiles"));
        assert_eq!(engine.config().max_zoom, 5);
    }

    #[test]
    fn test_reopen_mints_above_stored_versions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let far = i64::MAX / 2;
        let map = {
            let engine = MapEngine::open(dir.path(), EngineConfig::default()).expect("open");
            let map = gridmap_db::queries::maps::create(&engine.db.lock(), false)
                .expect("map")
                .id;
            engine
                .save_tile(map, Coord::ORIGIN, 0, "grids/a.png", far)
                .expect("save");
            map
        };
        let engine = MapEngine::open(dir.path(), EngineConfig::default()).expect("reopen");
        let next = engine
            .save_tile_now(map, Coord::ORIGIN, 0, "grids/a.png")
            .expect("save after reopen");
        assert!(next.cache > far);
    }
}
