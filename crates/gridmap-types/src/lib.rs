//! # gridmap-types
//!
//! Shared domain types used across the gridmap workspace: the coordinate
//! algebra, persisted record shapes and the live-update wire events.

pub mod coord;
pub mod events;
pub mod grid;
pub mod tile;

pub use coord::Coord;
pub use events::{MergeEvent, TileCache};
pub use grid::{GridData, MapInfo};
pub use tile::TileData;

/// Identifier of one logical map.
pub type MapId = i64;

/// Monotonic stamp attached to every tile write.
pub type CacheVersion = i64;

/// Highest pyramid level built above the native fragments.
pub const DEFAULT_MAX_ZOOM: u8 = 5;

/// Edge length in pixels of every encoded tile.
pub const DEFAULT_TILE_SIZE: u32 = 100;

/// Minimum delay before an already uploaded fragment is requested again.
pub const DEFAULT_REUPLOAD_INTERVAL_SECS: u64 = 30 * 60;
