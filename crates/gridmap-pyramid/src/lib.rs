//! # gridmap-pyramid
//!
//! Building blocks of the zoom pyramid that do not touch the database:
//!
//! - [`compose`]: render one ancestor tile from its four children
//! - [`plan`]: level-by-level, deduplicated set of ancestors to rebuild
//! - [`layout`]: where encoded tiles live under the storage root

pub mod compose;
pub mod layout;
pub mod plan;

pub use compose::{compose, decode, encode_png};
pub use layout::Layout;
pub use plan::RebuildPlan;

/// Pyramid error types.
#[derive(Debug, thiserror::Error)]
pub enum PyramidError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid grid id: {0:?}")]
    InvalidGridId(String),
}

pub type Result<T> = std::result::Result<T, PyramidError>;
