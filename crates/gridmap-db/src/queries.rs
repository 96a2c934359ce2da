//! Database query functions organized by table.

pub mod grids;
pub mod maps;
pub mod settings;
pub mod tiles;
