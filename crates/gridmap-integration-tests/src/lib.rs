//! Integration test crate for the gridmap workspace.
//!
//! This crate has no library code; it only contains scenario tests that
//! drive the engine end to end against a real database file and tile
//! directory.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p gridmap-integration-tests
//! ```
