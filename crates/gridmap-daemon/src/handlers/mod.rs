//! Route handlers, grouped by caller.

pub mod admin;
pub mod client;
pub mod map;
