//! A Git-compatible object database
//!
//! Reads and writes loose objects, reads objects out of pack files (resolving
//! offset and reference deltas), and reads and updates refs, all through the
//! [`Database`](areas::database::Database) facade.

pub mod areas;
pub mod artifacts;
pub mod commands;
pub mod config;
pub mod errors;
