//! Core object store components
//!
//! - `storage`: Byte-level access to the git directory, on disk or in memory
//! - `loose`: Zlib-compressed single-object files under `objects/`
//! - `pack_cache`: Parsed pack indexes shared across loads
//! - `packs`: Object lookup and delta resolution inside pack files
//! - `refs`: Reference management (loose refs, packed-refs, HEAD)
//! - `database`: The object database facade over all of the above
//! - `repository`: Command context (database, configuration, output)

pub mod database;
pub mod loose;
pub mod pack_cache;
pub mod packs;
pub mod refs;
pub mod repository;
pub mod storage;
