//! Git data structures and formats
//!
//! - `database`: Tree entry types
//! - `objects`: Git object types (blob, tree, commit, tag) and framing
//! - `pack`: Pack index, pack entry headers and delta instructions
//! - `refs`: Reference names, the packed-refs file and revision expressions

pub mod database;
pub mod objects;
pub mod pack;
pub mod refs;
