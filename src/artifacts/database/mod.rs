//! Database entry types
//!
//! Database entries represent references to objects with their mode/type information,
//! as listed by tree objects.

pub mod database_entry;
