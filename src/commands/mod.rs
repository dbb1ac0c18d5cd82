//! Command implementations
//!
//! Commands are organized into two categories following Git's architecture:
//!
//! - `plumbing`: Low-level commands over objects and refs (cat-file, hash-object, ...)
//! - `porcelain`: User-facing commands (init)
//!
//! Each command is an `impl Repository` block writing to the repository's writer.

pub mod plumbing;
pub mod porcelain;
