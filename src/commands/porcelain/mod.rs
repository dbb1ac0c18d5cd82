//! Porcelain commands (user-facing Git operations)
//!
//! ## Commands
//!
//! - `init`: Create an empty repository the object store can read and write

pub mod init;
