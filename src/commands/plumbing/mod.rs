//! Plumbing commands (low-level Git operations)
//!
//! Plumbing commands provide direct access to the object database and refs.
//! They're primarily used for scripting and for checking this store against
//! a real git repository.
//!
//! ## Commands
//!
//! - `cat-file`: Print an object's content, type, size or existence
//! - `hash-object`: Compute object ID and optionally store in database
//! - `rev-parse`: Resolve a revision to an object ID
//! - `update-ref`: Point a ref at an object
//! - `show-ref`: List refs and the objects they point at
//! - `show-index`: List the objects recorded in pack indexes

pub mod cat_file;
pub mod hash_object;
pub mod rev_parse;
pub mod show_index;
pub mod show_ref;
pub mod update_ref;
