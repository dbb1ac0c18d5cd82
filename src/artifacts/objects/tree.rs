//! Git tree object
//!
//! Trees represent directory snapshots in Git. They contain entries for files (blobs),
//! symlinks, submodules (gitlinks) and subdirectories (other trees), along with their
//! names and modes.
//!
//! ## Format
//!
//! On disk: `tree <size>\0<entries>`
//! Each entry: `<mode> <name>\0<20-byte-sha1>`
//!
//! Entries are kept in Git's canonical order: bytewise by name, where directory
//! names compare as if they ended with `/`. Names are raw bytes; Git does not
//! require them to be UTF-8.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::entry_mode::EntryMode;
use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{OdbError, OdbResult};
use bytes::Bytes;
use std::cmp::Ordering;
use std::io::BufRead;

/// Git tree object representing a directory snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<(Bytes, DatabaseEntry)>,
}

impl Tree {
    /// Build a tree from `(name, entry)` pairs, sorting them canonically
    pub fn new<N: Into<Bytes>>(entries: impl IntoIterator<Item = (N, DatabaseEntry)>) -> Self {
        let mut entries = entries
            .into_iter()
            .map(|(name, entry)| (name.into(), entry))
            .collect::<Vec<_>>();
        entries.sort_by(|(a_name, a), (b_name, b)| canonical_order(a_name, a, b_name, b));

        Tree { entries }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&[u8], &DatabaseEntry)> {
        self.entries.iter().map(|(name, entry)| (&name[..], entry))
    }

    pub fn into_entries(self) -> impl Iterator<Item = (Bytes, DatabaseEntry)> {
        self.entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn canonical_order(a_name: &[u8], a: &DatabaseEntry, b_name: &[u8], b: &DatabaseEntry) -> Ordering {
    let a_key = a_name.iter().copied().chain(a.is_tree().then_some(b'/'));
    let b_key = b_name.iter().copied().chain(b.is_tree().then_some(b'/'));
    a_key.cmp(b_key)
}

/// Quote a name the way `git ls-tree` does with `core.quotePath` on
fn quote_name(name: &[u8]) -> String {
    let needs_quoting = name
        .iter()
        .any(|byte| *byte < 0x20 || *byte >= 0x7f || matches!(byte, b'"' | b'\\'));
    if !needs_quoting {
        return String::from_utf8_lossy(name).into_owned();
    }

    let mut quoted = String::from("\"");
    for byte in name {
        match byte {
            0x07 => quoted.push_str("\\a"),
            0x08 => quoted.push_str("\\b"),
            b'\t' => quoted.push_str("\\t"),
            b'\n' => quoted.push_str("\\n"),
            0x0b => quoted.push_str("\\v"),
            0x0c => quoted.push_str("\\f"),
            b'\r' => quoted.push_str("\\r"),
            b'"' => quoted.push_str("\\\""),
            b'\\' => quoted.push_str("\\\\"),
            byte if *byte < 0x20 || *byte >= 0x7f => quoted.push_str(&format!("\\{byte:03o}")),
            byte => quoted.push(*byte as char),
        }
    }
    quoted.push('"');
    quoted
}

impl Packable for Tree {
    fn serialize(&self) -> OdbResult<Bytes> {
        let mut content_bytes = Vec::new();

        for (name, entry) in &self.entries {
            content_bytes.extend_from_slice(entry.mode.as_str().as_bytes());
            content_bytes.push(b' ');
            content_bytes.extend_from_slice(name);
            content_bytes.push(0);
            content_bytes.extend_from_slice(entry.oid.as_bytes());
        }

        Ok(Bytes::from(content_bytes))
    }
}

impl Unpackable for Tree {
    fn deserialize(reader: impl BufRead) -> OdbResult<Self> {
        let mut entries = Vec::new();
        let mut reader = reader;

        // Reuse scratch buffers to reduce allocs
        let mut mode_bytes = Vec::new();
        let mut name_bytes = Vec::new();

        loop {
            mode_bytes.clear();
            // Read "mode " (space-delimited)
            let n = reader
                .read_until(b' ', &mut mode_bytes)
                .map_err(|e| OdbError::format(format!("unreadable tree: {e}")))?;
            if n == 0 {
                break; // clean EOF: no more entries
            }
            // Must end with ' ' or it's malformed
            if mode_bytes.pop() != Some(b' ') {
                return Err(OdbError::format("unexpected EOF in tree entry mode"));
            }

            let mode_str = std::str::from_utf8(&mode_bytes)
                .map_err(|_| OdbError::format("tree entry mode is not ASCII"))?;
            let mode = EntryMode::try_from(mode_str)?;

            // Read "name\0"
            name_bytes.clear();
            reader
                .read_until(b'\0', &mut name_bytes)
                .map_err(|e| OdbError::format(format!("unreadable tree: {e}")))?;
            if name_bytes.pop() != Some(b'\0') {
                return Err(OdbError::format("unexpected EOF in tree entry name"));
            }
            let name = Bytes::copy_from_slice(&name_bytes);

            let oid = ObjectId::read_h40_from(&mut reader)
                .map_err(|_| OdbError::format("unexpected EOF in tree entry object id"))?;

            entries.push((name, DatabaseEntry::new(oid, mode)));
        }

        Ok(Tree { entries })
    }
}

impl Object for Tree {
    fn object_type(&self) -> ObjectType {
        ObjectType::Tree
    }

    fn display(&self) -> String {
        self.entries
            .iter()
            .map(|(name, entry)| {
                format!(
                    "{:06o} {} {}\t{}\n",
                    entry.mode.as_u32(),
                    entry.mode.object_type(),
                    entry.oid,
                    quote_name(name)
                )
            })
            .collect()
    }
}
