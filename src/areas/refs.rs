//! Git references (branches, HEAD, tags)
//!
//! References are human-readable names pointing at objects. They can be:
//! - Direct: containing a 40-character object id
//! - Symbolic: pointing to another reference (e.g., HEAD -> refs/heads/master)
//!
//! ## Lookup order
//!
//! A loose ref file (`refs/heads/main`) always wins. Only when there is none
//! is the `packed-refs` summary consulted. Writes only ever touch loose files,
//! which therefore shadow whatever `packed-refs` says.
//!
//! ## File Format
//!
//! Loose refs are text files containing either:
//! - A 40-character SHA-1 hash (direct reference), optionally followed by whitespace
//! - `ref: <path>` for symbolic references

use crate::areas::storage::Storage;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::refs::packed_refs::PackedRefs;
use crate::artifacts::refs::ref_name::RefName;
use crate::artifacts::refs::{PACKED_REFS, REFS_DIR, SYMREF};
use crate::errors::{OdbError, OdbResult};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// Deepest chain of symbolic refs followed before giving up
pub const MAX_SYMREF_DEPTH: usize = 5;

/// Contents of one loose ref file
#[derive(Debug, Clone, PartialEq, Eq)]
enum SymRefOrOid {
    /// Symbolic reference pointing to another ref
    SymRef { target: RefName },
    /// Direct object ID
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn parse(name: &RefName, content: &[u8]) -> OdbResult<Option<Self>> {
        let content = std::str::from_utf8(content)
            .map_err(|_| OdbError::format(format!("ref {name} is not valid UTF-8")))?
            .trim();

        if content.is_empty() {
            return Ok(None);
        }

        if let Some(symref_match) = SYMREF.captures(content) {
            return Ok(Some(SymRefOrOid::SymRef {
                target: RefName::try_parse(&symref_match[1])?,
            }));
        }

        ObjectId::try_parse(content)
            .map(|oid| Some(SymRefOrOid::Oid(oid)))
            .map_err(|_| OdbError::format(format!("ref {name} holds neither an id nor a symref")))
    }
}

/// Git references manager
pub struct Refs {
    storage: Arc<dyn Storage>,
}

impl Refs {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Refs { storage }
    }

    async fn read_loose(&self, name: &RefName) -> OdbResult<Option<SymRefOrOid>> {
        match self.storage.read_file(name.to_path()).await? {
            Some(content) => SymRefOrOid::parse(name, &content),
            None => Ok(None),
        }
    }

    pub async fn packed_refs(&self) -> OdbResult<PackedRefs> {
        match self.storage.read_file(Path::new(PACKED_REFS)).await? {
            Some(content) => {
                let text = std::str::from_utf8(&content)
                    .map_err(|_| OdbError::format("packed-refs is not valid UTF-8"))?;
                PackedRefs::parse(text)
            }
            None => Ok(PackedRefs::default()),
        }
    }

    /// Follow symbolic refs from `name` to the ref that holds an id
    ///
    /// Returns that final name, which may not exist yet (e.g. HEAD of a fresh
    /// repository pointing at an unborn branch).
    pub async fn resolve_symbolic(&self, name: &RefName) -> OdbResult<RefName> {
        let mut current = name.clone();

        for _ in 0..=MAX_SYMREF_DEPTH {
            match self.read_loose(&current).await? {
                Some(SymRefOrOid::SymRef { target }) => {
                    trace!(from = %current, to = %target, "following symbolic ref");
                    current = target;
                }
                Some(SymRefOrOid::Oid(_)) | None => return Ok(current),
            }
        }

        Err(OdbError::InvalidRefName(format!(
            "{name}: symbolic refs nested deeper than {MAX_SYMREF_DEPTH}"
        )))
    }

    /// Object id `name` points at, or `None` when the ref exists nowhere
    pub async fn read_ref(&self, name: &str) -> OdbResult<Option<ObjectId>> {
        let name = RefName::try_parse(name)?;
        let target = self.resolve_symbolic(&name).await?;

        if let Some(SymRefOrOid::Oid(oid)) = self.read_loose(&target).await? {
            return Ok(Some(oid));
        }

        let packed = self.packed_refs().await?;
        Ok(packed.find(target.as_str()).map(|packed| packed.oid))
    }

    /// Point `name` (or the ref it symbolically names) at `oid`
    ///
    /// Only the loose file is written; `packed-refs` is left untouched.
    pub async fn update_ref(&self, name: &str, oid: &ObjectId) -> OdbResult<()> {
        let name = RefName::try_parse(name)?;
        let target = self.resolve_symbolic(&name).await?;

        self.storage
            .write_file(target.to_path(), Bytes::from(format!("{oid}\n")))
            .await
    }

    /// Make `name` a symbolic ref to `target`
    pub async fn set_symbolic_ref(&self, name: &str, target: &str) -> OdbResult<()> {
        let name = RefName::try_parse(name)?;
        let target = RefName::try_parse(target)?;

        self.storage
            .write_file(name.to_path(), Bytes::from(format!("ref: {target}\n")))
            .await
    }

    /// Every ref under `refs/` with the id it resolves to, sorted by name
    ///
    /// Loose refs shadow packed ones of the same name. Symbolic refs that do
    /// not resolve are left out.
    pub async fn list_refs(&self) -> OdbResult<Vec<(RefName, ObjectId)>> {
        let mut refs = self
            .packed_refs()
            .await?
            .iter()
            .map(|packed| (packed.name.clone(), packed.oid))
            .collect::<BTreeMap<_, _>>();

        for name in self.loose_ref_names().await? {
            let name = RefName::new_unchecked(name);
            let target = self.resolve_symbolic(&name).await?;

            if let Some(SymRefOrOid::Oid(oid)) = self.read_loose(&target).await? {
                refs.insert(name.to_string(), oid);
            } else if target != name
                && let Some(packed) = refs.get(target.as_str()).copied()
            {
                refs.insert(name.to_string(), packed);
            }
        }

        Ok(refs
            .into_iter()
            .map(|(name, oid)| (RefName::new_unchecked(name), oid))
            .collect())
    }

    /// Paths of every loose file below `refs/`
    async fn loose_ref_names(&self) -> OdbResult<Vec<String>> {
        let mut names = Vec::new();
        let mut stack = vec![PathBuf::from(REFS_DIR)];

        while let Some(dir) = stack.pop() {
            let Some(entries) = self.storage.list_directory(&dir).await? else {
                continue;
            };

            for entry in entries {
                let path = dir.join(&entry);
                if self.storage.list_directory(&path).await?.is_some() {
                    stack.push(path);
                } else if !entry.starts_with("tmp-obj-") {
                    names.push(path.to_string_lossy().replace('\\', "/"));
                }
            }
        }

        Ok(names)
    }
}
