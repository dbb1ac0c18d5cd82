//! Reading objects out of packfiles
//!
//! Packs live as `objects/pack/pack-<hash>.pack` with their index beside them
//! as `pack-<hash>.idx`. Packs are only ever read here.
//!
//! Delta entries are resolved recursively: an ofs-delta names its base by a
//! position in the same pack, a ref-delta by object id, and that base may be
//! loose, in this pack or in another one. Every resolution carries a
//! [`DeltaChain`] recording what it has visited, so a pack whose deltas loop
//! back on themselves fails with `CorruptDelta` instead of recursing forever.

use crate::areas::loose::{LooseObjects, OBJECTS_DIR};
use crate::areas::pack_cache::PackIndexCache;
use crate::areas::storage::Storage;
use crate::artifacts::objects::object::{deframe, frame};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::pack::delta;
use crate::artifacts::pack::entry_header::{EntryHeader, EntryKind};
use crate::artifacts::pack::pack_index::PackIndex;
use crate::errors::{OdbError, OdbResult};
use bytes::Bytes;
use std::collections::HashSet;
use std::future::Future;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, trace};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A decoded object: its type and body
type Resolved = (ObjectType, Bytes);

const PACK_PREFIX: &str = "pack-";

/// Entries and objects already entered by one top-level resolution
#[derive(Debug, Default)]
pub struct DeltaChain {
    entries: HashSet<(String, u64)>,
    bases: HashSet<ObjectId>,
}

impl DeltaChain {
    /// A chain for resolving `oid`, which therefore may not reappear as a base
    pub fn starting_at(oid: ObjectId) -> Self {
        DeltaChain {
            entries: HashSet::new(),
            bases: HashSet::from([oid]),
        }
    }

    fn enter_entry(&mut self, pack: &str, offset: u64) -> OdbResult<()> {
        if !self.entries.insert((pack.to_string(), offset)) {
            return Err(OdbError::corrupt_delta(format!(
                "delta chain in {pack} loops back to offset {offset}"
            )));
        }
        Ok(())
    }

    fn enter_base(&mut self, base: ObjectId) -> OdbResult<()> {
        if !self.bases.insert(base) {
            return Err(OdbError::corrupt_delta(format!(
                "delta chain loops back to object {base}"
            )));
        }
        Ok(())
    }

    /// Number of entries visited so far
    pub fn depth(&self) -> usize {
        self.entries.len()
    }
}

pub struct Packs {
    storage: Arc<dyn Storage>,
    cache: Arc<PackIndexCache>,
}

impl Packs {
    pub fn new(storage: Arc<dyn Storage>, cache: Arc<PackIndexCache>) -> Self {
        Packs { storage, cache }
    }

    pub fn pack_dir() -> PathBuf {
        Path::new(OBJECTS_DIR).join("pack")
    }

    pub fn index_path(pack: &str) -> PathBuf {
        Self::pack_dir().join(format!("{PACK_PREFIX}{pack}.idx"))
    }

    pub fn pack_path(pack: &str) -> PathBuf {
        Self::pack_dir().join(format!("{PACK_PREFIX}{pack}.pack"))
    }

    /// Hashes of every pack that has an index, in name order
    pub async fn pack_names(&self) -> OdbResult<Vec<String>> {
        let names = self
            .storage
            .list_directory(&Self::pack_dir())
            .await?
            .unwrap_or_default();

        let mut packs = names
            .iter()
            .filter_map(|name| name.strip_prefix(PACK_PREFIX)?.strip_suffix(".idx"))
            .map(str::to_string)
            .collect::<Vec<_>>();
        packs.sort();

        Ok(packs)
    }

    /// Parsed index of `pack`, from the cache when possible
    pub async fn index(&self, pack: &str) -> OdbResult<Arc<PackIndex>> {
        self.cache
            .get_or_parse(pack, move || async move {
                let data = self
                    .storage
                    .read_file(&Self::index_path(pack))
                    .await?
                    .ok_or_else(|| OdbError::corrupt_index(pack, "index file is missing"))?;

                PackIndex::parse(pack, &data)
            })
            .await
    }

    /// Framed bytes of `oid` if any pack holds it
    pub async fn load(&self, oid: &ObjectId, loose: &LooseObjects) -> OdbResult<Option<Bytes>> {
        let mut chain = DeltaChain::starting_at(*oid);
        let resolved = self.find(*oid, loose, &mut chain).await?;

        Ok(resolved.map(|(object_type, body)| frame(object_type, &body)))
    }

    /// Look `oid` up in every pack, resolving the first entry found
    async fn find(
        &self,
        oid: ObjectId,
        loose: &LooseObjects,
        chain: &mut DeltaChain,
    ) -> OdbResult<Option<Resolved>> {
        for pack in self.pack_names().await? {
            let index = self.index(&pack).await?;
            let Some(offset) = index.lookup(&oid) else {
                continue;
            };

            debug!(%oid, %pack, offset, "found object in pack");
            return self
                .resolve_entry(&pack, &index, offset, loose, chain)
                .await
                .map(Some);
        }

        Ok(None)
    }

    /// Decode the entry at `offset`, applying deltas down to a full object
    fn resolve_entry<'a>(
        &'a self,
        pack: &'a str,
        index: &'a PackIndex,
        offset: u64,
        loose: &'a LooseObjects,
        chain: &'a mut DeltaChain,
    ) -> BoxFuture<'a, OdbResult<Resolved>> {
        Box::pin(async move {
            chain.enter_entry(pack, offset)?;

            let chunk = self
                .storage
                .read_range(&Self::pack_path(pack), offset, index.next_offset(offset))
                .await?
                .ok_or_else(|| OdbError::corrupt_index(pack, "companion pack file is missing"))?;

            let header = EntryHeader::parse(&chunk, offset)?;
            let body = inflate(&chunk[header.header_len..], header.size).map_err(|reason| {
                let reason = format!("entry at offset {offset} in pack {pack}: {reason}");
                match header.kind {
                    EntryKind::Full(_) => OdbError::format(reason),
                    _ => OdbError::corrupt_delta(reason),
                }
            })?;

            let (base_type, base) = match header.kind {
                EntryKind::Full(object_type) => return Ok((object_type, body)),
                EntryKind::OfsDelta { base_offset } => {
                    if !index.has_entry_at(base_offset) {
                        return Err(OdbError::corrupt_delta(format!(
                            "delta at offset {offset} in pack {pack} names {base_offset}, \
                             which starts no entry"
                        )));
                    }
                    trace!(pack, offset, base_offset, depth = chain.depth(), "resolving ofs-delta");
                    self.resolve_entry(pack, index, base_offset, loose, chain)
                        .await?
                }
                EntryKind::RefDelta { base } => {
                    trace!(pack, offset, %base, depth = chain.depth(), "resolving ref-delta");
                    self.load_base(base, loose, chain).await?
                }
            };

            let result = delta::apply(&base, &body)?;
            Ok((base_type, Bytes::from(result)))
        })
    }

    /// Load a ref-delta base through the whole pipeline: loose first, then packs
    fn load_base<'a>(
        &'a self,
        base: ObjectId,
        loose: &'a LooseObjects,
        chain: &'a mut DeltaChain,
    ) -> BoxFuture<'a, OdbResult<Resolved>> {
        Box::pin(async move {
            chain.enter_base(base)?;

            if let Some(framed) = loose.load(&base).await? {
                return deframe(&framed);
            }

            self.find(base, loose, chain).await?.ok_or_else(|| {
                OdbError::corrupt_delta(format!("delta base {base} is not in the database"))
            })
        })
    }
}

/// Inflate one zlib stream, which must yield exactly `size` bytes
///
/// Anything after the end of the stream (the next entry) is ignored.
fn inflate(compressed: &[u8], size: u64) -> Result<Bytes, String> {
    let mut decoder = flate2::read::ZlibDecoder::new(compressed).take(size.saturating_add(1));
    let mut inflated = Vec::with_capacity(compressed.len());
    decoder
        .read_to_end(&mut inflated)
        .map_err(|error| format!("cannot inflate: {error}"))?;

    if inflated.len() as u64 != size {
        return Err(format!(
            "inflated {} bytes, header declares {size}",
            inflated.len()
        ));
    }

    Ok(Bytes::from(inflated))
}
