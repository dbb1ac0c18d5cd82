//! Loose objects
//!
//! Each object lives zlib-compressed at `objects/<first 2 hex>/<remaining 38 hex>`.
//! The bytes stored are the framed object, so its SHA-1 is the path itself.

use crate::areas::storage::Storage;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::{OdbError, OdbResult};
use bytes::Bytes;
use flate2::Compression;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Directory holding loose objects and packs, relative to the git directory
pub const OBJECTS_DIR: &str = "objects";

pub struct LooseObjects {
    storage: Arc<dyn Storage>,
    compression: Compression,
}

impl LooseObjects {
    pub fn new(storage: Arc<dyn Storage>, compression_level: u32) -> Self {
        LooseObjects {
            storage,
            compression: Compression::new(compression_level),
        }
    }

    pub fn object_path(oid: &ObjectId) -> PathBuf {
        Path::new(OBJECTS_DIR).join(oid.to_path())
    }

    /// Framed bytes of `oid`, or `None` when there is no loose file for it
    pub async fn load(&self, oid: &ObjectId) -> OdbResult<Option<Bytes>> {
        let Some(compressed) = self.storage.read_file(&Self::object_path(oid)).await? else {
            return Ok(None);
        };

        Self::decompress(&compressed)
            .map(Some)
            .map_err(|reason| OdbError::format(format!("loose object {oid}: {reason}")))
    }

    /// Compress `framed` and atomically replace the file for `oid`
    pub async fn save(&self, oid: &ObjectId, framed: &[u8]) -> OdbResult<()> {
        let compressed = self.compress(framed).map_err(|error| {
            OdbError::storage(Self::object_path(oid), error)
        })?;

        self.storage
            .write_file(&Self::object_path(oid), compressed)
            .await
    }

    fn compress(&self, data: &[u8]) -> std::io::Result<Bytes> {
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), self.compression);
        encoder.write_all(data)?;

        encoder.finish().map(Bytes::from)
    }

    fn decompress(data: &[u8]) -> std::io::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut decompressed_content = Vec::new();
        decoder.read_to_end(&mut decompressed_content)?;

        Ok(decompressed_content.into())
    }
}
