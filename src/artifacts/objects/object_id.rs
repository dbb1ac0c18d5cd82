//! Git object identifier (SHA-1 hash)
//!
//! Object IDs are 20-byte SHA-1 digests of an object's framed bytes,
//! conventionally rendered as 40 lowercase hexadecimal characters.
//!
//! ## Storage
//!
//! Loose objects are stored in `objects/<first-2-chars>/<remaining-38-chars>`

use crate::artifacts::objects::{OBJECT_ID_LENGTH, OBJECT_ID_SIZE};
use crate::errors::{OdbError, OdbResult};
use sha1::{Digest, Sha1};
use std::io;
use std::path::PathBuf;

/// Git object identifier (SHA-1 hash)
///
/// Ordering is bytewise, which is the order pack indexes sort their entries in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_SIZE]);

impl ObjectId {
    /// Parse and validate an object ID from its 40-character hex form
    pub fn try_parse(id: impl AsRef<str>) -> OdbResult<Self> {
        let id = id.as_ref();
        if id.len() != OBJECT_ID_LENGTH {
            return Err(OdbError::InvalidObjectId(format!(
                "invalid length {}: {id}",
                id.len()
            )));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(OdbError::InvalidObjectId(format!(
                "invalid characters: {id}"
            )));
        }

        let mut bytes = [0u8; OBJECT_ID_SIZE];
        // Process a byte (two nibbles) at a time
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&id[i * 2..i * 2 + 2], 16)
                .map_err(|_| OdbError::InvalidObjectId(id.to_string()))?;
        }

        Ok(Self(bytes))
    }

    /// Build an object ID from exactly 20 raw bytes
    pub fn from_bytes(bytes: &[u8]) -> OdbResult<Self> {
        let bytes: [u8; OBJECT_ID_SIZE] = bytes.try_into().map_err(|_| {
            OdbError::InvalidObjectId(format!("expected 20 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(bytes))
    }

    /// SHA-1 over the exact bytes given (the framed form for objects)
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);

        let mut bytes = [0u8; OBJECT_ID_SIZE];
        bytes.copy_from_slice(hasher.finalize().as_slice());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_SIZE] {
        &self.0
    }

    /// Write the object ID in binary format (20 bytes)
    ///
    /// Used when serializing tree entries.
    pub fn write_h40_to<W: io::Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.0)
    }

    /// Read an object ID from binary format (20 bytes)
    ///
    /// Used when deserializing tree entries and ref-delta headers.
    pub fn read_h40_from<R: io::Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let mut bytes = [0u8; OBJECT_ID_SIZE];
        reader.read_exact(&mut bytes)?;
        Ok(Self(bytes))
    }

    /// Convert to the storage path of a loose object
    ///
    /// Splits the hash as `XX/YYYYYY...` where XX is the first 2 chars.
    pub fn to_path(&self) -> PathBuf {
        let hex = self.to_hex();
        let (dir, file) = hex.split_at(2);
        PathBuf::from(dir).join(file)
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|byte| format!("{byte:02x}")).collect()
    }

    /// First 7 characters of the hash (standard Git abbreviation)
    pub fn to_short_oid(&self) -> String {
        self.to_hex()[..7].to_string()
    }
}

impl std::str::FromStr for ObjectId {
    type Err = OdbError;

    fn from_str(s: &str) -> OdbResult<Self> {
        Self::try_parse(s)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
