//! Pack entry header
//!
//! ```text
//! byte 0     1 ttt ssss   type in bits 6-4, size bits 0-3, MSB = more size bytes
//! byte 1..   1 sssssss    further size bits, little-endian groups of 7
//! ofs-delta: big-endian base-128 distance back to the base entry, where every
//!            continuation adds one before shifting
//! ref-delta: 20-byte id of the base object
//! ```
//!
//! The zlib stream of the entry body follows immediately.

use crate::artifacts::objects::OBJECT_ID_SIZE;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::{OdbError, OdbResult};

/// What an entry holds once its header is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A whole object whose inflated body has the given type
    Full(ObjectType),
    /// A delta against the entry starting at this absolute pack offset
    OfsDelta { base_offset: u64 },
    /// A delta against the object with this id, stored anywhere
    RefDelta { base: ObjectId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub kind: EntryKind,
    /// Inflated size of the body (the delta stream for delta entries)
    pub size: u64,
    /// Bytes taken by the header; the compressed body starts here
    pub header_len: usize,
}

impl EntryHeader {
    /// Decode the header at the start of `data`, an entry beginning at
    /// `entry_offset` in its pack
    pub fn parse(data: &[u8], entry_offset: u64) -> OdbResult<Self> {
        let truncated =
            || OdbError::format(format!("truncated pack entry header at offset {entry_offset}"));
        let mut bytes = data.iter().copied();
        let mut header_len = 0usize;
        let mut next = || {
            header_len += 1;
            bytes.next().ok_or_else(truncated)
        };

        let mut byte = next()?;
        let type_bits = (byte >> 4) & 0x07;
        let mut size = (byte & 0x0f) as u64;
        let mut shift = 4u32;
        while byte & 0x80 != 0 {
            byte = next()?;
            if shift > 57 {
                return Err(OdbError::format(format!(
                    "entry size overflows at offset {entry_offset}"
                )));
            }
            size |= ((byte & 0x7f) as u64) << shift;
            shift += 7;
        }

        let kind = match type_bits {
            1 => EntryKind::Full(ObjectType::Commit),
            2 => EntryKind::Full(ObjectType::Tree),
            3 => EntryKind::Full(ObjectType::Blob),
            4 => EntryKind::Full(ObjectType::Tag),
            6 => {
                byte = next()?;
                let mut distance = (byte & 0x7f) as u64;
                while byte & 0x80 != 0 {
                    byte = next()?;
                    distance = distance
                        .checked_add(1)
                        .and_then(|distance| distance.checked_mul(128))
                        .map(|distance| distance + (byte & 0x7f) as u64)
                        .ok_or_else(|| {
                            OdbError::corrupt_delta(format!(
                                "base distance overflows at offset {entry_offset}"
                            ))
                        })?;
                }

                let base_offset = entry_offset
                    .checked_sub(distance)
                    .filter(|_| distance > 0)
                    .ok_or_else(|| {
                        OdbError::corrupt_delta(format!(
                            "delta at offset {entry_offset} points {distance} bytes back"
                        ))
                    })?;
                EntryKind::OfsDelta { base_offset }
            }
            7 => {
                let mut base = [0u8; OBJECT_ID_SIZE];
                for slot in base.iter_mut() {
                    *slot = next()?;
                }
                EntryKind::RefDelta {
                    base: ObjectId::from_bytes(&base)?,
                }
            }
            other => {
                return Err(OdbError::format(format!(
                    "invalid pack entry type {other} at offset {entry_offset}"
                )));
            }
        };

        Ok(EntryHeader {
            kind,
            size,
            header_len,
        })
    }
}
