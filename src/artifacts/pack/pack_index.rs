//! Pack index (version 2)
//!
//! ## Format
//!
//! ```text
//! magic        ff 74 4f 63
//! version      00 00 00 02
//! fan-out      256 x u32     fan_out[b] = number of ids whose first byte <= b
//! ids          N x 20 bytes  sorted ascending
//! crc32        N x u32
//! offsets      N x u32       MSB set: index into the large offset table
//! large        M x u64
//! pack sha1    20 bytes
//! index sha1   20 bytes      over every preceding byte
//! ```
//!
//! All integers are big-endian.

use crate::artifacts::objects::OBJECT_ID_SIZE;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::pack::checksum::Checksum;
use crate::artifacts::pack::{
    CHECKSUM_SIZE, FANOUT_SIZE, IDX_SIGNATURE, IDX_VERSION, LARGE_OFFSET_FLAG,
};
use crate::errors::{OdbError, OdbResult};

/// Parsed, immutable view of one `.idx` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackIndex {
    fan_out: [u32; FANOUT_SIZE],
    object_ids: Vec<ObjectId>,
    crc32s: Vec<u32>,
    /// Parallel to `object_ids`, large offsets already resolved
    offsets: Vec<u64>,
    /// Every entry start, ascending; bounds the length of each entry
    sorted_offsets: Vec<u64>,
    pack_checksum: [u8; CHECKSUM_SIZE],
}

impl PackIndex {
    /// Parse the full contents of a `.idx` file belonging to `pack`
    pub fn parse(pack: &str, data: &[u8]) -> OdbResult<Self> {
        let mut reader = Checksum::new(pack, data);

        let signature = reader.read(IDX_SIGNATURE.len())?;
        if signature != IDX_SIGNATURE {
            return Err(OdbError::UnsupportedFormat(format!(
                "pack index {pack} has signature {signature:02x?}"
            )));
        }
        let version = reader.read_u32()?;
        if version != IDX_VERSION {
            return Err(OdbError::UnsupportedFormat(format!(
                "pack index {pack} has version {version}, only {IDX_VERSION} is supported"
            )));
        }

        let mut fan_out = [0u32; FANOUT_SIZE];
        for slot in fan_out.iter_mut() {
            *slot = reader.read_u32()?;
        }
        if fan_out.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(reader.corrupt("fan-out table is not monotonic"));
        }

        let count = fan_out[FANOUT_SIZE - 1] as usize;
        let tables_len = count
            .checked_mul(OBJECT_ID_SIZE + 4 + 4)
            .ok_or_else(|| reader.corrupt("object count overflows"))?;
        if reader.remaining() < tables_len + CHECKSUM_SIZE {
            return Err(reader.corrupt(format!(
                "{count} objects declared but the file is too short to hold them"
            )));
        }

        let mut object_ids = Vec::with_capacity(count);
        for _ in 0..count {
            object_ids.push(ObjectId::from_bytes(reader.read(OBJECT_ID_SIZE)?)?);
        }

        let mut crc32s = Vec::with_capacity(count);
        for _ in 0..count {
            crc32s.push(reader.read_u32()?);
        }

        let mut small_offsets = Vec::with_capacity(count);
        for _ in 0..count {
            small_offsets.push(reader.read_u32()?);
        }

        let large_count = small_offsets
            .iter()
            .filter(|offset| *offset & LARGE_OFFSET_FLAG != 0)
            .map(|offset| (offset & !LARGE_OFFSET_FLAG) as usize + 1)
            .max()
            .unwrap_or(0);
        if reader.remaining() != large_count * 8 + CHECKSUM_SIZE {
            return Err(reader.corrupt(format!(
                "expected {large_count} large offsets before the pack checksum"
            )));
        }

        let mut large_offsets = Vec::with_capacity(large_count);
        for _ in 0..large_count {
            large_offsets.push(reader.read_u64()?);
        }

        let offsets = small_offsets
            .iter()
            .map(|offset| match offset & LARGE_OFFSET_FLAG {
                0 => *offset as u64,
                _ => large_offsets[(offset & !LARGE_OFFSET_FLAG) as usize],
            })
            .collect::<Vec<_>>();

        let mut pack_checksum = [0u8; CHECKSUM_SIZE];
        pack_checksum.copy_from_slice(reader.read(CHECKSUM_SIZE)?);

        reader.verify()?;

        let mut sorted_offsets = offsets.clone();
        sorted_offsets.sort_unstable();

        Ok(PackIndex {
            fan_out,
            object_ids,
            crc32s,
            offsets,
            sorted_offsets,
            pack_checksum,
        })
    }

    /// Position of `oid` in the sorted id table
    fn position(&self, oid: &ObjectId) -> Option<usize> {
        let first_byte = oid.as_bytes()[0] as usize;
        let start = match first_byte {
            0 => 0,
            _ => self.fan_out[first_byte - 1] as usize,
        };
        let end = self.fan_out[first_byte] as usize;

        self.object_ids[start..end]
            .binary_search(oid)
            .ok()
            .map(|position| start + position)
    }

    /// Byte offset of the entry holding `oid` inside the pack
    pub fn lookup(&self, oid: &ObjectId) -> Option<u64> {
        self.position(oid).map(|position| self.offsets[position])
    }

    pub fn crc32(&self, oid: &ObjectId) -> Option<u32> {
        self.position(oid).map(|position| self.crc32s[position])
    }

    /// Whether some entry starts exactly at `offset`
    pub fn has_entry_at(&self, offset: u64) -> bool {
        self.sorted_offsets.binary_search(&offset).is_ok()
    }

    /// Start of the entry following the one at `offset`, if there is one
    pub fn next_offset(&self, offset: u64) -> Option<u64> {
        let next = self.sorted_offsets.partition_point(|start| *start <= offset);
        self.sorted_offsets.get(next).copied()
    }

    /// `(id, offset, crc32)` for every entry, in id order
    pub fn entries(&self) -> impl Iterator<Item = (&ObjectId, u64, u32)> {
        self.object_ids
            .iter()
            .zip(&self.offsets)
            .zip(&self.crc32s)
            .map(|((oid, offset), crc)| (oid, *offset, *crc))
    }

    pub fn len(&self) -> usize {
        self.object_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.object_ids.is_empty()
    }

    pub fn pack_checksum(&self) -> &[u8; CHECKSUM_SIZE] {
        &self.pack_checksum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::{fixture, rstest};
    use sha1::{Digest, Sha1};

    /// Lay out a v2 index for `(id, offset)` pairs; offsets at or above 2^31
    /// go to the large offset table
    fn build_index(entries: &[(ObjectId, u64)]) -> Vec<u8> {
        let mut entries = entries.to_vec();
        entries.sort_by_key(|(oid, _)| *oid);

        let mut data = IDX_SIGNATURE.to_vec();
        data.extend_from_slice(&IDX_VERSION.to_be_bytes());

        for byte in 0..FANOUT_SIZE {
            let count = entries
                .iter()
                .filter(|(oid, _)| oid.as_bytes()[0] as usize <= byte)
                .count() as u32;
            data.extend_from_slice(&count.to_be_bytes());
        }
        for (oid, _) in &entries {
            data.extend_from_slice(oid.as_bytes());
        }
        for (index, _) in entries.iter().enumerate() {
            data.extend_from_slice(&(0xc0de_0000u32 + index as u32).to_be_bytes());
        }

        let mut large = Vec::new();
        for (_, offset) in &entries {
            if *offset >= LARGE_OFFSET_FLAG as u64 {
                let slot = LARGE_OFFSET_FLAG | large.len() as u32;
                data.extend_from_slice(&slot.to_be_bytes());
                large.push(*offset);
            } else {
                data.extend_from_slice(&(*offset as u32).to_be_bytes());
            }
        }
        for offset in large {
            data.extend_from_slice(&offset.to_be_bytes());
        }

        data.extend_from_slice(&[0xaa; CHECKSUM_SIZE]);
        let checksum = Sha1::digest(&data);
        data.extend_from_slice(checksum.as_slice());

        data
    }

    fn oid(seed: &str) -> ObjectId {
        ObjectId::hash(seed.as_bytes())
    }

    #[fixture]
    fn entries() -> Vec<(ObjectId, u64)> {
        vec![(oid("a"), 12), (oid("b"), 340), (oid("c"), 97)]
    }

    #[rstest]
    fn finds_every_entry(entries: Vec<(ObjectId, u64)>) {
        let index = PackIndex::parse("test", &build_index(&entries)).unwrap();

        assert_eq!(index.len(), 3);
        for (oid, offset) in &entries {
            assert_eq!(index.lookup(oid), Some(*offset));
        }
        assert_eq!(index.lookup(&oid("missing")), None);
        assert_eq!(index.pack_checksum(), &[0xaa; CHECKSUM_SIZE]);
    }

    #[rstest]
    fn next_offset_bounds_entries(entries: Vec<(ObjectId, u64)>) {
        let index = PackIndex::parse("test", &build_index(&entries)).unwrap();

        assert_eq!(index.next_offset(12), Some(97));
        assert_eq!(index.next_offset(97), Some(340));
        assert_eq!(index.next_offset(340), None);
        assert!(index.has_entry_at(97));
        assert!(!index.has_entry_at(98));
    }

    #[test]
    fn resolves_large_offsets() {
        let big = (1u64 << 33) + 7;
        let entries = vec![(oid("small"), 12), (oid("big"), big)];
        let data = build_index(&entries);

        let index = PackIndex::parse("test", &data).unwrap();

        assert_eq!(index.lookup(&oid("big")), Some(big));
        assert_eq!(index.lookup(&oid("small")), Some(12));
        assert_eq!(index.next_offset(12), Some(big));
    }

    #[test]
    fn empty_index_is_valid() {
        let index = PackIndex::parse("test", &build_index(&[])).unwrap();

        assert!(index.is_empty());
        assert_eq!(index.lookup(&oid("a")), None);
    }

    #[rstest]
    fn crc_values_are_kept(entries: Vec<(ObjectId, u64)>) {
        let index = PackIndex::parse("test", &build_index(&entries)).unwrap();
        let crcs = index.entries().map(|(_, _, crc)| crc).collect::<Vec<_>>();

        assert_eq!(crcs, vec![0xc0de_0000, 0xc0de_0001, 0xc0de_0002]);
        assert_eq!(index.crc32(index.entries().next().unwrap().0), Some(0xc0de_0000));
    }

    #[rstest]
    fn flipped_id_byte_is_corruption(entries: Vec<(ObjectId, u64)>) {
        let mut data = build_index(&entries);
        // first byte of the second id, past the header and fan-out
        data[8 + FANOUT_SIZE * 4 + OBJECT_ID_SIZE + 3] ^= 0xff;

        assert!(matches!(
            PackIndex::parse("test", &data),
            Err(OdbError::CorruptIndex { .. })
        ));
    }

    #[rstest]
    #[case::signature(0)]
    #[case::version(7)]
    fn unknown_header_is_unsupported(entries: Vec<(ObjectId, u64)>, #[case] position: usize) {
        let mut data = build_index(&entries);
        data[position] ^= 0x01;

        assert!(matches!(
            PackIndex::parse("test", &data),
            Err(OdbError::UnsupportedFormat(_))
        ));
    }

    #[rstest]
    fn truncated_index_is_corruption(entries: Vec<(ObjectId, u64)>) {
        let data = build_index(&entries);

        assert!(matches!(
            PackIndex::parse("test", &data[..data.len() - 1]),
            Err(OdbError::CorruptIndex { .. })
        ));
    }

    proptest! {
        #[test]
        fn any_single_byte_flip_is_rejected(position in 8usize..(8 + FANOUT_SIZE * 4 + 3 * 28 + 20)) {
            let entries = vec![(oid("a"), 12), (oid("b"), 340), (oid("c"), 97)];
            let mut data = build_index(&entries);
            data[position] ^= 0x10;

            prop_assert!(PackIndex::parse("test", &data).is_err());
        }
    }
}
