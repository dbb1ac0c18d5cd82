//! Hand-built packs and pack indexes
//!
//! Lets tests lay out exactly the entries they need (full objects, ofs-deltas,
//! ref-deltas, loops, large offsets) without depending on how git chooses to
//! pack things.

use bit_odb::areas::packs::Packs;
use bit_odb::areas::storage::Storage;
use bit_odb::artifacts::objects::object::frame;
use bit_odb::artifacts::objects::object_id::ObjectId;
use bit_odb::artifacts::objects::object_type::ObjectType;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use sha1::{Digest, Sha1};
use std::io::Write;

const OFS_DELTA: u8 = 6;
const REF_DELTA: u8 = 7;

pub fn type_code(object_type: ObjectType) -> u8 {
    match object_type {
        ObjectType::Commit => 1,
        ObjectType::Tree => 2,
        ObjectType::Blob => 3,
        ObjectType::Tag => 4,
    }
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("Failed to deflate");
    encoder.finish().expect("Failed to deflate")
}

/// Id of the object `object_type` + `body` frames to
pub fn object_id(object_type: ObjectType, body: &[u8]) -> ObjectId {
    ObjectId::hash(&frame(object_type, body))
}

fn write_varint(out: &mut Vec<u8>, mut value: usize) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Delta turning `base` into `target`: one copy of the shared prefix, then inserts
pub fn encode_delta(base: &[u8], target: &[u8]) -> Vec<u8> {
    let mut delta = Vec::new();
    write_varint(&mut delta, base.len());
    write_varint(&mut delta, target.len());

    let prefix = base
        .iter()
        .zip(target)
        .take_while(|(a, b)| a == b)
        .count()
        .min(0xffff);

    if prefix > 0 {
        let mut cmd = 0x80u8;
        let mut sizes = Vec::new();
        for i in 0..2 {
            let byte = ((prefix >> (8 * i)) & 0xff) as u8;
            if byte != 0 {
                cmd |= 0x10 << i;
                sizes.push(byte);
            }
        }
        delta.push(cmd);
        delta.extend(sizes);
    }

    for chunk in target[prefix..].chunks(0x7f) {
        delta.push(chunk.len() as u8);
        delta.extend_from_slice(chunk);
    }

    delta
}

pub struct PackBuilder {
    data: Vec<u8>,
    count: u32,
    entries: Vec<(ObjectId, u64, u32)>,
    large_offsets: bool,
}

pub struct BuiltPack {
    pub hash: String,
    pub pack: Vec<u8>,
    pub index: Vec<u8>,
}

impl Default for PackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PackBuilder {
    pub fn new() -> Self {
        let mut data = b"PACK".to_vec();
        data.extend_from_slice(&2u32.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());

        PackBuilder {
            data,
            count: 0,
            entries: Vec::new(),
            large_offsets: false,
        }
    }

    /// Record every offset in the index's 64-bit table
    pub fn with_large_offsets(mut self) -> Self {
        self.large_offsets = true;
        self
    }

    fn push_entry(&mut self, oid: ObjectId, code: u8, payload: &[u8], extra: &[u8]) -> u64 {
        let offset = self.data.len() as u64;

        let mut entry = Vec::new();
        let mut size = payload.len();
        let mut byte = (code << 4) | (size & 0x0f) as u8;
        size >>= 4;
        while size > 0 {
            entry.push(byte | 0x80);
            byte = (size & 0x7f) as u8;
            size >>= 7;
        }
        entry.push(byte);
        entry.extend_from_slice(extra);
        entry.extend(deflate(payload));

        let mut crc = flate2::Crc::new();
        crc.update(&entry);

        self.data.extend(entry);
        self.count += 1;
        self.entries.push((oid, offset, crc.sum()));

        offset
    }

    pub fn add_object(&mut self, object_type: ObjectType, body: &[u8]) -> (ObjectId, u64) {
        let oid = object_id(object_type, body);
        let offset = self.push_entry(oid, type_code(object_type), body, &[]);

        (oid, offset)
    }

    /// Delta against the entry at `base_offset` in this pack, recorded as `oid`
    pub fn add_ofs_delta(&mut self, oid: ObjectId, base_offset: u64, delta: &[u8]) -> u64 {
        let offset = self.data.len() as u64;
        let mut distance = offset - base_offset;

        let mut encoded = vec![(distance & 0x7f) as u8];
        distance >>= 7;
        while distance > 0 {
            distance -= 1;
            encoded.push(0x80 | (distance & 0x7f) as u8);
            distance >>= 7;
        }
        encoded.reverse();

        self.push_entry(oid, OFS_DELTA, delta, &encoded)
    }

    /// Delta against the object `base`, recorded as `oid`
    pub fn add_ref_delta(&mut self, oid: ObjectId, base: ObjectId, delta: &[u8]) -> u64 {
        self.push_entry(oid, REF_DELTA, delta, base.as_bytes())
    }

    pub fn finish(mut self) -> BuiltPack {
        self.data[8..12].copy_from_slice(&self.count.to_be_bytes());
        let checksum: [u8; 20] = Sha1::digest(&self.data).into();
        self.data.extend_from_slice(&checksum);

        self.entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        let mut index = vec![0xff, 0x74, 0x4f, 0x63];
        index.extend_from_slice(&2u32.to_be_bytes());
        for first_byte in 0..=255u8 {
            let count = self
                .entries
                .iter()
                .filter(|(oid, _, _)| oid.as_bytes()[0] <= first_byte)
                .count() as u32;
            index.extend_from_slice(&count.to_be_bytes());
        }
        for (oid, _, _) in &self.entries {
            index.extend_from_slice(oid.as_bytes());
        }
        for (_, _, crc) in &self.entries {
            index.extend_from_slice(&crc.to_be_bytes());
        }
        let mut large = Vec::new();
        for (position, (_, offset, _)) in self.entries.iter().enumerate() {
            if self.large_offsets {
                index.extend_from_slice(&(0x8000_0000u32 | position as u32).to_be_bytes());
                large.extend_from_slice(&offset.to_be_bytes());
            } else {
                index.extend_from_slice(&(*offset as u32).to_be_bytes());
            }
        }
        index.extend(large);
        index.extend_from_slice(&checksum);
        let index_checksum: [u8; 20] = Sha1::digest(&index).into();
        index.extend_from_slice(&index_checksum);

        let hash = checksum.iter().map(|b| format!("{b:02x}")).collect();

        BuiltPack {
            hash,
            pack: self.data,
            index,
        }
    }
}

impl BuiltPack {
    pub async fn write_to(&self, storage: &dyn Storage) {
        storage
            .write_file(&Packs::pack_path(&self.hash), Bytes::from(self.pack.clone()))
            .await
            .expect("Failed to write pack");
        storage
            .write_file(&Packs::index_path(&self.hash), Bytes::from(self.index.clone()))
            .await
            .expect("Failed to write pack index");
    }
}
