//! Packfile artifacts
//!
//! A pack is an archive of many objects, some stored whole and some stored as
//! deltas against another object. Its companion `.idx` file maps every object
//! id to the byte offset of its entry inside the `.pack` file.
//!
//! - [`pack_index`]: version 2 index parsing and lookups
//! - [`entry_header`]: the variable-length header in front of every entry
//! - [`delta`]: copy/insert instruction streams applied against a base

mod checksum;
pub mod delta;
pub mod entry_header;
pub mod pack_index;

/// Magic bytes opening every version 2 pack index
pub const IDX_SIGNATURE: [u8; 4] = [0xff, 0x74, 0x4f, 0x63];

/// The only pack index version understood here
pub const IDX_VERSION: u32 = 2;

/// Number of slots in the fan-out table
pub const FANOUT_SIZE: usize = 256;

/// SHA-1 checksum trailing packs and indexes
pub const CHECKSUM_SIZE: usize = 20;

/// Offsets with this bit set index into the large (8-byte) offset table
pub const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;
