use crate::artifacts::pack::CHECKSUM_SIZE;
use crate::errors::{OdbError, OdbResult};
use byteorder::{ByteOrder, NetworkEndian};
use sha1::{Digest, Sha1};

/// Sequential reader over an index file that hashes everything it hands out
///
/// The trailing self-checksum of an index covers every byte before it, so
/// reading the whole file through this type and then calling [`verify`]
/// checks integrity in one pass.
///
/// [`verify`]: Checksum::verify
#[derive(Debug)]
pub(crate) struct Checksum<'d> {
    data: &'d [u8],
    position: usize,
    digest: Sha1,
    pack: &'d str,
}

impl<'d> Checksum<'d> {
    pub(crate) fn new(pack: &'d str, data: &'d [u8]) -> Self {
        Checksum {
            data,
            position: 0,
            digest: Sha1::new(),
            pack,
        }
    }

    pub(crate) fn read(&mut self, size: usize) -> OdbResult<&'d [u8]> {
        let end = self
            .position
            .checked_add(size)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.corrupt("unexpected end-of-file while reading index"))?;

        let chunk = &self.data[self.position..end];
        self.digest.update(chunk);
        self.position = end;

        Ok(chunk)
    }

    pub(crate) fn read_u32(&mut self) -> OdbResult<u32> {
        Ok(NetworkEndian::read_u32(self.read(4)?))
    }

    pub(crate) fn read_u64(&mut self) -> OdbResult<u64> {
        Ok(NetworkEndian::read_u64(self.read(8)?))
    }

    /// Bytes left before the trailing self-checksum
    pub(crate) fn remaining(&self) -> usize {
        self.data
            .len()
            .saturating_sub(self.position)
            .saturating_sub(CHECKSUM_SIZE)
    }

    /// Compare the digest of everything read so far with the final 20 bytes
    pub(crate) fn verify(self) -> OdbResult<()> {
        if self.data.len() - self.position != CHECKSUM_SIZE {
            return Err(self.corrupt(format!(
                "expected {CHECKSUM_SIZE} trailing checksum bytes, found {}",
                self.data.len() - self.position
            )));
        }

        let expected_checksum = &self.data[self.position..];
        let actual_checksum = self.digest.clone().finalize();

        if expected_checksum != actual_checksum.as_slice() {
            return Err(self.corrupt("checksum does not match value stored on disk"));
        }

        Ok(())
    }

    pub(crate) fn corrupt(&self, reason: impl Into<String>) -> OdbError {
        OdbError::corrupt_index(self.pack, reason)
    }
}
