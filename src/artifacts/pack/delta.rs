//! Delta instruction streams
//!
//! ```text
//! <base size: varint> <result size: varint> <instruction>*
//!
//! copy    1 sss oooo  [offset bytes selected by o] [size bytes selected by s]
//!                     size 0 means 0x10000
//! insert  0 nnnnnnn   followed by n literal bytes (n in 1..=127)
//! ```
//!
//! An instruction byte of zero is reserved and rejected.

use crate::errors::{OdbError, OdbResult};

const MAX_COPY_SIZE: usize = 0x10000;

/// Apply `delta` to `base`, producing the derived body
pub fn apply(base: &[u8], delta: &[u8]) -> OdbResult<Vec<u8>> {
    let mut position = 0usize;
    let base_size = read_varint(delta, &mut position)?;
    let result_size = read_varint(delta, &mut position)?;

    if base_size != base.len() as u64 {
        return Err(OdbError::corrupt_delta(format!(
            "delta expects a {base_size} byte base, got {}",
            base.len()
        )));
    }
    let result_size = usize::try_from(result_size)
        .map_err(|_| OdbError::corrupt_delta("result size does not fit in memory"))?;

    // each instruction byte emits at most one 64 KiB copy
    let reachable = (delta.len() - position).saturating_mul(MAX_COPY_SIZE);
    if result_size > reachable {
        return Err(OdbError::corrupt_delta(format!(
            "declared {result_size} byte result cannot be produced by {} instruction bytes",
            delta.len() - position
        )));
    }

    let mut result = Vec::with_capacity(result_size.min(base.len().saturating_add(delta.len())));
    while position < delta.len() {
        let command = delta[position];
        position += 1;

        let chunk = match command {
            0 => return Err(OdbError::corrupt_delta("reserved instruction 0")),
            command if command & 0x80 != 0 => {
                let (offset, size) = read_copy(delta, &mut position, command)?;
                offset
                    .checked_add(size)
                    .and_then(|end| base.get(offset..end))
                    .ok_or_else(|| {
                        OdbError::corrupt_delta(format!(
                            "copy of {size} bytes at {offset} exceeds the {} byte base",
                            base.len()
                        ))
                    })?
            }
            size => {
                let end = position + size as usize;
                let literal = delta
                    .get(position..end)
                    .ok_or_else(|| OdbError::corrupt_delta("insert runs past end of delta"))?;
                position = end;
                literal
            }
        };

        if result.len() + chunk.len() > result_size {
            return Err(OdbError::corrupt_delta(format!(
                "delta writes past its declared {result_size} byte result"
            )));
        }
        result.extend_from_slice(chunk);
    }

    if result.len() != result_size {
        return Err(OdbError::corrupt_delta(format!(
            "delta produced {} bytes, declared {result_size}",
            result.len()
        )));
    }

    Ok(result)
}

/// Little-endian base-128 size from the delta prelude
fn read_varint(delta: &[u8], position: &mut usize) -> OdbResult<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;

    loop {
        let byte = *delta
            .get(*position)
            .ok_or_else(|| OdbError::corrupt_delta("truncated delta header"))?;
        *position += 1;

        if shift > 63 {
            return Err(OdbError::corrupt_delta("delta size overflows"));
        }
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
}

/// Offset and size operands of a copy instruction
fn read_copy(delta: &[u8], position: &mut usize, command: u8) -> OdbResult<(usize, usize)> {
    let mut operand = |mask: u8, bytes: u32| -> OdbResult<usize> {
        let mut value = 0usize;
        for index in 0..bytes {
            if command & (mask << index) != 0 {
                let byte = *delta
                    .get(*position)
                    .ok_or_else(|| OdbError::corrupt_delta("truncated copy instruction"))?;
                *position += 1;
                value |= (byte as usize) << (8 * index);
            }
        }
        Ok(value)
    };

    let offset = operand(0x01, 4)?;
    let size = match operand(0x10, 3)? {
        0 => MAX_COPY_SIZE,
        size => size,
    };

    Ok((offset, size))
}
