//! Entry size contracts for the UMB format
//!
//! Pure arithmetic on element counts and byte lengths. Every binary entry's
//! declared length is checked against these before a single element is
//! decoded.

use crate::format::BOOLS_PER_WORD;
use crate::{Result, UmbError};

/// Byte length of `count` booleans packed into 64-bit words
pub const fn packed_bool_bytes(count: u64) -> u64 {
    count.div_ceil(BOOLS_PER_WORD) * 8
}

/// Byte length of `count` fixed-width elements, with overflow protection
pub fn checked_entry_size(count: u64, width: u64) -> Result<u64> {
    count.checked_mul(width).ok_or_else(|| {
        UmbError::schema(format!(
            "{count} elements of {width} bytes exceed the addressable entry size"
        ))
    })
}

/// Compare an entry's declared length with the length implied by metadata
pub fn validate_entry_size(entry: &str, expected: u64, actual: u64) -> Result<()> {
    if expected != actual {
        return Err(UmbError::SizeMismatch {
            entry: entry.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Byte length of a string blob delimited by `offsets`
///
/// Offsets must start at zero and be non-decreasing; the blob length is the
/// final offset (zero for an empty table).
pub fn string_blob_size(entry: &str, offsets: &[u64]) -> Result<u64> {
    if let Some(&first) = offsets.first() {
        if first != 0 {
            return Err(UmbError::schema(format!(
                "string offsets for \"{entry}\" must start at 0, found {first}"
            )));
        }
    }
    if let Some(k) = offsets.windows(2).position(|pair| pair[1] < pair[0]) {
        return Err(UmbError::schema(format!(
            "string offsets for \"{entry}\" decrease at position {}",
            k + 1
        )));
    }
    Ok(offsets.last().copied().unwrap_or(0))
}
