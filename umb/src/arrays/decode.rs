//! Push-driven array decoders
//!
//! Each decoder first checks the entry's declared length against the length
//! implied by the element count, then reads one element (or one 64-bit word
//! of booleans) at a time and hands it to the consumer.

use crate::archive::EntryReader;
use umb_core::validation::{checked_entry_size, string_blob_size, validate_entry_size};
use umb_core::{ArrayElement, BitString, ElementKind, Result, UmbError, BOOLS_PER_WORD};

/// Decode `count` fixed-width elements
pub fn read_elements<T: ArrayElement>(
    entry: &mut EntryReader<'_>,
    count: u64,
    mut sink: impl FnMut(T),
) -> Result<()> {
    validate_entry_size(entry.name(), T::KIND.entry_size(count)?, entry.size())?;
    let width = T::KIND.width();
    let mut buf = [0u8; 8];
    for _ in 0..count {
        entry.read_exact_chunk(&mut buf[..width])?;
        sink(T::decode(&buf[..width]));
    }
    Ok(())
}

/// Collect `count` fixed-width elements
pub fn read_all<T: ArrayElement>(entry: &mut EntryReader<'_>, count: u64) -> Result<Vec<T>> {
    let mut values = Vec::with_capacity(count.min(1 << 20) as usize);
    read_elements(entry, count, |value| values.push(value))?;
    Ok(values)
}

fn read_words(
    entry: &mut EntryReader<'_>,
    count: u64,
    mut sink: impl FnMut(u64, u64, u64),
) -> Result<()> {
    validate_entry_size(entry.name(), ElementKind::Bool.entry_size(count)?, entry.size())?;
    let mut buf = [0u8; 8];
    let mut base = 0u64;
    while base < count {
        entry.read_exact_chunk(&mut buf)?;
        let bits = (count - base).min(BOOLS_PER_WORD);
        sink(base, u64::decode(&buf), bits);
        base += bits;
    }
    Ok(())
}

/// Decode `count` packed booleans
pub fn read_bools(entry: &mut EntryReader<'_>, count: u64, mut sink: impl FnMut(bool)) -> Result<()> {
    read_words(entry, count, |_, word, bits| {
        for bit in 0..bits {
            sink((word >> bit) & 1 == 1);
        }
    })
}

/// Decode `count` packed booleans, emitting only the indices of set bits
pub fn read_bool_indices(entry: &mut EntryReader<'_>, count: u64, mut sink: impl FnMut(u64)) -> Result<()> {
    read_words(entry, count, |base, word, bits| {
        let mut set = if bits == BOOLS_PER_WORD {
            word
        } else {
            word & ((1u64 << bits) - 1)
        };
        while set != 0 {
            sink(base + u64::from(set.trailing_zeros()));
            set &= set - 1;
        }
    })
}

/// Decode `count` records of `width` bytes
pub fn read_records(
    entry: &mut EntryReader<'_>,
    count: u64,
    width: usize,
    mut sink: impl FnMut(BitString),
) -> Result<()> {
    validate_entry_size(entry.name(), checked_entry_size(count, width as u64)?, entry.size())?;
    for _ in 0..count {
        let mut record = vec![0u8; width];
        entry.read_exact_chunk(&mut record)?;
        sink(BitString::from_bytes(record));
    }
    Ok(())
}

/// Decode the strings of a blob delimited by `offsets`
pub fn read_strings(entry: &mut EntryReader<'_>, offsets: &[u64], mut sink: impl FnMut(String)) -> Result<()> {
    let blob_size = string_blob_size(entry.name(), offsets)?;
    validate_entry_size(entry.name(), blob_size, entry.size())?;
    for pair in offsets.windows(2) {
        let mut bytes = vec![0u8; (pair[1] - pair[0]) as usize];
        entry.read_exact_chunk(&mut bytes)?;
        let text = String::from_utf8(bytes).map_err(|err| {
            UmbError::schema(format!("string in \"{}\" is not UTF-8: {err}", entry.name()))
        })?;
        sink(text);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveReader, ArchiveWriter};
    use crate::config::ExportConfig;
    use std::io::Cursor;

    fn archive_with(name: &str, bytes: &[u8]) -> ArchiveReader {
        let mut writer = ArchiveWriter::new(Vec::new(), &ExportConfig::uncompressed()).unwrap();
        writer.write_entry(name, bytes.len() as u64, bytes).unwrap();
        let data = writer.finish().unwrap();
        ArchiveReader::from_reader(Cursor::new(data)).unwrap()
    }

    fn longs(values: &[u64]) -> Vec<u8> {
        let mut out = Vec::new();
        for value in values {
            value.encode(&mut out);
        }
        out
    }

    #[test]
    fn test_read_elements() {
        let archive = archive_with("t.bin", &longs(&[4, 0, 2]));
        let values = archive
            .find_entry("t.bin", |mut entry| read_all::<u64>(&mut entry, 3))
            .unwrap();
        assert_eq!(values, vec![4, 0, 2]);
    }

    #[test]
    fn test_size_mismatch_before_any_element() {
        let archive = archive_with("t.bin", &longs(&[4, 0, 2]));
        let mut seen = 0;
        let result = archive.find_entry("t.bin", |mut entry| {
            read_elements::<u64>(&mut entry, 4, |_| seen += 1)
        });
        match result {
            Err(UmbError::SizeMismatch {
                entry,
                expected,
                actual,
            }) => {
                assert_eq!(entry, "t.bin");
                assert_eq!((expected, actual), (32, 24));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(seen, 0);
    }

    #[test]
    fn test_read_bools_and_indices() {
        let mut word = [0u8; 16];
        word[0] = 0b0000_0101;
        word[8] = 0b0000_0010;
        let mut dense = Vec::new();
        archive_with("b.bin", &word)
            .find_entry("b.bin", |mut entry| read_bools(&mut entry, 66, |b| dense.push(b)))
            .unwrap();
        assert_eq!(dense.len(), 66);
        assert!(dense[0] && dense[2] && dense[65]);
        assert_eq!(dense.iter().filter(|b| **b).count(), 3);

        let mut sparse = Vec::new();
        archive_with("b.bin", &word)
            .find_entry("b.bin", |mut entry| read_bool_indices(&mut entry, 66, |i| sparse.push(i)))
            .unwrap();
        assert_eq!(sparse, vec![0, 2, 65]);
    }

    #[test]
    fn test_bool_indices_ignore_padding_bits() {
        let word = u64::MAX.to_le_bytes();
        let mut sparse = Vec::new();
        archive_with("b.bin", &word)
            .find_entry("b.bin", |mut entry| read_bool_indices(&mut entry, 3, |i| sparse.push(i)))
            .unwrap();
        assert_eq!(sparse, vec![0, 1, 2]);
    }

    #[test]
    fn test_read_strings() {
        let mut strings = Vec::new();
        archive_with("s.bin", b"northsouth")
            .find_entry("s.bin", |mut entry| {
                read_strings(&mut entry, &[0, 5, 5, 10], |s| strings.push(s))
            })
            .unwrap();
        assert_eq!(strings, vec!["north", "", "south"]);

        let result = archive_with("s.bin", b"north")
            .find_entry("s.bin", |mut entry| read_strings(&mut entry, &[0, 4], |_| {}));
        assert!(matches!(result, Err(UmbError::SizeMismatch { .. })));
    }

    #[test]
    fn test_read_records() {
        let mut records = Vec::new();
        archive_with("v.bin", &[1, 2, 3, 4])
            .find_entry("v.bin", |mut entry| read_records(&mut entry, 2, 2, |r| records.push(r)))
            .unwrap();
        assert_eq!(records[1].as_bytes(), &[3, 4]);
    }
}
