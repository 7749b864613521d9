//! Pull-driven array encoders
//!
//! A pending entry holds a value producer and the element count the index
//! declares for it. When the archive asks for bytes, values are pulled and
//! encoded into a bounded staging buffer; the whole array never exists in
//! memory. A producer that runs dry early or has values left over fails the
//! entry with a size mismatch.

use crate::text::format_double;
use std::io::{self, Read};
use umb_core::validation::checked_entry_size;
use umb_core::{ArrayElement, BitString, ElementKind, Result, UmbError, BOOLS_PER_WORD};

/// Producer of one entry's values
pub enum ArraySource<'a> {
    Bool(Box<dyn Iterator<Item = bool> + 'a>),
    Int(Box<dyn Iterator<Item = i32> + 'a>),
    UInt(Box<dyn Iterator<Item = u32> + 'a>),
    Long(Box<dyn Iterator<Item = u64> + 'a>),
    Double(Box<dyn Iterator<Item = f64> + 'a>),
    /// Fixed-width bit-packed records of `width` bytes each
    Record {
        width: usize,
        values: Box<dyn Iterator<Item = BitString> + 'a>,
    },
    /// Concatenated UTF-8 strings
    Strings(Vec<String>),
}

impl<'a> ArraySource<'a> {
    /// Byte length of `count` elements of this source
    pub fn bytes_for(&self, count: u64) -> Result<u64> {
        match self {
            ArraySource::Bool(_) => ElementKind::Bool.entry_size(count),
            ArraySource::Int(_) | ArraySource::UInt(_) => ElementKind::Int.entry_size(count),
            ArraySource::Long(_) => ElementKind::Long.entry_size(count),
            ArraySource::Double(_) => ElementKind::Double.entry_size(count),
            ArraySource::Record { width, .. } => checked_entry_size(count, *width as u64),
            ArraySource::Strings(strings) => Ok(strings
                .iter()
                .take(count as usize)
                .map(|s| s.len() as u64)
                .sum()),
        }
    }

    /// Render every value as text: `[v,v,...]`, booleans as an unseparated bit run
    pub fn into_text(self) -> String {
        match self {
            ArraySource::Bool(values) => {
                let bits: String = values.map(|b| if b { '1' } else { '0' }).collect();
                format!("[{bits}]")
            }
            ArraySource::Int(values) => join(values.map(|v| v.to_string())),
            ArraySource::UInt(values) => join(values.map(|v| v.to_string())),
            ArraySource::Long(values) => join(values.map(|v| v.to_string())),
            ArraySource::Double(values) => join(values.map(format_double)),
            ArraySource::Record { values, .. } => join(values.map(|record| record.to_string())),
            ArraySource::Strings(strings) => join(strings.into_iter()),
        }
    }
}

fn join(values: impl Iterator<Item = String>) -> String {
    format!("[{}]", values.collect::<Vec<_>>().join(","))
}

/// An array bound to its archive path
pub struct PendingEntry<'a> {
    pub name: String,
    /// Declared element count
    pub count: u64,
    /// Declared byte length
    pub size: u64,
    pub source: ArraySource<'a>,
}

impl<'a> PendingEntry<'a> {
    pub fn new(name: impl Into<String>, count: u64, source: ArraySource<'a>) -> Result<Self> {
        let size = source.bytes_for(count)?;
        Ok(Self {
            name: name.into(),
            count,
            size,
            source,
        })
    }

    /// Byte stream of the encoded array
    pub fn into_stream(self, buffer_size: usize) -> ArrayStream<'a> {
        ArrayStream {
            name: self.name,
            size: self.size,
            remaining: self.count,
            emitted: 0,
            source: self.source,
            staging: Vec::with_capacity(buffer_size),
            buffer_size,
            position: 0,
            drained: false,
        }
    }
}

/// `io::Read` over an array's encoding
pub struct ArrayStream<'a> {
    name: String,
    size: u64,
    remaining: u64,
    emitted: u64,
    source: ArraySource<'a>,
    staging: Vec<u8>,
    buffer_size: usize,
    position: usize,
    drained: bool,
}

impl ArrayStream<'_> {
    fn mismatch(&self, actual: u64) -> io::Error {
        UmbError::SizeMismatch {
            entry: self.name.clone(),
            expected: self.size,
            actual,
        }
        .into_io()
    }

    fn short(&self) -> io::Error {
        let actual = self.source.bytes_for(self.emitted).unwrap_or(0);
        self.mismatch(actual)
    }

    fn refill(&mut self) -> io::Result<()> {
        self.staging.clear();
        self.position = 0;
        while self.staging.len() < self.buffer_size && self.remaining > 0 {
            let taken = match &mut self.source {
                ArraySource::Bool(values) => {
                    let take = self.remaining.min(BOOLS_PER_WORD);
                    let mut word = 0u64;
                    for bit in 0..take {
                        match values.next() {
                            Some(true) => word |= 1 << bit,
                            Some(false) => {}
                            None => {
                                self.emitted += bit;
                                return Err(self.short());
                            }
                        }
                    }
                    word.encode(&mut self.staging);
                    take
                }
                ArraySource::Int(values) => u64::from(encode_next(values, &mut self.staging)),
                ArraySource::UInt(values) => u64::from(encode_next(values, &mut self.staging)),
                ArraySource::Long(values) => u64::from(encode_next(values, &mut self.staging)),
                ArraySource::Double(values) => u64::from(encode_next(values, &mut self.staging)),
                ArraySource::Record { width, values } => match values.next() {
                    Some(record) if record.len() == *width => {
                        self.staging.extend_from_slice(record.as_bytes());
                        1
                    }
                    Some(record) => {
                        return Err(UmbError::SizeMismatch {
                            entry: format!("{} (record {})", self.name, self.emitted),
                            expected: *width as u64,
                            actual: record.len() as u64,
                        }
                        .into_io())
                    }
                    None => 0,
                },
                ArraySource::Strings(strings) => {
                    for string in strings.iter() {
                        self.staging.extend_from_slice(string.as_bytes());
                    }
                    self.remaining
                }
            };
            if taken == 0 {
                return Err(self.short());
            }
            self.emitted += taken;
            self.remaining -= taken;
        }
        if self.remaining == 0 && !self.drained {
            self.drained = true;
            if self.has_leftover() {
                return Err(self.mismatch(self.size + 1));
            }
        }
        Ok(())
    }

    fn has_leftover(&mut self) -> bool {
        match &mut self.source {
            ArraySource::Bool(values) => values.next().is_some(),
            ArraySource::Int(values) => values.next().is_some(),
            ArraySource::UInt(values) => values.next().is_some(),
            ArraySource::Long(values) => values.next().is_some(),
            ArraySource::Double(values) => values.next().is_some(),
            ArraySource::Record { values, .. } => values.next().is_some(),
            ArraySource::Strings(_) => false,
        }
    }
}

fn encode_next<T: ArrayElement>(values: &mut Box<dyn Iterator<Item = T> + '_>, out: &mut Vec<u8>) -> bool {
    match values.next() {
        Some(value) => {
            value.encode(out);
            true
        }
        None => false,
    }
}

impl Read for ArrayStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.position == self.staging.len() {
            self.refill()?;
            if self.staging.is_empty() {
                return Ok(0);
            }
        }
        let available = &self.staging[self.position..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.position += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(entry: PendingEntry<'_>, buffer_size: usize) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        entry
            .into_stream(buffer_size)
            .read_to_end(&mut out)
            .map_err(UmbError::from)?;
        Ok(out)
    }

    #[test]
    fn test_bools_pack_lsb_first_with_zero_padding() {
        let values = vec![true, false, true, true];
        let entry = PendingEntry::new("b", 4, ArraySource::Bool(Box::new(values.into_iter()))).unwrap();
        assert_eq!(entry.size, 8);
        assert_eq!(encode(entry, 64).unwrap(), vec![0b1101, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_bools_span_words() {
        let values = (0..70).map(|i| i == 0 || i == 64 || i == 69);
        let entry = PendingEntry::new("b", 70, ArraySource::Bool(Box::new(values))).unwrap();
        let bytes = encode(entry, 8).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[8], 0b10_0001);
    }

    #[test]
    fn test_small_buffer_streams_everything() {
        let entry = PendingEntry::new("l", 100, ArraySource::Long(Box::new(0..100u64))).unwrap();
        let bytes = encode(entry, 8).unwrap();
        assert_eq!(bytes.len(), 800);
        assert_eq!(u64::decode(&bytes[792..]), 99);
    }

    #[test]
    fn test_short_producer_is_size_mismatch() {
        let entry = PendingEntry::new("d", 3, ArraySource::Double(Box::new(vec![1.0, 2.0].into_iter()))).unwrap();
        match encode(entry, 1024) {
            Err(UmbError::SizeMismatch { expected, actual, .. }) => {
                assert_eq!(expected, 24);
                assert_eq!(actual, 16);
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let entry = PendingEntry::new("b", 65, ArraySource::Bool(Box::new((0..64).map(|_| true)))).unwrap();
        assert!(matches!(encode(entry, 1024), Err(UmbError::SizeMismatch { .. })));
    }

    #[test]
    fn test_long_producer_is_size_mismatch() {
        let entry = PendingEntry::new("i", 2, ArraySource::Int(Box::new(vec![1, 2, 3].into_iter()))).unwrap();
        assert!(matches!(encode(entry, 1024), Err(UmbError::SizeMismatch { .. })));
    }

    #[test]
    fn test_record_width_is_checked() {
        let records = vec![BitString::new(2), BitString::new(3)];
        let entry = PendingEntry::new(
            "v",
            2,
            ArraySource::Record {
                width: 2,
                values: Box::new(records.into_iter()),
            },
        )
        .unwrap();
        assert!(matches!(encode(entry, 1024), Err(UmbError::SizeMismatch { expected: 2, actual: 3, .. })));
    }

    #[test]
    fn test_strings_concatenate() {
        let entry = PendingEntry::new("s", 2, ArraySource::Strings(vec!["ab".into(), "c".into()])).unwrap();
        assert_eq!(entry.size, 3);
        assert_eq!(encode(entry, 1024).unwrap(), b"abc");
    }

    #[test]
    fn test_text_rendering() {
        assert_eq!(ArraySource::Bool(Box::new(vec![true, false].into_iter())).into_text(), "[10]");
        assert_eq!(ArraySource::Int(Box::new(vec![-1, 2].into_iter())).into_text(), "[-1,2]");
        assert_eq!(ArraySource::Double(Box::new(vec![0.5, 2.0].into_iter())).into_text(), "[0.5,2.0]");
        assert_eq!(ArraySource::Strings(vec!["a".into(), "b".into()]).into_text(), "[a,b]");
    }
}
