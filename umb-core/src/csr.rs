//! Streaming helpers over CSR arrays
//!
//! Offsets arrive one at a time from a decoder; these adapters turn them
//! into counts or running reductions without materialising the array.

use crate::{Result, UmbError};

/// Turns a stream of CSR offsets into the stream of row lengths
///
/// For offsets `o[0..=n]` the sink receives `o[k+1] - o[k]` for `k < n`.
/// A decreasing offset is skipped and reported by [`OffsetsToCounts::finish`].
pub struct OffsetsToCounts<F> {
    sink: F,
    previous: Option<u64>,
    position: u64,
    first_decrease: Option<u64>,
}

impl<F: FnMut(u64)> OffsetsToCounts<F> {
    pub fn new(sink: F) -> Self {
        Self {
            sink,
            previous: None,
            position: 0,
            first_decrease: None,
        }
    }

    pub fn accept(&mut self, offset: u64) {
        if let Some(previous) = self.previous {
            match offset.checked_sub(previous) {
                Some(count) => (self.sink)(count),
                None => {
                    self.first_decrease.get_or_insert(self.position);
                }
            }
        }
        self.previous = Some(offset);
        self.position += 1;
    }

    /// Fail if any offset was smaller than its predecessor; `what` names the array
    pub fn finish(self, what: &str) -> Result<()> {
        match self.first_decrease {
            Some(position) => Err(UmbError::schema(format!(
                "offsets in \"{what}\" decrease at position {position}"
            ))),
            None => Ok(()),
        }
    }
}

/// Running maximum of a stream
#[derive(Debug, Default, Clone, Copy)]
pub struct Max<T> {
    max: Option<T>,
}

impl<T: PartialOrd + Copy> Max<T> {
    pub fn new() -> Self {
        Self { max: None }
    }

    pub fn accept(&mut self, value: T) {
        if self.max.map_or(true, |max| value > max) {
            self.max = Some(value);
        }
    }

    /// `None` if the stream was empty
    pub fn get(&self) -> Option<T> {
        self.max
    }
}

/// Length of the offsets array for `count` rows, `count + 1`
///
/// `field` names the count in errors; a count at `u64::MAX` is rejected.
pub fn offset_count(field: &str, count: u64) -> Result<u64> {
    count
        .checked_add(1)
        .ok_or_else(|| UmbError::schema(format!("\"{field}\" value {count} is too large")))
}

/// Pair each element with its position in the stream
pub fn indexed<T>(mut sink: impl FnMut(u64, T)) -> impl FnMut(T) {
    let mut position = 0u64;
    move |value| {
        sink(position, value);
        position += 1;
    }
}
