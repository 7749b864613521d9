//! Stored element kinds and their byte widths

use crate::validation::bounds::{checked_entry_size, packed_bool_bytes};
use crate::Result;
use core::fmt;

/// Element kinds of binary archive entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Booleans packed 64 per little-endian word
    Bool,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// IEEE-754 64-bit float
    Double,
}

impl ElementKind {
    /// Width of one stored element in bytes (one word for booleans)
    pub const fn width(self) -> usize {
        match self {
            ElementKind::Bool => 8,
            ElementKind::Int => 4,
            ElementKind::Long | ElementKind::Double => 8,
        }
    }

    /// Byte length of an entry holding `count` elements of this kind
    pub fn entry_size(self, count: u64) -> Result<u64> {
        match self {
            ElementKind::Bool => Ok(packed_bool_bytes(count)),
            other => checked_entry_size(count, other.width() as u64),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Bool => "bool",
            ElementKind::Int => "int",
            ElementKind::Long => "long",
            ElementKind::Double => "double",
        };
        write!(f, "{name}")
    }
}
