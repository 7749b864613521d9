//! Array element type constraints for the UMB format
//!
//! This module defines the trait that constrains what types can be stored
//! as elements of fixed-width binary entries. Encoding is little-endian.

use crate::format::ElementKind;

/// Trait for types that can be stored as fixed-width array elements
///
/// `decode` is given exactly `KIND.width()` bytes.
pub trait ArrayElement: Copy + PartialEq + Sized {
    /// Stored element kind
    const KIND: ElementKind;

    /// Append the little-endian encoding of `self`
    fn encode(self, out: &mut Vec<u8>);

    /// Decode one element
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_array_element {
    ($ty:ty, $kind:expr, $width:literal) => {
        impl ArrayElement for $ty {
            const KIND: ElementKind = $kind;

            fn encode(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn decode(bytes: &[u8]) -> Self {
                let mut buf = [0u8; $width];
                buf.copy_from_slice(&bytes[..$width]);
                <$ty>::from_le_bytes(buf)
            }
        }
    };
}

impl_array_element!(i32, ElementKind::Int, 4);
// Action indices: same bytes as an int, non-negative by construction
impl_array_element!(u32, ElementKind::Int, 4);
impl_array_element!(i64, ElementKind::Long, 8);
// Offsets and targets
impl_array_element!(u64, ElementKind::Long, 8);
impl_array_element!(f64, ElementKind::Double, 8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths_match_kinds() {
        assert_eq!(i32::KIND.width(), 4);
        assert_eq!(u64::KIND.width(), 8);
        assert_eq!(f64::KIND, ElementKind::Double);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut out = Vec::new();
        0x0102_0304i32.encode(&mut out);
        1u64.encode(&mut out);
        assert_eq!(out, vec![4, 3, 2, 1, 1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(i32::decode(&out[..4]), 0x0102_0304);
        assert_eq!(u64::decode(&out[4..]), 1);
    }

    #[test]
    fn test_negative_and_float_values() {
        let mut out = Vec::new();
        (-2i32).encode(&mut out);
        assert_eq!(out, vec![0xFE, 0xFF, 0xFF, 0xFF]);

        let mut out = Vec::new();
        0.25f64.encode(&mut out);
        assert_eq!(f64::decode(&out), 0.25);
    }
}
