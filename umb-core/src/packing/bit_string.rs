//! Bit field codec
//!
//! A `BitString` is a fixed-length byte buffer read and written through
//! (bit offset, bit width) windows. Logical bit `i` of a stored value lives
//! in bit `(offset + i) % 8` of byte `(offset + i) / 8`.

use crate::{Result, UmbError};
use core::fmt;

/// Widest signed integer field
pub const MAX_INT_WIDTH: u32 = 32;

/// Unsigned and boolean fields must be strictly narrower than this
pub const UINT_WIDTH_LIMIT: u32 = 32;

/// Width of a double field
pub const DOUBLE_WIDTH: u32 = 64;

const fn low_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Fixed-length buffer of bit-packed fields
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BitString {
    bytes: Vec<u8>,
}

impl BitString {
    /// Zeroed buffer of `num_bytes` bytes
    pub fn new(num_bytes: usize) -> Self {
        Self {
            bytes: vec![0; num_bytes],
        }
    }

    /// Wrap existing bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Length in bits
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8
    }

    /// Store a signed integer in a field of `1..=32` bits
    pub fn set_int(&mut self, offset: usize, width: u32, value: i32) -> Result<()> {
        check_width("int", width, 1, MAX_INT_WIDTH)?;
        let min = -(1i64 << (width - 1));
        let max = (1i64 << (width - 1)) - 1;
        if !(min..=max).contains(&i64::from(value)) {
            return Err(UmbError::encoding(format!(
                "value {value} does not fit a {width}-bit signed field"
            )));
        }
        self.write_bits(offset, width, (i64::from(value) as u64) & low_mask(width))
    }

    /// Read a signed integer from a field of `1..=32` bits, sign-extending
    pub fn get_int(&self, offset: usize, width: u32) -> Result<i32> {
        check_width("int", width, 1, MAX_INT_WIDTH)?;
        let raw = self.read_bits(offset, width)?;
        let sign_bit = 1u64 << (width - 1);
        let extended = if raw & sign_bit != 0 {
            raw | !low_mask(width)
        } else {
            raw
        };
        Ok(extended as i64 as i32)
    }

    /// Store an unsigned integer in a field of `1..32` bits
    pub fn set_uint(&mut self, offset: usize, width: u32, value: u32) -> Result<()> {
        check_width("uint", width, 1, UINT_WIDTH_LIMIT - 1)?;
        if u64::from(value) > low_mask(width) {
            return Err(UmbError::encoding(format!(
                "value {value} does not fit a {width}-bit unsigned field"
            )));
        }
        self.write_bits(offset, width, u64::from(value))
    }

    /// Read an unsigned integer from a field of `1..32` bits
    pub fn get_uint(&self, offset: usize, width: u32) -> Result<u32> {
        check_width("uint", width, 1, UINT_WIDTH_LIMIT - 1)?;
        Ok(self.read_bits(offset, width)? as u32)
    }

    /// Store a double; `width` must be exactly 64
    pub fn set_double(&mut self, offset: usize, width: u32, value: f64) -> Result<()> {
        check_width("double", width, DOUBLE_WIDTH, DOUBLE_WIDTH)?;
        self.write_bits(offset, width, value.to_bits())
    }

    /// Read a double; `width` must be exactly 64
    pub fn get_double(&self, offset: usize, width: u32) -> Result<f64> {
        check_width("double", width, DOUBLE_WIDTH, DOUBLE_WIDTH)?;
        Ok(f64::from_bits(self.read_bits(offset, width)?))
    }

    /// Store a boolean as an unsigned field of `1..32` bits
    pub fn set_bool(&mut self, offset: usize, width: u32, value: bool) -> Result<()> {
        check_width("bool", width, 1, UINT_WIDTH_LIMIT - 1)?;
        self.write_bits(offset, width, u64::from(value))
    }

    /// Read a boolean; any non-zero field value is `true`
    pub fn get_bool(&self, offset: usize, width: u32) -> Result<bool> {
        check_width("bool", width, 1, UINT_WIDTH_LIMIT - 1)?;
        Ok(self.read_bits(offset, width)? != 0)
    }

    /// Render a window as bits, most significant first
    pub fn to_bit_text(&self, offset: usize, width: u32) -> Result<String> {
        self.check_window(offset, width)?;
        Ok((0..width as usize)
            .rev()
            .map(|i| if self.bit(offset + i) { '1' } else { '0' })
            .collect())
    }

    fn bit(&self, position: usize) -> bool {
        self.bytes[position / 8] & (1 << (position % 8)) != 0
    }

    fn check_window(&self, offset: usize, width: u32) -> Result<()> {
        let end = offset.checked_add(width as usize);
        match end {
            Some(end) if end <= self.bit_len() => Ok(()),
            _ => Err(UmbError::encoding(format!(
                "bit window {offset}+{width} exceeds {}-bit buffer",
                self.bit_len()
            ))),
        }
    }

    fn write_bits(&mut self, offset: usize, width: u32, raw: u64) -> Result<()> {
        self.check_window(offset, width)?;
        for i in 0..width as usize {
            let position = offset + i;
            let mask = 1u8 << (position % 8);
            if (raw >> i) & 1 == 1 {
                self.bytes[position / 8] |= mask;
            } else {
                self.bytes[position / 8] &= !mask;
            }
        }
        Ok(())
    }

    fn read_bits(&self, offset: usize, width: u32) -> Result<u64> {
        self.check_window(offset, width)?;
        Ok((0..width as usize)
            .filter(|&i| self.bit(offset + i))
            .fold(0u64, |acc, i| acc | (1u64 << i)))
    }
}

fn check_width(kind: &str, width: u32, min: u32, max: u32) -> Result<()> {
    if width < min || width > max {
        let allowed = if min == max {
            format!("exactly {min}")
        } else {
            format!("{min}..={max}")
        };
        return Err(UmbError::encoding(format!(
            "{kind} field width {width} outside {allowed} bits"
        )));
    }
    Ok(())
}

impl From<Vec<u8>> for BitString {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for position in (0..self.bit_len()).rev() {
            f.write_str(if self.bit(position) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_addressing_is_lsb_first() {
        let mut bits = BitString::new(2);
        bits.set_uint(3, 6, 0b101101).unwrap();
        // bits 3..9: byte 0 holds the low 5 bits at positions 3..8
        assert_eq!(bits.as_bytes(), &[0b0110_1000, 0b0000_0001]);
        assert_eq!(bits.get_uint(3, 6).unwrap(), 0b101101);
    }

    #[test]
    fn test_signed_round_trip_and_sign_extension() {
        let mut bits = BitString::new(8);
        for width in 1..=32u32 {
            let min = (-(1i64 << (width - 1))) as i32;
            let max = ((1i64 << (width - 1)) - 1) as i32;
            for offset in 0..8 {
                bits.set_int(offset, width, min).unwrap();
                assert_eq!(bits.get_int(offset, width).unwrap(), min);
                bits.set_int(offset, width, max).unwrap();
                assert_eq!(bits.get_int(offset, width).unwrap(), max);
            }
        }
    }

    #[test]
    fn test_minimum_value_reads_negative() {
        let mut bits = BitString::new(1);
        bits.set_int(2, 3, -4).unwrap();
        assert_eq!(bits.get_int(2, 3).unwrap(), -4);
        assert_eq!(bits.to_bit_text(2, 3).unwrap(), "100");
    }

    #[test]
    fn test_full_width_int() {
        let mut bits = BitString::new(5);
        bits.set_int(5, 32, i32::MIN).unwrap();
        assert_eq!(bits.get_int(5, 32).unwrap(), i32::MIN);
        bits.set_int(5, 32, -1).unwrap();
        assert_eq!(bits.get_int(5, 32).unwrap(), -1);
    }

    #[test]
    fn test_uint_boundary_is_exclusive() {
        let mut bits = BitString::new(8);
        bits.set_uint(0, 31, (1 << 31) - 1).unwrap();
        assert_eq!(bits.get_uint(0, 31).unwrap(), (1 << 31) - 1);

        assert!(matches!(bits.set_uint(0, 32, 1), Err(UmbError::Encoding(_))));
        assert!(matches!(bits.get_uint(0, 32), Err(UmbError::Encoding(_))));
    }

    #[test]
    fn test_width_bounds() {
        let mut bits = BitString::new(16);
        assert!(matches!(bits.set_int(0, 33, 0), Err(UmbError::Encoding(_))));
        assert!(matches!(bits.set_int(0, 0, 0), Err(UmbError::Encoding(_))));
        assert!(matches!(bits.set_double(0, 32, 1.0), Err(UmbError::Encoding(_))));
        assert!(matches!(bits.get_double(0, 63), Err(UmbError::Encoding(_))));
        assert!(matches!(bits.set_bool(0, 32, true), Err(UmbError::Encoding(_))));
    }

    #[test]
    fn test_values_are_not_truncated() {
        let mut bits = BitString::new(1);
        assert!(matches!(bits.set_uint(0, 3, 8), Err(UmbError::Encoding(_))));
        assert!(matches!(bits.set_int(0, 3, 4), Err(UmbError::Encoding(_))));
        assert!(matches!(bits.set_int(0, 3, -5), Err(UmbError::Encoding(_))));
        assert_eq!(bits.as_bytes(), &[0]);
    }

    #[test]
    fn test_window_outside_buffer() {
        let mut bits = BitString::new(1);
        assert!(matches!(bits.set_uint(6, 3, 1), Err(UmbError::Encoding(_))));
        assert!(matches!(bits.to_bit_text(0, 9), Err(UmbError::Encoding(_))));
    }

    #[test]
    fn test_double_at_odd_offset() {
        let mut bits = BitString::new(9);
        bits.set_double(3, 64, -0.1).unwrap();
        assert_eq!(bits.get_double(3, 64).unwrap(), -0.1);
    }

    #[test]
    fn test_bool_uses_any_nonzero() {
        let mut bits = BitString::new(1);
        bits.set_uint(0, 2, 2).unwrap();
        assert!(bits.get_bool(0, 2).unwrap());
        bits.set_bool(0, 2, false).unwrap();
        assert!(!bits.get_bool(0, 2).unwrap());
    }

    #[test]
    fn test_random_fields_leave_neighbours_intact() {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let width = rng.gen_range(1..=31u32);
            let offset = rng.gen_range(0..8usize);
            let value = rng.gen_range(0..(1u32 << width));
            let mut bits = BitString::from_bytes(vec![0xff; 6]);
            bits.set_uint(offset, width, value).unwrap();
            assert_eq!(bits.get_uint(offset, width).unwrap(), value);
            if offset > 0 {
                assert_eq!(bits.get_uint(0, offset as u32).unwrap(), (1 << offset) - 1);
            }
            let end = offset + width as usize;
            let tail = (48 - end).min(8) as u32;
            assert_eq!(bits.get_uint(end, tail).unwrap(), (1 << tail) - 1);
        }
    }

    #[test]
    fn test_display_is_msb_first() {
        let bits = BitString::from_bytes(vec![0b0000_0001, 0b1000_0000]);
        assert_eq!(bits.to_string(), "1000000000000001");
    }
}
