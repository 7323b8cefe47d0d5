//! Fixed-capacity bit string with positional and field access
//!
//! Protocol codecs assemble message payloads one bit (or one field) at a
//! time as pulses arrive, and unpack them again for encoding. [`BitString`]
//! is the shared store for that: up to 64 bits backed by a single `u64`,
//! with bit position 0 as the least significant bit.

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// A contiguous field of bits within a [`BitString`], defined by its start
/// position (inclusive) and its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    start_bit: usize,
    length: usize,
}

impl Field {
    /// Create a field. The length must be at least one bit.
    pub fn new(start_bit: usize, length: usize) -> Result<Self> {
        if length == 0 {
            return Err(ProtocolError::InvalidArgument(
                "field length must be > 0".into(),
            ));
        }
        Ok(Self { start_bit, length })
    }

    pub fn start_bit(&self) -> usize {
        self.start_bit
    }

    pub fn length(&self) -> usize {
        self.length
    }
}

/// A string of up to 64 bits.
///
/// The string has a current length and grows when bits are set past the end.
/// Bit 0 is the least significant bit of the backing value. Equality and
/// hashing cover both the length and the bit values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitString {
    length: usize,
    bits: u64,
}

impl BitString {
    /// Maximum number of bits a string can hold.
    pub const MAX_LENGTH: usize = 64;

    /// Create an empty bit string.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a string of the given length with all bits cleared.
    pub fn with_length(length: usize) -> Result<Self> {
        Self::check_length(length)?;
        Ok(Self { length, bits: 0 })
    }

    /// Create a string from a raw value and a length.
    pub fn from_value(bits: u64, length: usize) -> Result<Self> {
        Self::check_length(length)?;
        Ok(Self { length, bits })
    }

    fn check_length(length: usize) -> Result<()> {
        if length > Self::MAX_LENGTH {
            return Err(ProtocolError::InvalidArgument(format!(
                "bit string length {} exceeds maximum {}",
                length,
                Self::MAX_LENGTH
            )));
        }
        Ok(())
    }

    /// Current number of bits in the string.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Raw backing value. Bits at positions >= `len()` are zero or stale;
    /// only the first `len()` bits are meaningful.
    pub fn value(&self) -> u64 {
        self.bits
    }

    /// Reset to an empty string.
    pub fn clear(&mut self) {
        self.length = 0;
        self.bits = 0;
    }

    /// Read the bit at `position`. The position must be within the current
    /// length.
    pub fn get_bit(&self, position: usize) -> Result<bool> {
        if position >= self.length {
            return Err(ProtocolError::InvalidArgument(format!(
                "bit position {} outside string of length {}",
                position, self.length
            )));
        }
        Ok((self.bits >> position) & 1 == 1)
    }

    /// Set or clear the bit at `position`, growing the string to
    /// `position + 1` bits if it is currently shorter.
    pub fn set_bit(&mut self, position: usize, value: bool) -> Result<()> {
        if position >= Self::MAX_LENGTH {
            return Err(ProtocolError::InvalidArgument(format!(
                "bit position {} exceeds maximum length {}",
                position,
                Self::MAX_LENGTH
            )));
        }
        if position >= self.length {
            self.length = position + 1;
        }
        let mask = 1u64 << position;
        if value {
            self.bits |= mask;
        } else {
            self.bits &= !mask;
        }
        Ok(())
    }

    /// Append a bit at the most significant end.
    pub fn add_msb(&mut self, bit: bool) -> Result<()> {
        if self.length >= Self::MAX_LENGTH {
            return Err(ProtocolError::InvalidArgument(
                "bit string is already at maximum length".into(),
            ));
        }
        self.set_bit(self.length, bit)
    }

    /// Append a bit at the least significant end, shifting the existing
    /// bits up.
    pub fn add_lsb(&mut self, bit: bool) -> Result<()> {
        if self.length >= Self::MAX_LENGTH {
            return Err(ProtocolError::InvalidArgument(
                "bit string is already at maximum length".into(),
            ));
        }
        self.bits <<= 1;
        self.bits |= bit as u64;
        self.length += 1;
        Ok(())
    }

    /// Shift the whole value right by `positions` bits. Returns whether bit
    /// position 0 was set before the shift.
    pub fn shift_right(&mut self, positions: u32) -> bool {
        let lsb = self.bits & 1 != 0;
        self.bits = if positions >= 64 {
            0
        } else {
            self.bits >> positions
        };
        lsb
    }

    fn check_field(field: Field) -> Result<()> {
        if field.start_bit >= Self::MAX_LENGTH
            || field.start_bit + field.length >= Self::MAX_LENGTH
        {
            return Err(ProtocolError::InvalidArgument(format!(
                "field at bit {} with length {} crosses the {}-bit boundary",
                field.start_bit,
                field.length,
                Self::MAX_LENGTH
            )));
        }
        Ok(())
    }

    /// Extract the field as an unsigned value.
    pub fn extract(&self, field: Field) -> Result<u64> {
        Self::check_field(field)?;
        Ok((self.bits >> field.start_bit) & ((1u64 << field.length) - 1))
    }

    /// Extract the field as a signed value, sign-extending from the top bit
    /// of the field.
    pub fn extract_signed(&self, field: Field) -> Result<i64> {
        let raw = self.extract(field)?;
        let sign_bit = 1u64 << (field.length - 1);
        if raw & sign_bit != 0 {
            Ok((raw | !(sign_bit | (sign_bit - 1))) as i64)
        } else {
            Ok(raw as i64)
        }
    }

    /// Insert a value into the field, growing the string if the field
    /// extends past the current length. Value bits above the field length
    /// are ignored.
    pub fn insert(&mut self, field: Field, value: u64) -> Result<()> {
        Self::check_field(field)?;
        if field.start_bit + field.length > self.length {
            self.length = field.start_bit + field.length;
        }
        let clear_mask = ((1u64 << field.length) - 1) << field.start_bit;
        let value_mask = (value << field.start_bit) & clear_mask;
        self.bits &= !clear_mask;
        self.bits |= value_mask;
        Ok(())
    }

    /// Convert the string to bytes, least significant byte first. Produces
    /// `ceil(len / 8)` bytes via byte-aligned field extraction, so strings
    /// longer than 56 bits cannot be converted (the last byte field would
    /// cross the 64-bit boundary).
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let byte_count = (self.length + 7) / 8;
        let mut result = Vec::with_capacity(byte_count);
        for i in 0..byte_count {
            result.push(self.extract(Field::new(i * 8, 8)?)? as u8);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_validates_length() {
        assert!(BitString::with_length(65).is_err());
        assert!(BitString::with_length(64).is_ok());
        assert!(matches!(
            BitString::from_value(0, 65),
            Err(ProtocolError::InvalidArgument(_))
        ));
    }

    #[test]
    fn constructor_sets_all_zero() {
        let bits = BitString::with_length(64).unwrap();

        assert_eq!(bits.len(), 64);
        for i in 0..64 {
            assert!(!bits.get_bit(i).unwrap());
        }
    }

    #[test]
    fn sets_bit() {
        let mut bits = BitString::with_length(2).unwrap();

        bits.set_bit(1, true).unwrap();
        assert!(!bits.get_bit(0).unwrap());
        assert!(bits.get_bit(1).unwrap());
        bits.set_bit(1, false).unwrap();
        assert!(!bits.get_bit(0).unwrap());
        assert!(!bits.get_bit(1).unwrap());
    }

    #[test]
    fn set_bit_grows_string() {
        let mut bits = BitString::new();

        assert_eq!(bits.len(), 0);
        bits.set_bit(17, false).unwrap();
        assert_eq!(bits.len(), 18);
    }

    #[test]
    fn get_bit_rejects_position_past_length() {
        let bits = BitString::with_length(4).unwrap();
        assert!(bits.get_bit(4).is_err());
    }

    #[test]
    fn add_msb() {
        let mut bits = BitString::with_length(1).unwrap();

        bits.add_msb(true).unwrap();
        assert!(!bits.get_bit(0).unwrap());
        assert!(bits.get_bit(1).unwrap());
        assert_eq!(bits.len(), 2);
    }

    #[test]
    fn add_lsb() {
        let mut bits = BitString::with_length(2).unwrap();
        bits.set_bit(1, true).unwrap();
        bits.add_lsb(true).unwrap();
        assert_eq!(bits.len(), 3);
        assert!(bits.get_bit(0).unwrap());
        assert!(!bits.get_bit(1).unwrap());
        assert!(bits.get_bit(2).unwrap());
    }

    #[test]
    fn append_fails_at_max_length() {
        let mut bits = BitString::with_length(64).unwrap();
        assert!(bits.add_msb(true).is_err());
        assert!(bits.add_lsb(true).is_err());
    }

    #[test]
    fn extracts_integer() {
        let mut bits = BitString::with_length(40).unwrap();
        bits.set_bit(35, true).unwrap();

        assert_eq!(bits.extract(Field::new(35, 5).unwrap()).unwrap(), 1);

        bits.set_bit(37, true).unwrap();
        bits.set_bit(38, true).unwrap();
        assert_eq!(bits.extract(Field::new(30, 6).unwrap()).unwrap(), 32);
    }

    #[test]
    fn inserts_integer() {
        let mut bits = BitString::with_length(50).unwrap();
        bits.insert(Field::new(45, 5).unwrap(), 5).unwrap();

        assert_eq!(bits.extract(Field::new(45, 5).unwrap()).unwrap(), 5);
        assert_eq!(bits.extract(Field::new(40, 10).unwrap()).unwrap(), 5 * 32);
    }

    #[test]
    fn insert_grows_string() {
        let mut bits = BitString::with_length(1).unwrap();
        bits.insert(Field::new(5, 5).unwrap(), 5).unwrap();

        assert_eq!(bits.len(), 10);
        assert_eq!(bits.extract(Field::new(5, 5).unwrap()).unwrap(), 5);
    }

    #[test]
    fn field_rejects_zero_length() {
        assert!(Field::new(0, 0).is_err());
    }

    #[test]
    fn field_operations_reject_boundary_crossing() {
        let mut bits = BitString::with_length(64).unwrap();
        let field = Field::new(56, 8).unwrap();

        assert!(bits.extract(field).is_err());
        assert!(bits.insert(field, 1).is_err());
    }

    #[test]
    fn converts_to_even_bytes() {
        let mut bits = BitString::with_length(1).unwrap();
        bits.insert(Field::new(0, 8).unwrap(), 47).unwrap();
        bits.insert(Field::new(8, 8).unwrap(), 17).unwrap();

        let bytes = bits.to_bytes().unwrap();
        assert_eq!(bytes, vec![47, 17]);
    }

    #[test]
    fn converts_to_part_bytes() {
        let mut bits = BitString::with_length(1).unwrap();
        bits.insert(Field::new(0, 8).unwrap(), 47).unwrap();
        bits.insert(Field::new(8, 2).unwrap(), 2).unwrap();

        let bytes = bits.to_bytes().unwrap();
        assert_eq!(bytes, vec![47, 2]);
    }

    #[test]
    fn equal_works_after_clear() {
        let value = 12345u64;
        let bits1 = BitString::from_value(value, 16).unwrap();
        let mut bits2 = BitString::from_value(1234567, 32).unwrap();

        assert_ne!(bits1, bits2);

        bits2.clear();
        bits2.insert(Field::new(0, 16).unwrap(), value).unwrap();

        assert_eq!(bits1, bits2);
    }

    #[test]
    fn shifts_right() {
        let mut bits = BitString::from_value(64, 8).unwrap();
        bits.shift_right(2);

        assert_eq!(bits.extract(Field::new(0, 8).unwrap()).unwrap(), 16);
    }

    #[test]
    fn shift_right_returns_lsb() {
        let mut bits1 = BitString::from_value(64, 8).unwrap();
        let mut bits2 = BitString::from_value(65, 8).unwrap();

        assert!(!bits1.shift_right(3));
        assert!(bits2.shift_right(3));
    }

    #[test]
    fn extract_is_not_sign_extending() {
        let bits = BitString::from_value(0b1111, 4).unwrap();
        assert_eq!(bits.extract(Field::new(0, 4).unwrap()).unwrap(), 15);
    }

    #[test]
    fn extract_signed_sign_extends() {
        let bits = BitString::from_value(0b1111, 4).unwrap();
        assert_eq!(bits.extract_signed(Field::new(0, 4).unwrap()).unwrap(), -1);

        let bits = BitString::from_value(0b0111, 4).unwrap();
        assert_eq!(bits.extract_signed(Field::new(0, 4).unwrap()).unwrap(), 7);

        let bits = BitString::from_value(0b1000_0000, 12).unwrap();
        assert_eq!(
            bits.extract_signed(Field::new(4, 4).unwrap()).unwrap(),
            -8
        );
    }
}
