//! Flat bit streams and arbitrary-precision signal values.
//!
//! Chain contents leave the device as a stream of shift words. [`BitString`]
//! holds that stream in shift order and slices it into per-signal values.
//! Signal values are [`BigUint`]s, since many signals are wider than a machine
//! word.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Word;

/// A sequence of bits in shift order, packed for efficient storage.
///
/// Index 0 is the first bit shifted out of the device. Within every signal,
/// the first bit is the most significant one.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BitString {
    len: usize,
    /// Packed storage: 64 bits per word, bit `i` at position `i % 64`.
    data: Vec<u64>,
}

/// Number of bits packed per storage word.
const BITS_PER_WORD: usize = 64;

impl BitString {
    /// Creates an empty bit string.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty bit string with room for `len` bits.
    pub fn with_capacity(len: usize) -> Self {
        Self {
            len: 0,
            data: Vec::with_capacity(len.div_ceil(BITS_PER_WORD)),
        }
    }

    /// Returns the number of bits.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the bit string holds no bits.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Gets the bit at the given index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn get(&self, index: usize) -> bool {
        assert!(
            index < self.len,
            "index {index} out of bounds for length {}",
            self.len
        );
        (self.data[index / BITS_PER_WORD] >> (index % BITS_PER_WORD)) & 1 != 0
    }

    /// Appends one bit.
    pub fn push(&mut self, bit: bool) {
        let word_idx = self.len / BITS_PER_WORD;
        if word_idx == self.data.len() {
            self.data.push(0);
        }
        if bit {
            self.data[word_idx] |= 1 << (self.len % BITS_PER_WORD);
        }
        self.len += 1;
    }

    /// Appends the low `width` bits of a device word, most significant first.
    ///
    /// Positions above the word are zero.
    pub fn push_word(&mut self, word: Word, width: u32) {
        for i in (0..width).rev() {
            self.push(word.checked_shr(i).unwrap_or(0) & 1 != 0);
        }
    }

    /// Appends `value` as a `width`-bit field, most significant bit first.
    ///
    /// Bits of `value` above `width` are dropped.
    pub fn push_value(&mut self, value: &BigUint, width: usize) {
        for i in (0..width).rev() {
            self.push(value.bit(i as u64));
        }
    }

    /// Appends `width` zero bits.
    pub fn push_zeros(&mut self, width: usize) {
        for _ in 0..width {
            self.push(false);
        }
    }

    /// Builds a bit string from shift words, keeping the low `width` bits of each.
    pub fn from_words(words: &[Word], width: u32) -> Self {
        let mut bits = Self::with_capacity(words.len() * width as usize);
        for &word in words {
            bits.push_word(word, width);
        }
        bits
    }

    /// Packs the bit string back into shift words of `width` bits.
    ///
    /// Returns `None` if the length is not a multiple of `width`.
    pub fn to_words(&self, width: u32) -> Option<Vec<Word>> {
        let width = width as usize;
        if width == 0 || self.len % width != 0 {
            return None;
        }
        let words = (0..self.len / width)
            .map(|w| {
                (0..width).fold(0 as Word, |acc, i| {
                    (acc << 1) | Word::from(self.get(w * width + i))
                })
            })
            .collect();
        Some(words)
    }

    /// Interprets `width` bits starting at `start` as a big-endian unsigned integer.
    ///
    /// Returns `None` if the range runs past the end of the bit string.
    pub fn value_at(&self, start: usize, width: usize) -> Option<BigUint> {
        let end = start.checked_add(width)?;
        if end > self.len {
            return None;
        }
        let digits: Vec<u8> = (start..end).map(|i| u8::from(self.get(i))).collect();
        Some(BigUint::from_radix_be(&digits, 2).unwrap_or_default())
    }

    /// Parses a string of `'0'` and `'1'` characters in shift order.
    ///
    /// Whitespace is ignored. Returns `None` on any other character.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let mut bits = Self::with_capacity(s.len());
        for c in s.chars().filter(|c| !c.is_whitespace()) {
            match c {
                '0' => bits.push(false),
                '1' => bits.push(true),
                _ => return None,
            }
        }
        Some(bits)
    }
}

impl fmt::Display for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len {
            f.write_str(if self.get(i) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl fmt::Debug for BitString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitString({self})")
    }
}

/// Assembles a value from device words, least significant word first.
pub fn from_words_le(words: &[Word]) -> BigUint {
    BigUint::from_slice(words)
}

/// Extracts the `width`-bit field of `value` starting at bit `offset`.
pub fn extract_field(value: &BigUint, offset: usize, width: usize) -> BigUint {
    if width == 0 {
        return BigUint::zero();
    }
    let mask = (BigUint::one() << width) - 1u32;
    (value >> offset) & mask
}

/// Formats a value as lowercase hexadecimal without a prefix.
pub fn to_hex(value: &BigUint) -> String {
    value.to_str_radix(16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_get() {
        let mut b = BitString::new();
        b.push(true);
        b.push(false);
        b.push(true);
        assert_eq!(b.len(), 3);
        assert!(b.get(0));
        assert!(!b.get(1));
        assert!(b.get(2));
    }

    #[test]
    fn push_word_is_msb_first() {
        let mut b = BitString::new();
        b.push_word(0b0011, 4);
        assert_eq!(format!("{b}"), "0011");
    }

    #[test]
    fn push_word_wider_than_word_pads_with_zeros() {
        let mut b = BitString::new();
        b.push_word(0x8000_0001, 36);
        assert_eq!(b.len(), 36);
        assert_eq!(format!("{b}"), format!("0000{:032b}", 0x8000_0001u32));
    }

    #[test]
    fn from_words_keeps_low_bits() {
        let b = BitString::from_words(&[0xFFFF_FF05, 0x3], 4);
        assert_eq!(format!("{b}"), "01010011");
    }

    #[test]
    fn to_words_inverts_from_words() {
        let words = [0xDEAD_BEEF, 0x0123_4567];
        let b = BitString::from_words(&words, 32);
        assert_eq!(b.to_words(32).unwrap(), words);
    }

    #[test]
    fn to_words_rejects_partial_word() {
        let b = BitString::from_binary_str("101").unwrap();
        assert!(b.to_words(2).is_none());
        assert!(b.to_words(0).is_none());
    }

    #[test]
    fn value_at_big_endian() {
        let b = BitString::from_binary_str("00110101").unwrap();
        assert_eq!(b.value_at(0, 4).unwrap(), BigUint::from(3u32));
        assert_eq!(b.value_at(4, 4).unwrap(), BigUint::from(5u32));
    }

    #[test]
    fn value_at_out_of_range() {
        let b = BitString::from_binary_str("0011").unwrap();
        assert!(b.value_at(2, 3).is_none());
        assert!(b.value_at(usize::MAX, 2).is_none());
    }

    #[test]
    fn value_at_zero_width() {
        let b = BitString::from_binary_str("1").unwrap();
        assert_eq!(b.value_at(1, 0).unwrap(), BigUint::zero());
    }

    #[test]
    fn wide_value_spanning_storage_words() {
        let mut b = BitString::new();
        let value = (BigUint::one() << 100) + 7u32;
        b.push_zeros(3);
        b.push_value(&value, 101);
        assert_eq!(b.len(), 104);
        assert_eq!(b.value_at(3, 101).unwrap(), value);
    }

    #[test]
    fn from_binary_str_invalid() {
        assert!(BitString::from_binary_str("10x1").is_none());
    }

    #[test]
    fn from_binary_str_ignores_whitespace() {
        let b = BitString::from_binary_str("0011 0101\n").unwrap();
        assert_eq!(b.len(), 8);
    }

    #[test]
    fn words_le_assembly() {
        let v = from_words_le(&[0x1, 0x2]);
        assert_eq!(v, (BigUint::from(2u32) << 32) + 1u32);
    }

    #[test]
    fn field_extraction() {
        let v = BigUint::from(0b1011_0110u32);
        assert_eq!(extract_field(&v, 0, 3), BigUint::from(0b110u32));
        assert_eq!(extract_field(&v, 3, 5), BigUint::from(0b10110u32));
        assert_eq!(extract_field(&v, 4, 0), BigUint::zero());
    }

    #[test]
    fn hex_format() {
        assert_eq!(to_hex(&BigUint::zero()), "0");
        assert_eq!(to_hex(&BigUint::from(0xABCu32)), "abc");
    }

    #[test]
    fn serde_roundtrip() {
        let b = BitString::from_binary_str("1001101").unwrap();
        let json = serde_json::to_string(&b).unwrap();
        let back: BitString = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }
}
