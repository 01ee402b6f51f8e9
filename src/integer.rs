//! HPACK prefix integers (RFC 7541 Section 5.1).
//!
//! An integer shares its first octet with a representation's flag bits: the
//! low N bits hold the value if it is below `2^N - 1`, otherwise they are all
//! ones and the remainder follows in 7-bit groups, least significant first,
//! with 0x80 set on every group but the last.

use crate::error::{ConfigError, ProtocolError};

/// Width of the integer prefix, between 1 and 8 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Prefix(u8);

impl Prefix {
    /// Indexed header field, `1xxxxxxx`.
    pub const INDEXED: Prefix = Prefix(7);
    /// Literal with incremental indexing, `01xxxxxx`.
    pub const INCREMENTAL: Prefix = Prefix(6);
    /// Dynamic table size update, `001xxxxx`.
    pub const SIZE_UPDATE: Prefix = Prefix(5);
    /// Literal without indexing / never indexed, `000xxxxx`.
    pub const LITERAL: Prefix = Prefix(4);
    /// String literal length behind the Huffman flag.
    pub const STRING: Prefix = Prefix(7);

    pub fn new(bits: u8) -> Result<Self, ConfigError> {
        if (1..=8).contains(&bits) {
            Ok(Self(bits))
        } else {
            Err(ConfigError::InvalidPrefix(bits))
        }
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Largest value that fits in the prefix alone, `2^N - 1`.
    pub fn max_value(self) -> u64 {
        (1u64 << self.0) - 1
    }
}

/// Append `value` to `dst`, OR-ing `pattern` into the bits above the prefix.
pub fn encode(value: u64, prefix: Prefix, pattern: u8, dst: &mut Vec<u8>) {
    let max = prefix.max_value();
    // Keep the flag bits out of the prefix.
    let pattern = pattern & !(max as u8);

    if value < max {
        dst.push(pattern | value as u8);
        return;
    }

    dst.push(pattern | max as u8);
    let mut remaining = value - max;
    while remaining >= 128 {
        dst.push(0x80 | (remaining & 0x7f) as u8);
        remaining >>= 7;
    }
    dst.push(remaining as u8);
}

/// Decode an integer from the start of `src`.
///
/// Returns the value and the number of octets consumed. Flag bits above the
/// prefix in the first octet are ignored.
pub fn decode(src: &[u8], prefix: Prefix) -> Result<(u64, usize), ProtocolError> {
    let first = *src.first().ok_or(ProtocolError::IntegerTruncated)?;
    let max = prefix.max_value();
    let mut value = u64::from(first) & max;
    if value < max {
        return Ok((value, 1));
    }

    let mut shift = 0u32;
    for (i, &byte) in src[1..].iter().enumerate() {
        let chunk = u64::from(byte & 0x7f);
        if shift > 63 || chunk > (u64::MAX >> shift) {
            return Err(ProtocolError::IntegerOverflow);
        }
        value = value
            .checked_add(chunk << shift)
            .ok_or(ProtocolError::IntegerOverflow)?;
        if byte & 0x80 == 0 {
            return Ok((value, i + 2));
        }
        shift += 7;
    }

    Err(ProtocolError::IntegerTruncated)
}
