//! HPACK string literals (RFC 7541 Section 5.2).
//!
//! `H:1 | length:7+ | octets` where `H` marks the octets as Huffman-coded.

use crate::error::ProtocolError;
use crate::huffman;
use crate::integer::{self, Prefix};

const HUFFMAN_FLAG: u8 = 0x80;

/// Append `value` as a string literal, Huffman-coded if `huffman` is set.
pub fn encode(value: &[u8], huffman: bool, dst: &mut Vec<u8>) {
    if huffman {
        integer::encode(
            huffman::encoded_len(value) as u64,
            Prefix::STRING,
            HUFFMAN_FLAG,
            dst,
        );
        huffman::encode(value, dst);
    } else {
        integer::encode(value.len() as u64, Prefix::STRING, 0, dst);
        dst.extend_from_slice(value);
    }
}

/// Append `value`, Huffman-coded only when that is strictly shorter than raw.
pub fn encode_auto(value: &[u8], dst: &mut Vec<u8>) {
    encode(value, huffman::encoded_len(value) < value.len(), dst);
}

/// Decode a string literal from the start of `src`.
///
/// Returns the decoded octets and the number of input octets consumed.
pub fn decode(src: &[u8]) -> Result<(Vec<u8>, usize), ProtocolError> {
    let first = *src.first().ok_or(ProtocolError::IntegerTruncated)?;
    let (len, header) = integer::decode(src, Prefix::STRING)?;

    let available = src.len() - header;
    let len = match usize::try_from(len) {
        Ok(len) if len <= available => len,
        _ => {
            return Err(ProtocolError::StringTruncated {
                needed: usize::try_from(len).unwrap_or(usize::MAX),
                available,
            })
        }
    };

    let raw = &src[header..header + len];
    let value = if first & HUFFMAN_FLAG != 0 {
        huffman::decode(raw)?
    } else {
        raw.to_vec()
    };
    Ok((value, header + len))
}
