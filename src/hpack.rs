//! HPACK: Header Compression for HTTP/2 (RFC 7541)
//!
//! [`HeaderCompressor`] and [`HeaderDecompressor`] each own one direction's
//! dynamic table. The compressor picks a representation per field, steered by
//! an [`EncodePolicy`]; the decompressor replays the same table mutations, so
//! after every block both tables hold identical entries. A decode error
//! breaks that guarantee for good, and the decompressor refuses further input.

use std::fmt;

use crate::error::{ConfigError, ProtocolError};
use crate::integer::{self, Prefix};
use crate::string;
use crate::table::{DynamicTable, HeaderField, HeaderTable, TableMatch, DEFAULT_MAX_TABLE_SIZE};

/// Representation-selection policy consulted once per encoded field.
pub trait EncodePolicy: Send {
    /// Insert the field into the dynamic table (incremental indexing).
    fn should_index(&self, field: &HeaderField) -> bool;

    /// Huffman-code the field's literal strings. Each string, name and value
    /// alike, is still sent raw unless Huffman makes it strictly shorter.
    fn prefer_huffman(&self, field: &HeaderField) -> bool;

    /// Send as "never indexed": never a table reference, never stored, and
    /// intermediaries must keep it literal.
    fn is_sensitive(&self, _field: &HeaderField) -> bool {
        false
    }
}

/// Headers carrying credentials.
const SENSITIVE: [&[u8]; 4] = [b"authorization", b"proxy-authorization", b"cookie", b"set-cookie"];

/// Headers whose values rarely repeat within a connection.
const UNINDEXED: [&[u8]; 8] = [
    b":path",
    b"content-length",
    b"date",
    b"etag",
    b"if-modified-since",
    b"if-none-match",
    b"last-modified",
    b"location",
];

/// Index everything except credentials and per-request values; Huffman-code
/// every string that gets shorter for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

impl EncodePolicy for DefaultPolicy {
    fn should_index(&self, field: &HeaderField) -> bool {
        !UNINDEXED.contains(&field.name()) && !self.is_sensitive(field)
    }

    fn prefer_huffman(&self, _field: &HeaderField) -> bool {
        true
    }

    fn is_sensitive(&self, field: &HeaderField) -> bool {
        SENSITIVE.contains(&field.name())
    }
}

/// The three literal representations (RFC 7541 Section 6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Literal {
    /// `01xxxxxx`: the decoder appends the field to its table.
    Incremental,
    /// `0000xxxx`
    WithoutIndexing,
    /// `0001xxxx`
    NeverIndexed,
}

impl Literal {
    fn pattern(self) -> u8 {
        match self {
            Self::Incremental => 0x40,
            Self::WithoutIndexing => 0x00,
            Self::NeverIndexed => 0x10,
        }
    }

    fn prefix(self) -> Prefix {
        match self {
            Self::Incremental => Prefix::INCREMENTAL,
            Self::WithoutIndexing | Self::NeverIndexed => Prefix::LITERAL,
        }
    }
}

const INDEXED_PATTERN: u8 = 0x80;
const SIZE_UPDATE_PATTERN: u8 = 0x20;

/// Table size changes not yet announced to the peer.
#[derive(Debug, Clone, Copy)]
struct PendingSizeUpdate {
    smallest: usize,
    last: usize,
}

/// HPACK encoder for one direction of a connection.
pub struct HeaderCompressor {
    table: HeaderTable,
    policy: Box<dyn EncodePolicy>,
    size_update: Option<PendingSizeUpdate>,
}

impl fmt::Debug for HeaderCompressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderCompressor")
            .field("table", self.table.dynamic())
            .field("size_update", &self.size_update)
            .finish()
    }
}

impl Default for HeaderCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderCompressor {
    /// Compressor with the protocol's initial 4096-octet table and [`DefaultPolicy`].
    pub fn new() -> Self {
        Self {
            table: HeaderTable::default(),
            policy: Box::new(DefaultPolicy),
            size_update: None,
        }
    }

    /// Compressor that announces `max_size` in its first header block.
    pub fn with_max_table_size(max_size: usize) -> Result<Self, ConfigError> {
        let mut compressor = Self::new();
        if max_size != DEFAULT_MAX_TABLE_SIZE {
            compressor.set_max_table_size(max_size)?;
        }
        Ok(compressor)
    }

    pub fn with_policy(mut self, policy: impl EncodePolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    pub fn set_policy(&mut self, policy: impl EncodePolicy + 'static) {
        self.policy = Box::new(policy);
    }

    pub fn table(&self) -> &DynamicTable {
        self.table.dynamic()
    }

    /// Resize the table now and announce it at the start of the next block.
    ///
    /// If the size dips and rises again before the next block, both the
    /// smallest and the final size are announced so the peer evicts the same
    /// entries we did.
    pub fn set_max_table_size(&mut self, max_size: usize) -> Result<(), ConfigError> {
        crate::config::validate_table_size(max_size)?;
        self.size_update = Some(match self.size_update {
            Some(pending) => PendingSizeUpdate {
                smallest: pending.smallest.min(max_size),
                last: max_size,
            },
            None => PendingSizeUpdate {
                smallest: max_size,
                last: max_size,
            },
        });
        self.table.dynamic_mut().set_max_size(max_size);
        Ok(())
    }

    /// Encode an ordered header list as one header block, appending to `dst`.
    pub fn encode(&mut self, fields: &[HeaderField], dst: &mut Vec<u8>) {
        if let Some(update) = self.size_update.take() {
            if update.smallest < update.last {
                integer::encode(update.smallest as u64, Prefix::SIZE_UPDATE, SIZE_UPDATE_PATTERN, dst);
            }
            integer::encode(update.last as u64, Prefix::SIZE_UPDATE, SIZE_UPDATE_PATTERN, dst);
            tracing::debug!(max_size = update.last, "announced dynamic table size update");
        }
        for field in fields {
            self.encode_field(field, dst);
        }
    }

    fn encode_field(&mut self, field: &HeaderField, dst: &mut Vec<u8>) {
        let sensitive = self.policy.is_sensitive(field);
        let found = self.table.find(field.name(), field.value());

        let name_index = match found {
            TableMatch::Full(index) if !sensitive => {
                integer::encode(index as u64, Prefix::INDEXED, INDEXED_PATTERN, dst);
                return;
            }
            TableMatch::Full(index) | TableMatch::Name(index) => index,
            TableMatch::None => 0,
        };

        let literal = if sensitive {
            Literal::NeverIndexed
        } else if self.policy.should_index(field) {
            Literal::Incremental
        } else {
            Literal::WithoutIndexing
        };
        let huffman = self.policy.prefer_huffman(field);

        integer::encode(name_index as u64, literal.prefix(), literal.pattern(), dst);
        if name_index == 0 {
            write_string(field.name(), huffman, dst);
        }
        write_string(field.value(), huffman, dst);

        if literal == Literal::Incremental {
            self.table.dynamic_mut().insert(field.clone());
        }
    }
}

fn write_string(value: &[u8], huffman: bool, dst: &mut Vec<u8>) {
    if huffman {
        string::encode_auto(value, dst);
    } else {
        string::encode(value, false, dst);
    }
}

/// HPACK decoder for one direction of a connection.
#[derive(Debug, Clone)]
pub struct HeaderDecompressor {
    table: HeaderTable,
    /// Largest table size the peer may switch to (our SETTINGS_HEADER_TABLE_SIZE).
    max_table_size: usize,
    max_header_list_size: Option<usize>,
    poisoned: bool,
}

impl Default for HeaderDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderDecompressor {
    pub fn new() -> Self {
        Self {
            table: HeaderTable::default(),
            max_table_size: DEFAULT_MAX_TABLE_SIZE,
            max_header_list_size: None,
            poisoned: false,
        }
    }

    /// Decompressor accepting table size updates up to `max_size`.
    ///
    /// The table itself starts at the protocol's initial 4096 octets, as the
    /// peer's compressor does, and only changes when the peer announces it.
    pub fn with_max_table_size(max_size: usize) -> Result<Self, ConfigError> {
        crate::config::validate_table_size(max_size)?;
        let mut decompressor = Self::new();
        decompressor.max_table_size = max_size;
        Ok(decompressor)
    }

    pub fn with_max_header_list_size(mut self, limit: usize) -> Self {
        self.max_header_list_size = Some(limit);
        self
    }

    /// Change the limit for future size updates. The table itself only
    /// shrinks when the peer announces it.
    pub fn set_max_table_size(&mut self, max_size: usize) -> Result<(), ConfigError> {
        crate::config::validate_table_size(max_size)?;
        self.max_table_size = max_size;
        Ok(())
    }

    pub fn table(&self) -> &DynamicTable {
        self.table.dynamic()
    }

    /// True once a decode error has desynchronized the table.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Mark the table as out of sync, e.g. when a header block was dropped
    /// without being decoded.
    pub(crate) fn poison(&mut self) {
        self.poisoned = true;
    }

    /// Decode one complete header block into its ordered field list.
    pub fn decode(&mut self, block: &[u8]) -> Result<Vec<HeaderField>, ProtocolError> {
        if self.poisoned {
            return Err(ProtocolError::CompressionStateLost);
        }

        let mut fields = Vec::new();
        if let Err(err) = self.decode_block(block, &mut fields) {
            self.poisoned = true;
            tracing::warn!(error = %err, "header block rejected, compression state lost");
            return Err(err);
        }

        // The table is still in sync here, so this is not fatal for HPACK.
        if let Some(limit) = self.max_header_list_size {
            let size: usize = fields.iter().map(HeaderField::size).sum();
            if size > limit {
                return Err(ProtocolError::HeaderListTooLarge { size, limit });
            }
        }
        Ok(fields)
    }

    fn decode_block(
        &mut self,
        block: &[u8],
        fields: &mut Vec<HeaderField>,
    ) -> Result<(), ProtocolError> {
        let mut pos = 0;
        while pos < block.len() {
            let src = &block[pos..];
            let first = src[0];
            pos += if first & 0x80 != 0 {
                let (index, n) = integer::decode(src, Prefix::INDEXED)?;
                let (name, value) = self.table.get(index)?;
                fields.push(HeaderField::new(name, value));
                n
            } else if first & 0x40 != 0 {
                self.decode_literal(src, Literal::Incremental, fields)?
            } else if first & 0x20 != 0 {
                if !fields.is_empty() {
                    return Err(ProtocolError::MisplacedSizeUpdate);
                }
                self.decode_size_update(src)?
            } else if first & 0x10 != 0 {
                self.decode_literal(src, Literal::NeverIndexed, fields)?
            } else {
                self.decode_literal(src, Literal::WithoutIndexing, fields)?
            };
        }
        Ok(())
    }

    fn decode_size_update(&mut self, src: &[u8]) -> Result<usize, ProtocolError> {
        let (requested, n) = integer::decode(src, Prefix::SIZE_UPDATE)?;
        let size = usize::try_from(requested)
            .ok()
            .filter(|&size| size <= self.max_table_size)
            .ok_or(ProtocolError::TableSizeExceeded {
                requested,
                limit: self.max_table_size,
            })?;
        tracing::debug!(max_size = size, "peer resized dynamic table");
        self.table.dynamic_mut().set_max_size(size);
        Ok(n)
    }

    fn decode_literal(
        &mut self,
        src: &[u8],
        literal: Literal,
        fields: &mut Vec<HeaderField>,
    ) -> Result<usize, ProtocolError> {
        let (name_index, mut pos) = integer::decode(src, literal.prefix())?;
        let name = if name_index == 0 {
            let (name, n) = string::decode(&src[pos..])?;
            pos += n;
            name
        } else {
            self.table.get(name_index)?.0.to_vec()
        };
        let (value, n) = string::decode(&src[pos..])?;
        pos += n;

        let field = HeaderField::new(name, value);
        if literal == Literal::Incremental {
            self.table.dynamic_mut().insert(field.clone());
        }
        fields.push(field);
        Ok(pos)
    }
}

// ============================================================================
// Tests
// ============================================================================
