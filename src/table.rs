//! HPACK header tables (RFC 7541 Section 2.3).
//!
//! Indices 1..=61 address the static table; 62 and up address the dynamic
//! table, newest entry first.

use std::collections::VecDeque;
use std::fmt;

use crate::error::{ConfigError, ProtocolError};

/// Per-entry accounting overhead (RFC 7541 Section 4.1).
pub const ENTRY_OVERHEAD: usize = 32;

/// SETTINGS_HEADER_TABLE_SIZE initial value.
pub const DEFAULT_MAX_TABLE_SIZE: usize = 4096;

/// A header name/value pair. Names and values are arbitrary octets.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct HeaderField {
    name: Vec<u8>,
    value: Vec<u8>,
}

impl HeaderField {
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Size counted against the dynamic table: name + value + 32.
    pub fn size(&self) -> usize {
        entry_size(&self.name, &self.value)
    }

    pub fn into_parts(self) -> (Vec<u8>, Vec<u8>) {
        (self.name, self.value)
    }
}

impl fmt::Debug for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            String::from_utf8_lossy(&self.name),
            String::from_utf8_lossy(&self.value)
        )
    }
}

impl<N: Into<Vec<u8>>, V: Into<Vec<u8>>> From<(N, V)> for HeaderField {
    fn from((name, value): (N, V)) -> Self {
        Self::new(name, value)
    }
}

fn entry_size(name: &[u8], value: &[u8]) -> usize {
    name.len() + value.len() + ENTRY_OVERHEAD
}

/// HPACK static table entries (RFC 7541 Appendix A), indexed 1..=61.
pub const STATIC_TABLE: [(&[u8], &[u8]); 61] = [
    (b":authority", b""),
    (b":method", b"GET"),
    (b":method", b"POST"),
    (b":path", b"/"),
    (b":path", b"/index.html"),
    (b":scheme", b"http"),
    (b":scheme", b"https"),
    (b":status", b"200"),
    (b":status", b"204"),
    (b":status", b"206"),
    (b":status", b"304"),
    (b":status", b"400"),
    (b":status", b"404"),
    (b":status", b"500"),
    (b"accept-charset", b""),
    (b"accept-encoding", b"gzip, deflate"),
    (b"accept-language", b""),
    (b"accept-ranges", b""),
    (b"accept", b""),
    (b"access-control-allow-origin", b""),
    (b"age", b""),
    (b"allow", b""),
    (b"authorization", b""),
    (b"cache-control", b""),
    (b"content-disposition", b""),
    (b"content-encoding", b""),
    (b"content-language", b""),
    (b"content-length", b""),
    (b"content-location", b""),
    (b"content-range", b""),
    (b"content-type", b""),
    (b"cookie", b""),
    (b"date", b""),
    (b"etag", b""),
    (b"expect", b""),
    (b"expires", b""),
    (b"from", b""),
    (b"host", b""),
    (b"if-match", b""),
    (b"if-modified-since", b""),
    (b"if-none-match", b""),
    (b"if-range", b""),
    (b"if-unmodified-since", b""),
    (b"last-modified", b""),
    (b"link", b""),
    (b"location", b""),
    (b"max-forwards", b""),
    (b"proxy-authenticate", b""),
    (b"proxy-authorization", b""),
    (b"range", b""),
    (b"referer", b""),
    (b"refresh", b""),
    (b"retry-after", b""),
    (b"server", b""),
    (b"set-cookie", b""),
    (b"strict-transport-security", b""),
    (b"transfer-encoding", b""),
    (b"user-agent", b""),
    (b"vary", b""),
    (b"via", b""),
    (b"www-authenticate", b""),
];

pub const STATIC_TABLE_LEN: usize = STATIC_TABLE.len();

/// Size-bounded FIFO of recently indexed fields, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicTable {
    entries: VecDeque<HeaderField>,
    size: usize,
    max_size: usize,
}

impl Default for DynamicTable {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TABLE_SIZE)
    }
}

impl DynamicTable {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            size: 0,
            max_size,
        }
    }

    /// Current size: sum of entry sizes, always `<= max_size()`.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry by 1-based position within the dynamic table (1 = newest).
    pub fn get(&self, index: usize) -> Option<&HeaderField> {
        index.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Entries from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &HeaderField> {
        self.entries.iter()
    }

    /// Insert `field` as the newest entry, evicting from the oldest end
    /// until it fits. A field larger than `max_size` empties the table and
    /// is not stored.
    pub fn insert(&mut self, field: HeaderField) {
        let needed = field.size();
        if needed > self.max_size {
            tracing::trace!(
                entry_size = needed,
                max_size = self.max_size,
                evicted = self.entries.len(),
                "entry larger than dynamic table, clearing"
            );
            self.entries.clear();
            self.size = 0;
            return;
        }
        self.evict_to(self.max_size - needed);
        self.size += needed;
        self.entries.push_front(field);
    }

    /// Change the size bound, evicting oldest entries to honour it.
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.evict_to(max_size);
    }

    fn evict_to(&mut self, target: usize) {
        let mut evicted = 0usize;
        while self.size > target {
            let Some(oldest) = self.entries.pop_back() else {
                break;
            };
            self.size -= oldest.size();
            evicted += 1;
        }
        if evicted > 0 {
            tracing::trace!(evicted, size = self.size, target, "dynamic table eviction");
        }
    }
}

/// Result of looking a field up in the combined index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMatch {
    /// Name and value both match the entry at this index.
    Full(usize),
    /// Only the name matches the entry at this index.
    Name(usize),
    None,
}

/// Static table plus one direction's dynamic table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderTable {
    dynamic: DynamicTable,
}

impl HeaderTable {
    pub fn new(max_size: usize) -> Result<Self, ConfigError> {
        crate::config::validate_table_size(max_size)?;
        Ok(Self {
            dynamic: DynamicTable::new(max_size),
        })
    }

    pub fn dynamic(&self) -> &DynamicTable {
        &self.dynamic
    }

    pub(crate) fn dynamic_mut(&mut self) -> &mut DynamicTable {
        &mut self.dynamic
    }

    /// Highest valid index right now.
    pub fn max_index(&self) -> usize {
        STATIC_TABLE_LEN + self.dynamic.len()
    }

    /// Resolve an index to `(name, value)`.
    pub fn get(&self, index: u64) -> Result<(&[u8], &[u8]), ProtocolError> {
        let i = usize::try_from(index).map_err(|_| ProtocolError::InvalidIndex(index))?;
        match i {
            0 => Err(ProtocolError::InvalidIndex(index)),
            1..=STATIC_TABLE_LEN => Ok(STATIC_TABLE[i - 1]),
            _ => self
                .dynamic
                .get(i - STATIC_TABLE_LEN)
                .map(|f| (f.name(), f.value()))
                .ok_or(ProtocolError::InvalidIndex(index)),
        }
    }

    /// Find the best entry for `name`/`value`: a full match anywhere beats a
    /// name match; among equals, the lowest index wins.
    pub fn find(&self, name: &[u8], value: &[u8]) -> TableMatch {
        let mut name_match = None;

        for (i, &(n, v)) in STATIC_TABLE.iter().enumerate() {
            if n == name {
                if v == value {
                    return TableMatch::Full(i + 1);
                }
                if name_match.is_none() {
                    name_match = Some(i + 1);
                }
            }
        }

        for (i, field) in self.dynamic.iter().enumerate() {
            if field.name() == name {
                let index = STATIC_TABLE_LEN + i + 1;
                if field.value() == value {
                    return TableMatch::Full(index);
                }
                if name_match.is_none() {
                    name_match = Some(index);
                }
            }
        }

        match name_match {
            Some(index) => TableMatch::Name(index),
            None => TableMatch::None,
        }
    }
}
