//! Hierarchical keys.
//!
//! An [`HKey`] names a row's position in its table hierarchy: the sequence of
//! `(table, key value)` segments from the group root down to the row. Each
//! segment is encoded as the table ordinal (2 bytes, big-endian) followed by
//! the [sortable](crate::encoding::sortable) encoding of the key value.
//!
//! Two properties follow from the encoding and are relied on throughout the
//! query engine:
//!
//! - a row is a descendant of another iff the other's key bytes are a strict
//!   byte prefix of its own ([`HKey::is_prefix_of`]);
//! - iterating keys in byte order visits rows in depth-first preorder.

use std::fmt;

use crate::encoding::sortable::{decode_sortable_prefix, encode_sortable_to};
use crate::error::{CoreError, CoreResult};
use crate::types::{TableId, Value};

const ORDINAL_LEN: usize = 2;

/// A hierarchical row key.
///
/// Ordering, equality and hashing follow the encoded bytes. `boundaries` is
/// derived from `bytes` and never disagrees with it.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HKey {
    bytes: Vec<u8>,
    /// End offset of each segment.
    boundaries: Vec<usize>,
}

impl HKey {
    /// Creates an empty key (depth 0).
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new(), boundaries: Vec::new() }
    }

    /// Builds a key from root-first segments.
    #[must_use]
    pub fn from_segments(segments: &[(TableId, Value)]) -> Self {
        let mut key = Self::new();
        for (table, value) in segments {
            key.push_segment(*table, value);
        }
        key
    }

    /// Appends a segment, making this the key of a child row.
    pub fn push_segment(&mut self, table: TableId, value: &Value) {
        self.bytes.extend_from_slice(&table.as_u16().to_be_bytes());
        encode_sortable_to(value, &mut self.bytes);
        self.boundaries.push(self.bytes.len());
    }

    /// Decodes a key from its stored bytes, recovering segment boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Encoding`] if the bytes are not a sequence of
    /// well-formed segments.
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let mut key = Self::new();
        key.reset_from_bytes(bytes)?;
        Ok(key)
    }

    /// Overwrites this key in place with `bytes`, reusing its allocations.
    ///
    /// On error the key is left empty.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Encoding`] if the bytes are malformed.
    pub fn reset_from_bytes(&mut self, bytes: &[u8]) -> CoreResult<()> {
        self.bytes.clear();
        self.boundaries.clear();
        let mut offset = 0;
        while offset < bytes.len() {
            if bytes.len() - offset < ORDINAL_LEN {
                self.boundaries.clear();
                return Err(CoreError::Encoding(format!(
                    "truncated hkey segment at offset {offset}"
                )));
            }
            match decode_sortable_prefix(&bytes[offset + ORDINAL_LEN..]) {
                Ok((_, used)) => {
                    offset += ORDINAL_LEN + used;
                    self.boundaries.push(offset);
                }
                Err(e) => {
                    self.boundaries.clear();
                    return Err(e);
                }
            }
        }
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    /// Returns the encoded key.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the key, returning its encoded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.boundaries.len()
    }

    /// Returns true if the key has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    fn segment_start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.boundaries[depth - 1]
        }
    }

    /// Table of the segment at `depth` (0 is the root).
    #[must_use]
    pub fn table_at(&self, depth: usize) -> Option<TableId> {
        if depth >= self.depth() {
            return None;
        }
        let start = self.segment_start(depth);
        let raw = [self.bytes[start], self.bytes[start + 1]];
        Some(TableId::new(u16::from_be_bytes(raw)))
    }

    /// Table of the last segment, i.e. the table the keyed row belongs to.
    #[must_use]
    pub fn last_table(&self) -> Option<TableId> {
        self.depth().checked_sub(1).and_then(|d| self.table_at(d))
    }

    /// Key value of the segment at `depth`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Encoding`] if the segment cannot be decoded.
    pub fn value_at(&self, depth: usize) -> CoreResult<Option<Value>> {
        if depth >= self.depth() {
            return Ok(None);
        }
        let start = self.segment_start(depth) + ORDINAL_LEN;
        let (value, _) = decode_sortable_prefix(&self.bytes[start..self.boundaries[depth]])?;
        Ok(Some(value))
    }

    /// Decodes every segment, root first.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Encoding`] if a segment cannot be decoded.
    pub fn segments(&self) -> CoreResult<Vec<(TableId, Value)>> {
        (0..self.depth())
            .map(|d| {
                let table = self.table_at(d).ok_or_else(|| {
                    CoreError::Encoding(format!("missing hkey segment at depth {d}"))
                })?;
                let value = self.value_at(d)?.unwrap_or(Value::Null);
                Ok((table, value))
            })
            .collect()
    }

    /// Shortens the key to its first `depth` segments. No-op if `depth` is not
    /// smaller than the current depth.
    pub fn truncate(&mut self, depth: usize) {
        if depth < self.depth() {
            let end = self.segment_start(depth);
            self.bytes.truncate(end);
            self.boundaries.truncate(depth);
        }
    }

    /// Key of the ancestor at `depth` segments, or `None` if `depth` is not
    /// strictly smaller than this key's depth.
    #[must_use]
    pub fn ancestor(&self, depth: usize) -> Option<Self> {
        if depth >= self.depth() {
            return None;
        }
        let mut key = self.snapshot();
        key.truncate(depth);
        Some(key)
    }

    /// Returns true if `self` is a strict byte prefix of `other`, i.e. `other`
    /// keys a descendant of the row keyed by `self`.
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.bytes.len() < other.bytes.len() && other.bytes.starts_with(&self.bytes)
    }

    /// Depth of the segment belonging to `table`, if the table lies on this
    /// key's path.
    #[must_use]
    pub fn position_of(&self, table: TableId) -> Option<usize> {
        (0..self.depth()).find(|&d| self.table_at(d) == Some(table))
    }

    /// Takes an independent copy of this key.
    ///
    /// Traversals reuse a single key buffer per position; anything that keeps
    /// a key past the next advance must snapshot it.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        Self { bytes: self.bytes.clone(), boundaries: self.boundaries.clone() }
    }
}

impl fmt::Display for HKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for d in 0..self.depth() {
            if d > 0 {
                f.write_str(",")?;
            }
            match (self.table_at(d), self.value_at(d)) {
                (Some(table), Ok(Some(value))) => write!(f, "{table},{value}")?,
                _ => f.write_str("?")?,
            }
        }
        f.write_str("}")
    }
}

impl fmt::Debug for HKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HKey{self}")
    }
}
