//! Index key ranges.
//!
//! A range bounds the leading columns of an index key on each side. A bound
//! may cover fewer columns than the index has; it then matches every key that
//! begins with the bound's values.

use std::ops::Bound;

use arbordb_core::encoding::{encode_sortable_to, prefix_successor};
use arbordb_core::Value;

/// One side of an [`IndexKeyRange`].
#[derive(Debug, Clone, PartialEq)]
pub struct IndexBound {
    /// Values of the leading index columns.
    pub values: Vec<Value>,
    /// Whether keys equal to `values` lie inside the range.
    pub inclusive: bool,
}

impl IndexBound {
    /// Creates an inclusive bound.
    #[must_use]
    pub fn inclusive(values: Vec<Value>) -> Self {
        Self { values, inclusive: true }
    }

    /// Creates an exclusive bound.
    #[must_use]
    pub fn exclusive(values: Vec<Value>) -> Self {
        Self { values, inclusive: false }
    }

    fn encoded(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for value in &self.values {
            encode_sortable_to(value, &mut buf);
        }
        buf
    }
}

/// A low and high bound over index keys; a missing side is unbounded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexKeyRange {
    /// Lower bound.
    pub low: Option<IndexBound>,
    /// Upper bound.
    pub high: Option<IndexBound>,
}

impl IndexKeyRange {
    /// Creates a range from optional bounds.
    #[must_use]
    pub fn new(low: Option<IndexBound>, high: Option<IndexBound>) -> Self {
        Self { low, high }
    }

    /// The range matching exactly the keys that begin with `values`.
    #[must_use]
    pub fn point(values: Vec<Value>) -> Self {
        Self::new(Some(IndexBound::inclusive(values.clone())), Some(IndexBound::inclusive(values)))
    }

    /// A range with only a lower bound.
    #[must_use]
    pub fn at_least(bound: IndexBound) -> Self {
        Self::new(Some(bound), None)
    }

    /// A range with only an upper bound.
    #[must_use]
    pub fn at_most(bound: IndexBound) -> Self {
        Self::new(None, Some(bound))
    }

    /// The range covering the whole index.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// The number of key columns the widest bound constrains.
    #[must_use]
    pub fn bound_len(&self) -> usize {
        let len = |b: &Option<IndexBound>| b.as_ref().map_or(0, |b| b.values.len());
        len(&self.low).max(len(&self.high))
    }

    /// Translates the range into bounds over encoded index keys.
    ///
    /// Index keys are the sortable encodings of the key columns followed by
    /// the target row's HKey, so a bound on a column prefix must be widened to
    /// cover every key sharing that prefix. Returns `None` if no key can fall
    /// inside the range.
    #[must_use]
    pub fn to_byte_bounds(&self) -> Option<(Bound<Vec<u8>>, Bound<Vec<u8>>)> {
        let low = match &self.low {
            None => Bound::Unbounded,
            Some(b) if b.inclusive => Bound::Included(b.encoded()),
            Some(b) => Bound::Included(prefix_successor(&b.encoded())?),
        };
        let high = match &self.high {
            None => Bound::Unbounded,
            Some(b) if b.inclusive => {
                prefix_successor(&b.encoded()).map_or(Bound::Unbounded, Bound::Excluded)
            }
            Some(b) => Bound::Excluded(b.encoded()),
        };
        Some((low, high))
    }
}
