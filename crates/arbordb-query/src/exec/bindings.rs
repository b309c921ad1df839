//! Runtime parameter bindings.
//!
//! A compiled operator tree is re-run with different parameters by binding
//! new values between `close` and the next `open`. Values are keyed either by
//! the identity of the operator that consumes them or by an explicit slot.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use arbordb_core::Value;

use crate::error::{QueryError, QueryResult};

use super::range::IndexKeyRange;

static NEXT_OPERATOR_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a plan node that reads a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperatorId(u64);

impl OperatorId {
    /// Allocates a fresh identity.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_OPERATOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Key of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKey {
    /// Bound to a specific operator.
    Operator(OperatorId),
    /// Bound to a positional slot shared by any operator configured to read it.
    Slot(u32),
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operator(id) => write!(f, "operator {id}"),
            Self::Slot(slot) => write!(f, "slot {slot}"),
        }
    }
}

impl From<OperatorId> for BindingKey {
    fn from(id: OperatorId) -> Self {
        Self::Operator(id)
    }
}

/// A bound value.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// A range over index keys.
    Range(IndexKeyRange),
    /// A scalar argument.
    Value(Value),
}

impl Binding {
    const fn shape(&self) -> &'static str {
        match self {
            Self::Range(_) => "range",
            Self::Value(_) => "value",
        }
    }
}

impl From<IndexKeyRange> for Binding {
    fn from(range: IndexKeyRange) -> Self {
        Self::Range(range)
    }
}

impl From<Value> for Binding {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// The set of bindings for one execution.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: HashMap<BindingKey, Binding>,
}

impl Bindings {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to `key`, replacing any previous binding.
    pub fn set(&mut self, key: impl Into<BindingKey>, value: impl Into<Binding>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Returns the binding for `key`.
    #[must_use]
    pub fn get(&self, key: BindingKey) -> Option<&Binding> {
        self.entries.get(&key)
    }

    /// Returns the range bound to `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Binding`] if `key` holds something other than a range.
    pub fn range(&self, key: BindingKey) -> QueryResult<Option<&IndexKeyRange>> {
        match self.get(key) {
            None => Ok(None),
            Some(Binding::Range(range)) => Ok(Some(range)),
            Some(other) => {
                Err(QueryError::binding(format!("{key} is bound to a {}, expected a range", other.shape())))
            }
        }
    }

    /// Returns the scalar bound to `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Binding`] if `key` holds something other than a value.
    pub fn value(&self, key: BindingKey) -> QueryResult<Option<&Value>> {
        match self.get(key) {
            None => Ok(None),
            Some(Binding::Value(value)) => Ok(Some(value)),
            Some(other) => {
                Err(QueryError::binding(format!("{key} is bound to a {}, expected a value", other.shape())))
            }
        }
    }

    /// Removes the binding for `key`, returning it.
    pub fn remove(&mut self, key: BindingKey) -> Option<Binding> {
        self.entries.remove(&key)
    }

    /// Removes every binding.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
