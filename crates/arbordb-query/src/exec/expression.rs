//! Row predicates for Select.
//!
//! Predicates are opaque to the operators: Select only asks whether a row
//! passes. [`Comparison`] covers the common column-versus-literal case; any
//! `Fn(&Row) -> QueryResult<bool>` closure works as well.

use std::cmp::Ordering;
use std::fmt;

use arbordb_core::Value;

use crate::error::{QueryError, QueryResult};

use super::row::Row;

/// A boolean test over a row.
pub trait RowPredicate: Send + Sync {
    /// Returns whether `row` passes.
    ///
    /// # Errors
    ///
    /// Returns an error if the predicate cannot be applied to `row`.
    fn evaluate(&self, row: &Row) -> QueryResult<bool>;

    /// A short human-readable description, used in plan displays.
    fn describe(&self) -> String {
        "<predicate>".to_owned()
    }
}

impl<F> RowPredicate for F
where
    F: Fn(&Row) -> QueryResult<bool> + Send + Sync,
{
    fn evaluate(&self, row: &Row) -> QueryResult<bool> {
        self(row)
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    const fn holds(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => matches!(ordering, Ordering::Equal),
            Self::Ne => !matches!(ordering, Ordering::Equal),
            Self::Lt => matches!(ordering, Ordering::Less),
            Self::Le => !matches!(ordering, Ordering::Greater),
            Self::Gt => matches!(ordering, Ordering::Greater),
            Self::Ge => !matches!(ordering, Ordering::Less),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        })
    }
}

/// Compares one field of a row with a literal.
///
/// Values that cannot be compared (different types, or null on either side)
/// fail the predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// Position of the field in the row.
    pub field: usize,
    /// The operator.
    pub op: CompareOp,
    /// The literal to compare against.
    pub literal: Value,
}

impl Comparison {
    /// Creates a comparison.
    #[must_use]
    pub fn new(field: usize, op: CompareOp, literal: impl Into<Value>) -> Self {
        Self { field, op, literal: literal.into() }
    }

    /// Creates an equality comparison.
    #[must_use]
    pub fn eq(field: usize, literal: impl Into<Value>) -> Self {
        Self::new(field, CompareOp::Eq, literal)
    }
}

impl RowPredicate for Comparison {
    fn evaluate(&self, row: &Row) -> QueryResult<bool> {
        let value = row.get(self.field).ok_or_else(|| {
            QueryError::usage(format!(
                "field {} out of range for {} with {} fields",
                self.field,
                row.row_type().name(),
                row.values().len()
            ))
        })?;
        if value.is_null() || self.literal.is_null() {
            return Ok(false);
        }
        Ok(value.compare(&self.literal).is_some_and(|ord| self.op.holds(ord)))
    }

    fn describe(&self) -> String {
        format!("${} {} {}", self.field, self.op, self.literal)
    }
}
