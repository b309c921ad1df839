//! Query execution.
//!
//! This module turns a [`PhysicalOperator`](crate::plan::PhysicalOperator)
//! tree into a tree of [`Cursor`]s and runs it.
//!
//! # Architecture
//!
//! Execution is pull-based: the caller advances the root cursor, which
//! advances its input as needed. Leaf cursors read through an [`Adapter`],
//! which the rest of the tree never sees.
//!
//! # Components
//!
//! - [`Cursor`] - The cursor protocol every operator implements
//! - [`ExecutionContext`] - Bindings, configuration and statistics for a run
//! - [`Row`] / [`RowType`] - Values flowing through the tree, and their types
//! - [`Adapter`] / [`StoreAdapter`] - Storage access
//! - [`Executor`] - Builds and drives a cursor tree

pub mod adapter;
pub mod bindings;
pub mod context;
pub mod executor;
pub mod expression;
pub mod operator;
pub mod operators;
pub mod range;
pub mod row;
pub mod row_type;
pub mod store_adapter;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::{Adapter, BoxedTraversal, Traversal};
pub use bindings::{Binding, BindingKey, Bindings, OperatorId};
pub use context::{ExecutionConfig, ExecutionContext, ExecutionStats};
pub use executor::{build_cursor, Executor};
pub use expression::{CompareOp, Comparison, RowPredicate};
pub use operator::{BoxedCursor, Cursor, CursorBase, CursorState};
pub use range::{IndexBound, IndexKeyRange};
pub use row::Row;
pub use row_type::{RowType, RowTypeKind, Schema};
pub use store_adapter::StoreAdapter;
