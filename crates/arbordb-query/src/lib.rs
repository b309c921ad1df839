//! `ArborDB` Query Execution
//!
//! This crate executes trees of physical operators over groups: tables
//! related by foreign keys whose rows are interleaved depth-first in one
//! ordered key space by their hierarchical keys ([`HKey`](arbordb_core::HKey)).
//!
//! # Overview
//!
//! A caller builds a [`PhysicalOperator`] tree, binds any runtime parameters
//! (index ranges) on an [`Executor`], then pulls rows until the tree is
//! exhausted. Leaf operators read through an [`Adapter`]; interior operators
//! reshape the stream:
//!
//! - **`GroupScan`** - every row of a group in depth-first order
//! - **Select** - drops rows of one type (and their subtrees) failing a predicate
//! - **Flatten** - joins a parent row with each of its child rows
//! - **`IndexScan`** - index entries in index key order, within a bound range
//! - **`IndexLookup`** - turns index entries back into rows, with ancestors
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use arbordb_core::{Catalog, Value};
//! use arbordb_query::{Adapter, Executor, PhysicalOperator, StoreAdapter};
//! use arbordb_storage::backends::RedbEngine;
//!
//! let catalog = Catalog::builder()
//!     .group("coi")
//!     .root_table("coi", "customer", &["cid", "name"], "cid")
//!     .child_table("order", "customer", &["oid", "cid", "salesman"], "oid", "cid")
//!     .build()
//!     .unwrap();
//! let engine = Arc::new(RedbEngine::in_memory().unwrap());
//! let store = StoreAdapter::new(engine, Arc::new(catalog));
//!
//! let customer = store.schema().table_row_type_by_name("customer").unwrap();
//! let order = store.schema().table_row_type_by_name("order").unwrap();
//! store.insert_row(customer.table_id(), vec![Value::Int(1), Value::from("xyz")]).unwrap();
//! store.insert_row(order.table_id(), vec![Value::Int(11), Value::Int(1), Value::from("ori")]).unwrap();
//!
//! let group = store.schema().catalog().group_by_name("coi").unwrap().id;
//! let plan = PhysicalOperator::flatten(PhysicalOperator::group_scan(group), customer, order);
//!
//! let adapter: Arc<dyn Adapter> = Arc::new(store);
//! let rows = Executor::new(&plan, &adapter).unwrap().collect().unwrap();
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].values().len(), 5);
//! ```
//!
//! # Modules
//!
//! - [`exec`] - Cursors, rows, bindings, adapters and the executor
//! - [`plan`] - The physical operator tree
//! - [`error`] - Error types ([`QueryError`])

#![deny(clippy::unwrap_used)]

pub mod error;
pub mod exec;
pub mod plan;

pub use error::{ErrorKind, QueryError, QueryResult};
pub use exec::{
    build_cursor, Adapter, Binding, BindingKey, Bindings, BoxedCursor, BoxedTraversal, CompareOp,
    Comparison, Cursor, CursorState, ExecutionConfig, ExecutionContext, ExecutionStats, Executor,
    IndexBound, IndexKeyRange, OperatorId, Row, RowPredicate, RowType, RowTypeKind, Schema,
    StoreAdapter, Traversal,
};
pub use plan::physical::{
    FlattenNode, GroupScanNode, IndexLookupNode, IndexScanNode, LookupScope, PhysicalOperator,
    SelectNode,
};
