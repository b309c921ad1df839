//! Physical operator trees.
//!
//! A [`PhysicalOperator`] is a closed set of operator variants, each holding
//! its static parameters and its inputs. Building a tree has no side effects;
//! [`build_cursor`](crate::exec::build_cursor) turns it into runnable cursors.
//!
//! # Operators
//!
//! - **Leaves**: `GroupScan`, `IndexScan`
//! - **Unary**: `Select`, `Flatten`, `IndexLookup`
//!
//! # Example
//!
//! ```ignore
//! let scan = PhysicalOperator::index_scan(IndexScanNode::new(salesman_index).require_range());
//! let plan = PhysicalOperator::index_lookup(scan, IndexLookupNode::new(group, vec![customer]));
//! println!("{}", plan.display_tree());
//! ```

mod node;

pub use node::{
    DisplayTree, FlattenNode, GroupScanNode, IndexLookupNode, IndexScanNode, LookupScope,
    PhysicalOperator, SelectNode,
};
