//! Concrete cursor implementations.
//!
//! # Operator Categories
//!
//! - **Scans**: [`group_scan`], [`index_scan`] - read through the adapter
//! - **Reshaping**: [`select`], [`flatten`] - transform a hierarchical stream
//! - **Reconstruction**: [`index_lookup`] - index rows back to stored rows

pub mod flatten;
pub mod group_scan;
pub mod index_lookup;
pub mod index_scan;
pub mod select;

pub use flatten::FlattenCursor;
pub use group_scan::GroupScanCursor;
pub use index_lookup::IndexLookupCursor;
pub use index_scan::IndexScanCursor;
pub use select::SelectCursor;
