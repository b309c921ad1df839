//! `ArborDB` Core
//!
//! This crate provides the fundamental types shared by the storage and query
//! layers of `ArborDB`.
//!
//! # Overview
//!
//! `ArborDB` stores tables related by foreign keys (for example
//! customer → order → item) in a single ordered key space. Every row is keyed
//! by its hierarchical key ([`HKey`]), so that walking the key space in byte
//! order visits a parent row, then all of its descendants, then the next
//! sibling.
//!
//! - **Values**: [`Value`], the field value type carried by rows
//! - **Hierarchical keys**: [`HKey`], the ordered, prefix-comparable row key
//! - **Catalog**: [`Catalog`] with [`GroupDef`], [`TableDef`] and [`IndexDef`]
//! - **Identifiers**: [`GroupId`], [`TableId`] and [`IndexId`]
//!
//! # Example
//!
//! ```
//! use arbordb_core::{HKey, TableId, Value};
//!
//! let customer = HKey::from_segments(&[(TableId::new(1), Value::Int(1))]);
//! let order = HKey::from_segments(&[
//!     (TableId::new(1), Value::Int(1)),
//!     (TableId::new(2), Value::Int(11)),
//! ]);
//!
//! // A row's key is a strict byte prefix of each of its descendants' keys.
//! assert!(customer.is_prefix_of(&order));
//! assert!(customer < order);
//! ```
//!
//! # Modules
//!
//! - [`types`] - Values and identifiers
//! - [`encoding`] - Row body and sort-order preserving encodings
//! - [`hkey`] - Hierarchical keys
//! - [`catalog`] - Group, table and index definitions
//! - [`error`] - Error types ([`CoreError`])

// Deny unwrap in library code to ensure proper error handling
#![deny(clippy::unwrap_used)]

pub mod catalog;
pub mod encoding;
pub mod error;
pub mod hkey;
pub mod types;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogBuilder, GroupDef, IndexDef, ParentJoin, TableDef};
pub use error::{CoreError, CoreResult};
pub use hkey::HKey;
pub use types::{GroupId, IndexId, TableId, Value};
