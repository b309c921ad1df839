//! Core data types for `ArborDB`.
//!
//! This module defines the field value type carried by rows and the
//! identifiers used to name groups, tables and indexes.

mod id;
mod value;

pub use id::{GroupId, IndexId, TableId};
pub use value::Value;
