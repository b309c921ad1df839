//! Redb storage backend.
//!
//! Redb is a pure-Rust embedded database with ACID transactions. All logical
//! tables share one physical redb table; see [`tables`] for the key layout.
//!
//! # In-Memory Databases
//!
//! For tests and benchmarks, an in-memory database does not persist:
//!
//! ```
//! use arbordb_storage::backends::RedbEngine;
//!
//! let engine = RedbEngine::in_memory().unwrap();
//! ```
//!
//! # Configuration
//!
//! ```no_run
//! use arbordb_storage::backends::{RedbConfig, RedbEngine};
//!
//! let config = RedbConfig::new().cache_size(64 * 1024 * 1024);
//! let engine = RedbEngine::open_with_config("arbor.redb", config).unwrap();
//! ```

mod engine;
pub mod tables;
mod transaction;

pub use engine::{RedbConfig, RedbEngine};
pub use transaction::{RedbCursor, RedbTransaction};
