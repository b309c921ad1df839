//! `ArborDB` Storage
//!
//! This crate provides the ordered key-value storage abstraction that
//! `ArborDB` groups and indexes are laid out in, plus a redb backend.
//!
//! # Overview
//!
//! The storage layer is a transactional key-value interface over named
//! logical tables. Keys within a table are kept in byte order, which is what
//! lets hierarchical keys turn a forward scan into a depth-first walk of a
//! table hierarchy.
//!
//! # Core Traits
//!
//! - [`StorageEngine`] - The main entry point for storage operations
//! - [`Transaction`] - ACID transaction support with read/write operations
//! - [`Cursor`] - Forward iteration over key-value pairs in key order
//!
//! # Error Handling
//!
//! All storage operations return [`StorageResult<T>`], which is an alias for
//! `Result<T, StorageError>`.
//!
//! # Example
//!
//! ```
//! use arbordb_storage::backends::RedbEngine;
//! use arbordb_storage::{StorageEngine, Transaction};
//!
//! let engine = RedbEngine::in_memory().unwrap();
//!
//! let mut tx = engine.begin_write().unwrap();
//! tx.put("group.coi", b"\x00\x01", b"customer 1").unwrap();
//! tx.commit().unwrap();
//!
//! let tx = engine.begin_read().unwrap();
//! assert_eq!(tx.get("group.coi", b"\x00\x01").unwrap(), Some(b"customer 1".to_vec()));
//! ```
//!
//! # Modules
//!
//! - [`engine`] - Storage engine traits and abstractions
//! - [`backends`] - Concrete storage backend implementations

#![deny(clippy::unwrap_used)]

pub mod backends;
pub mod engine;

pub use engine::{
    Cursor, CursorResult, KeyValue, StorageEngine, StorageError, StorageResult, Transaction,
};
