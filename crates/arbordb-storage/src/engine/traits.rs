//! Core storage engine traits.
//!
//! - [`StorageEngine`] - The main entry point for storage operations
//! - [`Transaction`] - ACID transaction support with read/write operations
//! - [`Cursor`] - Forward iteration over key-value pairs

use std::ops::Bound;
use std::sync::Arc;

use super::StorageError;

/// A key-value pair returned by cursor operations.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// Result type for cursor operations that return a key-value pair.
pub type CursorResult = Result<Option<KeyValue>, StorageError>;

/// A storage engine that provides transactional key-value operations.
///
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use arbordb_storage::{StorageEngine, StorageError, Transaction};
///
/// fn example<E: StorageEngine>(engine: &E) -> Result<(), StorageError> {
///     let mut tx = engine.begin_write()?;
///     tx.put("my_table", b"key", b"value")?;
///     tx.commit()?;
///
///     let tx = engine.begin_read()?;
///     let value = tx.get("my_table", b"key")?;
///     Ok(())
/// }
/// ```
pub trait StorageEngine: Send + Sync {
    /// The transaction type for this engine.
    type Transaction<'a>: Transaction
    where
        Self: 'a;

    /// Begin a read-only transaction over a consistent snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the transaction cannot be started.
    fn begin_read(&self) -> Result<Self::Transaction<'_>, StorageError>;

    /// Begin a read-write transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the transaction cannot be started.
    fn begin_write(&self) -> Result<Self::Transaction<'_>, StorageError>;

    /// Flush any buffered data to durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the flush fails.
    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// A transaction over named logical tables.
///
/// Write transactions must be explicitly committed; dropping one without
/// committing rolls its changes back.
pub trait Transaction {
    /// The cursor type for iteration.
    type Cursor<'a>: Cursor
    where
        Self: 'a;

    /// Get a value by key from a table. A table that was never written to
    /// reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Internal`] if the backend read fails.
    fn get(&self, table: &str, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Put a key-value pair into a table, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] in a read transaction, or an error if
    /// the write fails.
    fn put(&mut self, table: &str, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Delete a key from a table. Returns whether the key existed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] in a read transaction, or an error if
    /// the delete fails.
    fn delete(&mut self, table: &str, key: &[u8]) -> Result<bool, StorageError>;

    /// Create a cursor over all entries of a table.
    ///
    /// The cursor starts before the first key.
    ///
    /// # Errors
    ///
    /// Returns an error if the cursor cannot be created.
    fn cursor(&self, table: &str) -> Result<Self::Cursor<'_>, StorageError>;

    /// Create a cursor over the entries of a table whose keys fall within
    /// `start..end`.
    ///
    /// ```ignore
    /// use std::ops::Bound;
    ///
    /// // Every key after "a" up to and including "z"
    /// let cursor = tx.range(
    ///     "my_table",
    ///     Bound::Excluded(b"a".as_slice()),
    ///     Bound::Included(b"z".as_slice()),
    /// )?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the cursor cannot be created.
    fn range(
        &self,
        table: &str,
        start: Bound<&[u8]>,
        end: Bound<&[u8]>,
    ) -> Result<Self::Cursor<'_>, StorageError>;

    /// Commit the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the commit fails.
    fn commit(self) -> Result<(), StorageError>;

    /// Roll back the transaction, discarding all changes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Transaction`] if the rollback fails.
    fn rollback(self) -> Result<(), StorageError>;

    /// Check if this is a read-only transaction.
    fn is_read_only(&self) -> bool;
}

/// A forward cursor over key-value pairs in key order.
///
/// ```ignore
/// let mut cursor = tx.cursor("my_table")?;
/// cursor.seek(b"prefix")?;
/// while let Some((key, value)) = cursor.current().map(|(k, v)| (k.to_vec(), v.to_vec())) {
///     // ...
///     cursor.next()?;
/// }
/// ```
pub trait Cursor {
    /// Position at the first key greater than or equal to `key` within the
    /// cursor's range and return that entry.
    fn seek(&mut self, key: &[u8]) -> CursorResult;

    /// Position at the first entry of the cursor's range.
    fn seek_first(&mut self) -> CursorResult;

    /// Move to the next entry. An unpositioned cursor moves to the first one.
    fn next(&mut self) -> CursorResult;

    /// The entry the cursor is positioned on, if any.
    fn current(&self) -> Option<(&[u8], &[u8])>;
}

/// Shared ownership of an engine is itself an engine.
impl<E: StorageEngine> StorageEngine for Arc<E> {
    type Transaction<'a>
        = E::Transaction<'a>
    where
        Self: 'a;

    fn begin_read(&self) -> Result<Self::Transaction<'_>, StorageError> {
        (**self).begin_read()
    }

    fn begin_write(&self) -> Result<Self::Transaction<'_>, StorageError> {
        (**self).begin_write()
    }

    fn flush(&self) -> Result<(), StorageError> {
        (**self).flush()
    }
}
