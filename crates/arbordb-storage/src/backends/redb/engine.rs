//! Redb storage engine implementation.

use std::path::Path;

use redb::Database;

use crate::engine::{StorageEngine, StorageError};

use super::transaction::RedbTransaction;

/// Configuration options for the Redb storage engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedbConfig {
    /// Maximum size of the database file in bytes. Advisory: checked when the
    /// engine is opened against the existing file.
    pub max_size: Option<u64>,

    /// Cache size in bytes. If not set, uses Redb's default.
    pub cache_size: Option<usize>,

    /// Entries fetched per cursor batch.
    pub cursor_batch_size: Option<usize>,
}

impl RedbConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum database size.
    #[must_use]
    pub const fn max_size(mut self, size: u64) -> Self {
        self.max_size = Some(size);
        self
    }

    /// Set the cache size.
    #[must_use]
    pub const fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = Some(size);
        self
    }

    /// Set the number of entries a cursor fetches at a time.
    #[must_use]
    pub const fn cursor_batch_size(mut self, size: usize) -> Self {
        self.cursor_batch_size = Some(size);
        self
    }
}

/// Default number of entries a cursor loads per batch.
pub(crate) const DEFAULT_CURSOR_BATCH: usize = 1000;

/// A storage engine backed by Redb.
pub struct RedbEngine {
    db: Database,
    cursor_batch: usize,
}

impl RedbEngine {
    /// Open or create a database at the given path with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with_config(path, RedbConfig::default())
    }

    /// Open or create a database at the given path with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database cannot be opened or
    /// created, or if an existing file is already larger than `max_size`.
    pub fn open_with_config(path: impl AsRef<Path>, config: RedbConfig) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(max) = config.max_size {
            if let Ok(meta) = std::fs::metadata(path) {
                if meta.len() > max {
                    return Err(StorageError::Open(format!(
                        "{} is {} bytes, over the configured maximum of {max}",
                        path.display(),
                        meta.len()
                    )));
                }
            }
        }

        let mut builder = Database::builder();
        if let Some(cache_size) = config.cache_size {
            builder.set_cache_size(cache_size);
        }
        let db = builder.create(path).map_err(|e| StorageError::Open(e.to_string()))?;
        tracing::debug!(path = %path.display(), "opened redb database");

        Ok(Self { db, cursor_batch: config.cursor_batch_size.unwrap_or(DEFAULT_CURSOR_BATCH).max(1) })
    }

    /// Create an in-memory database. The data is lost when the engine is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())
            .map_err(|e| StorageError::Open(e.to_string()))?;

        Ok(Self { db, cursor_batch: DEFAULT_CURSOR_BATCH })
    }

    /// Get the underlying Redb database.
    pub const fn inner(&self) -> &Database {
        &self.db
    }
}

impl StorageEngine for RedbEngine {
    type Transaction<'a> = RedbTransaction;

    fn begin_read(&self) -> Result<Self::Transaction<'_>, StorageError> {
        let tx = self.db.begin_read().map_err(|e| StorageError::Transaction(e.to_string()))?;
        Ok(RedbTransaction::new_read(tx, self.cursor_batch))
    }

    fn begin_write(&self) -> Result<Self::Transaction<'_>, StorageError> {
        let tx = self.db.begin_write().map_err(|e| StorageError::Transaction(e.to_string()))?;
        Ok(RedbTransaction::new_write(tx, self.cursor_batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Transaction;

    #[test]
    fn test_in_memory_creation() {
        let engine = RedbEngine::in_memory().expect("failed to create in-memory db");
        let tx = engine.begin_read().expect("failed to begin read");
        assert!(tx.is_read_only());
    }

    #[test]
    fn test_config_builder() {
        let config = RedbConfig::new().max_size(100 << 20).cache_size(10 << 20).cursor_batch_size(16);
        assert_eq!(config.max_size, Some(100 << 20));
        assert_eq!(config.cache_size, Some(10 << 20));
        assert_eq!(config.cursor_batch_size, Some(16));
    }

    #[test]
    fn test_open_rejects_oversized_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("big.redb");
        drop(RedbEngine::open(&path).expect("create"));
        let result = RedbEngine::open_with_config(&path, RedbConfig::new().max_size(1));
        assert!(matches!(result, Err(StorageError::Open(_))));
    }
}
