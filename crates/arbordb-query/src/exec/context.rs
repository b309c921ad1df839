//! Execution context for query execution.
//!
//! The context carries the runtime parameter bindings, configuration and
//! statistics shared by every cursor of one operator tree.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;

use crate::error::{QueryError, QueryResult};

use super::bindings::Bindings;

/// Execution context for one operator tree.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    bindings: Bindings,
    stats: Arc<ExecutionStats>,
    config: ExecutionConfig,
}

impl ExecutionContext {
    /// Creates a context with default configuration and no bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context with the given configuration.
    #[must_use]
    pub fn with_config(config: ExecutionConfig) -> Self {
        Self { config, ..Self::default() }
    }

    /// Returns the parameter bindings.
    #[inline]
    #[must_use]
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Returns the parameter bindings for modification.
    #[inline]
    pub fn bindings_mut(&mut self) -> &mut Bindings {
        &mut self.bindings
    }

    /// Returns the configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Returns the execution statistics.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Returns a shared handle to the statistics, for cursors that record
    /// into them after `open` returns.
    #[must_use]
    pub fn stats_handle(&self) -> Arc<ExecutionStats> {
        Arc::clone(&self.stats)
    }
}

/// Execution statistics, updated through shared references.
#[derive(Debug)]
pub struct ExecutionStats {
    start_time: Instant,
    rows_read: AtomicU64,
    rows_produced: AtomicU64,
    rows_filtered: AtomicU64,
}

impl ExecutionStats {
    /// Creates new execution statistics.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            rows_read: AtomicU64::new(0),
            rows_produced: AtomicU64::new(0),
            rows_filtered: AtomicU64::new(0),
        }
    }

    /// Records rows read from the adapter.
    #[inline]
    pub fn record_rows_read(&self, count: u64) {
        self.rows_read.fetch_add(count, Ordering::Relaxed);
    }

    /// Records rows produced by the root cursor.
    #[inline]
    pub fn record_rows_produced(&self, count: u64) {
        self.rows_produced.fetch_add(count, Ordering::Relaxed);
    }

    /// Records rows dropped by a select.
    #[inline]
    pub fn record_rows_filtered(&self, count: u64) {
        self.rows_filtered.fetch_add(count, Ordering::Relaxed);
    }

    /// Returns the number of rows read.
    #[inline]
    #[must_use]
    pub fn rows_read(&self) -> u64 {
        self.rows_read.load(Ordering::Relaxed)
    }

    /// Returns the number of rows produced.
    #[inline]
    #[must_use]
    pub fn rows_produced(&self) -> u64 {
        self.rows_produced.load(Ordering::Relaxed)
    }

    /// Returns the number of rows filtered.
    #[inline]
    #[must_use]
    pub fn rows_filtered(&self) -> u64 {
        self.rows_filtered.load(Ordering::Relaxed)
    }

    /// Returns the elapsed time since the statistics were created.
    #[inline]
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl Default for ExecutionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Default number of storage entries fetched per traversal batch.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Configuration options for query execution.
///
/// Can be loaded from TOML:
///
/// ```
/// use arbordb_query::ExecutionConfig;
///
/// let config = ExecutionConfig::from_toml_str("batch_size = 64\ncollect_stats = true").unwrap();
/// assert_eq!(config.batch_size, 64);
/// assert!(config.collect_stats);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionConfig {
    /// Entries fetched from storage per traversal batch; each batch runs in
    /// its own read transaction.
    pub batch_size: usize,
    /// Whether the executor logs a statistics summary when it closes.
    pub collect_stats: bool,
}

impl ExecutionConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self { batch_size: DEFAULT_BATCH_SIZE, collect_stats: false }
    }

    /// Sets the traversal batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Enables statistics collection.
    #[must_use]
    pub const fn with_stats(mut self) -> Self {
        self.collect_stats = true;
        self
    }

    /// Parses a configuration from TOML. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Config`] if the text is not valid TOML, has
    /// unknown keys, or sets a zero batch size.
    pub fn from_toml_str(text: &str) -> QueryResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| QueryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for invalid values.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Config`] if `batch_size` is zero.
    pub fn validate(&self) -> QueryResult<()> {
        if self.batch_size == 0 {
            return Err(QueryError::Config("batch_size must be at least 1".to_owned()));
        }
        Ok(())
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self::new()
    }
}
