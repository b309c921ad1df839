//! Error types for query execution.

use arbordb_core::{CoreError, HKey};
use arbordb_storage::StorageError;
use thiserror::Error;

/// Errors raised while building or running an operator tree.
///
/// Every error aborts the current `open` or `advance` call. The cursor that
/// raised it can still be closed afterwards.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The cursor protocol or an operator contract was violated by the caller,
    /// for example reading the current row before a successful advance.
    #[error("usage error: {0}")]
    Usage(String),

    /// The storage adapter failed.
    #[error("adapter error: {0}")]
    Adapter(String),

    /// A row expected at `hkey` does not exist, typically because an index
    /// entry is stale.
    #[error("row not found at {hkey}")]
    RowNotFound {
        /// Key of the missing row.
        hkey: HKey,
    },

    /// A parameter required by an operator was not bound, or was bound to a
    /// value of the wrong shape.
    #[error("binding error: {0}")]
    Binding(String),

    /// Stored data could not be encoded or decoded.
    #[error(transparent)]
    Encoding(#[from] CoreError),

    /// Configuration could not be parsed or is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// The category of a [`QueryError`], for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`QueryError::Usage`].
    Usage,
    /// See [`QueryError::Adapter`].
    Adapter,
    /// See [`QueryError::RowNotFound`].
    RowNotFound,
    /// See [`QueryError::Binding`].
    Binding,
    /// See [`QueryError::Encoding`].
    Encoding,
    /// See [`QueryError::Config`].
    Config,
}

impl QueryError {
    /// Creates a usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Creates a binding error.
    pub fn binding(msg: impl Into<String>) -> Self {
        Self::Binding(msg.into())
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Usage(_) => ErrorKind::Usage,
            Self::Adapter(_) => ErrorKind::Adapter,
            Self::RowNotFound { .. } => ErrorKind::RowNotFound,
            Self::Binding(_) => ErrorKind::Binding,
            Self::Encoding(_) => ErrorKind::Encoding,
            Self::Config(_) => ErrorKind::Config,
        }
    }
}

impl From<StorageError> for QueryError {
    fn from(err: StorageError) -> Self {
        Self::Adapter(err.to_string())
    }
}

/// Result alias for query execution.
pub type QueryResult<T> = Result<T, QueryError>;
