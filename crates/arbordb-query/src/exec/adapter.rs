//! The storage boundary seen by operators.
//!
//! Leaf cursors never touch the storage engine directly. They open
//! [`Traversal`]s and issue point lookups through an [`Adapter`], which is
//! shared read-only by every cursor of every tree built against it.

use arbordb_core::{GroupId, HKey, IndexId};

use crate::error::QueryResult;

use super::range::IndexKeyRange;
use super::row::Row;
use super::row_type::Schema;

/// A forward-only pass over stored rows or index entries.
///
/// A traversal is positioned before its first entry when opened. The key it
/// exposes is a buffer reused across steps; callers that keep it past the
/// next [`advance`](Traversal::advance) must take a
/// [`snapshot`](HKey::snapshot).
pub trait Traversal: Send {
    /// Moves to the next entry. Returns `false` once the traversal is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an adapter error if storage cannot be read, or an encoding
    /// error if a stored entry is malformed.
    fn advance(&mut self) -> QueryResult<bool>;

    /// Key of the current entry. For index traversals this is the key of the
    /// row the entry points to.
    fn current_hkey(&self) -> Option<&HKey>;

    /// Materializes the current entry as a row.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the traversal is not positioned on an entry.
    fn current_row(&self) -> QueryResult<Row>;

    /// Releases the traversal. Safe to call more than once.
    fn close(&mut self);
}

/// A boxed traversal for dynamic dispatch.
pub type BoxedTraversal = Box<dyn Traversal>;

/// Read access to groups and indexes.
pub trait Adapter: Send + Sync {
    /// Row types for the catalog this adapter serves.
    fn schema(&self) -> &Schema;

    /// Opens a traversal over every row of `group`, in HKey order.
    ///
    /// # Errors
    ///
    /// Returns a usage error for an unknown group, or an adapter error if
    /// storage is unreachable.
    fn open_group_traversal(&self, group: GroupId) -> QueryResult<BoxedTraversal>;

    /// Opens a traversal over the row at `root` and all of its descendants.
    ///
    /// # Errors
    ///
    /// As for [`open_group_traversal`](Adapter::open_group_traversal).
    fn open_branch_traversal(&self, group: GroupId, root: &HKey) -> QueryResult<BoxedTraversal>;

    /// Opens a traversal over the entries of `index` within `range`, in
    /// index key order.
    ///
    /// # Errors
    ///
    /// Returns a usage error for an unknown index, or an adapter error if
    /// storage is unreachable.
    fn open_index_traversal(&self, index: IndexId, range: &IndexKeyRange) -> QueryResult<BoxedTraversal>;

    /// Fetches the row stored at exactly `hkey`.
    ///
    /// # Errors
    ///
    /// Returns a usage error if `hkey` does not name a table of the catalog,
    /// or an adapter error if storage is unreachable.
    fn point_lookup(&self, hkey: &HKey) -> QueryResult<Option<Row>>;
}
