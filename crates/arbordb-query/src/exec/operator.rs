//! Cursor trait and base types.
//!
//! This module defines the [`Cursor`] trait that every operator's runtime
//! state implements.

use crate::error::{QueryError, QueryResult};

use super::context::ExecutionContext;
use super::row::Row;

/// The state of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Not open. The initial state, and the state after `close`.
    Closed,
    /// Open and able to produce rows.
    Open,
    /// Open, with no more rows to produce.
    Exhausted,
}

impl CursorState {
    /// Returns true if the cursor is open, whether or not it is exhausted.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open | Self::Exhausted)
    }

    /// Returns true if the cursor is exhausted.
    #[must_use]
    pub const fn is_exhausted(self) -> bool {
        matches!(self, Self::Exhausted)
    }
}

/// The cursor trait for pull-based execution.
///
/// Cursors form a tree matching the physical plan. Rows flow from leaf
/// cursors, which read through an [`Adapter`](super::Adapter), up to the root.
///
/// # Lifecycle
///
/// 1. **Closed**: after construction; `open` moves to Open
/// 2. **Open**: each `advance` produces a row or reports exhaustion
/// 3. **Exhausted**: `advance` keeps returning false
/// 4. **Closed**: after `close`; the cursor may be opened again
///
/// `current_row` is valid only after an `advance` that returned true and
/// until the next `advance` or `close`. `close` is safe to call in any state,
/// including after an error.
///
/// # Thread Safety
///
/// Cursors are `Send` but not `Sync`: one tree is read by one caller at a time.
pub trait Cursor: Send {
    /// Opens the cursor and its inputs.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the cursor is already open, a binding error if
    /// a required parameter is missing, or an adapter error if storage is
    /// unreachable.
    fn open(&mut self, ctx: &ExecutionContext) -> QueryResult<()>;

    /// Moves to the next row. Returns false once exhausted.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the cursor is closed, or any error raised while
    /// reading input.
    fn advance(&mut self) -> QueryResult<bool>;

    /// The row produced by the last successful `advance`.
    ///
    /// # Errors
    ///
    /// Returns a usage error if no row is current.
    fn current_row(&self) -> QueryResult<&Row>;

    /// Closes the cursor and its inputs, releasing storage resources.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while closing inputs. Every input is
    /// closed regardless.
    fn close(&mut self) -> QueryResult<()>;

    /// Returns the current state.
    fn state(&self) -> CursorState;

    /// Returns the name of this operator type.
    fn name(&self) -> &'static str;

    /// Returns the number of rows produced since the cursor was last opened.
    fn rows_produced(&self) -> u64;

    /// Advances and returns a copy of the new current row.
    ///
    /// # Errors
    ///
    /// As for [`advance`](Cursor::advance).
    fn next_row(&mut self) -> QueryResult<Option<Row>> {
        if self.advance()? {
            Ok(Some(self.current_row()?.clone()))
        } else {
            Ok(None)
        }
    }
}

/// A boxed cursor for dynamic dispatch.
pub type BoxedCursor = Box<dyn Cursor>;

/// Base implementation for cursors.
///
/// Tracks state and the current row so each operator only implements its own
/// row logic.
#[derive(Debug)]
pub struct CursorBase {
    name: &'static str,
    state: CursorState,
    current: Option<Row>,
    rows_produced: u64,
}

impl CursorBase {
    /// Creates a closed cursor base.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { name, state: CursorState::Closed, current: None, rows_produced: 0 }
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> CursorState {
        self.state
    }

    /// Fails unless the cursor is closed.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the cursor is already open.
    pub fn check_can_open(&self) -> QueryResult<()> {
        if self.state.is_open() {
            return Err(QueryError::usage(format!("{} cursor opened twice without close", self.name)));
        }
        Ok(())
    }

    /// Marks the cursor open with no current row.
    pub fn set_open(&mut self) {
        self.state = CursorState::Open;
        self.current = None;
        self.rows_produced = 0;
    }

    /// Checks that `advance` may produce a row. Returns false if exhausted.
    ///
    /// Clears the current row either way.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the cursor is closed.
    pub fn begin_advance(&mut self) -> QueryResult<bool> {
        self.current = None;
        match self.state {
            CursorState::Closed => Err(QueryError::usage(format!("{} cursor advanced while closed", self.name))),
            CursorState::Exhausted => Ok(false),
            CursorState::Open => Ok(true),
        }
    }

    /// Makes `row` current and counts it.
    pub fn set_current(&mut self, row: Row) {
        self.current = Some(row);
        self.rows_produced += 1;
    }

    /// Marks the cursor exhausted.
    pub fn set_exhausted(&mut self) {
        self.current = None;
        self.state = CursorState::Exhausted;
    }

    /// Marks the cursor closed.
    pub fn set_closed(&mut self) {
        self.current = None;
        self.state = CursorState::Closed;
    }

    /// Returns the current row.
    ///
    /// # Errors
    ///
    /// Returns a usage error if no row is current.
    pub fn current_row(&self) -> QueryResult<&Row> {
        self.current.as_ref().ok_or_else(|| {
            QueryError::usage(format!("{} cursor has no current row; call advance first", self.name))
        })
    }

    /// Returns the number of rows produced.
    #[must_use]
    pub const fn rows_produced(&self) -> u64 {
        self.rows_produced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn cursor_state_transitions() {
        let mut base = CursorBase::new("Test");
        assert_eq!(base.state(), CursorState::Closed);
        assert_eq!(base.begin_advance().unwrap_err().kind(), ErrorKind::Usage);

        base.check_can_open().unwrap();
        base.set_open();
        assert!(base.state().is_open());
        assert_eq!(base.check_can_open().unwrap_err().kind(), ErrorKind::Usage);
        assert!(base.begin_advance().unwrap());

        base.set_exhausted();
        assert!(base.state().is_exhausted());
        assert!(!base.begin_advance().unwrap());
        assert!(!base.begin_advance().unwrap());

        base.set_closed();
        assert_eq!(base.state(), CursorState::Closed);
        base.check_can_open().unwrap();
    }

    #[test]
    fn current_row_requires_advance() {
        let base = CursorBase::new("Test");
        assert_eq!(base.current_row().unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(base.rows_produced(), 0);
    }
}
