//! Flatten cursor.
//!
//! Flatten keeps a one-row lookback holding the most recent parent row. The
//! lookback is an explicit state machine:
//!
//! - `NoParent`: no parent row is in scope
//! - `HaveParentPending`: a parent row was read but has not joined a child yet
//! - `HaveParent`: the parent row has joined at least one child
//!
//! Descendants of the parent that are not of the child type pass through
//! without touching the lookback. A pending parent is emitted standalone only
//! when a row outside its subtree arrives or the input ends, so every input
//! row reaches the output exactly once: alone, or inside joined rows.

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;

use tracing::debug;

use crate::error::QueryResult;
use crate::exec::context::ExecutionContext;
use crate::exec::operator::{BoxedCursor, Cursor, CursorBase, CursorState};
use crate::exec::row::Row;
use crate::plan::physical::FlattenNode;

#[derive(Debug, Default)]
enum Lookback {
    #[default]
    NoParent,
    HaveParentPending(Row),
    HaveParent(Row),
}

/// Joins each parent row with the child rows that descend from it.
pub struct FlattenCursor {
    base: CursorBase,
    node: FlattenNode,
    input: BoxedCursor,
    lookback: Lookback,
    /// Rows ready to emit, in order.
    output: VecDeque<Row>,
    input_exhausted: bool,
}

impl FlattenCursor {
    /// Creates a flatten over `input`.
    #[must_use]
    pub fn new(node: FlattenNode, input: BoxedCursor) -> Self {
        Self {
            base: CursorBase::new("Flatten"),
            node,
            input,
            lookback: Lookback::NoParent,
            output: VecDeque::new(),
            input_exhausted: false,
        }
    }

    fn reset(&mut self) {
        self.lookback = Lookback::NoParent;
        self.output.clear();
        self.input_exhausted = false;
    }

    /// Feeds one input row through the lookback.
    fn absorb(&mut self, row: Row) {
        let lookback = mem::take(&mut self.lookback);

        if *row.row_type() == self.node.parent {
            if let Lookback::HaveParentPending(parent) = lookback {
                self.output.push_back(parent);
            }
            self.lookback = Lookback::HaveParentPending(row);
            return;
        }

        let (parent, joined) = match lookback {
            Lookback::NoParent => {
                self.output.push_back(row);
                return;
            }
            Lookback::HaveParentPending(parent) => (parent, false),
            Lookback::HaveParent(parent) => (parent, true),
        };

        if !parent.is_ancestor_of(&row) {
            if !joined {
                self.output.push_back(parent);
            }
            self.output.push_back(row);
            return;
        }

        if *row.row_type() == self.node.child {
            self.output.push_back(parent.flatten_with(&row, Arc::clone(&self.node.output)));
            self.lookback = Lookback::HaveParent(parent);
            return;
        }

        self.output.push_back(row);
        self.lookback = if joined { Lookback::HaveParent(parent) } else { Lookback::HaveParentPending(parent) };
    }

    fn finish(&mut self) {
        if let Lookback::HaveParentPending(parent) = mem::take(&mut self.lookback) {
            self.output.push_back(parent);
        }
        self.input_exhausted = true;
    }
}

impl Cursor for FlattenCursor {
    fn open(&mut self, ctx: &ExecutionContext) -> QueryResult<()> {
        self.base.check_can_open()?;
        self.input.open(ctx)?;
        self.reset();
        self.base.set_open();
        debug!(parent = self.node.parent.name(), child = self.node.child.name(), "opened flatten");
        Ok(())
    }

    fn advance(&mut self) -> QueryResult<bool> {
        if !self.base.begin_advance()? {
            return Ok(false);
        }
        loop {
            if let Some(row) = self.output.pop_front() {
                self.base.set_current(row);
                return Ok(true);
            }
            if self.input_exhausted {
                self.base.set_exhausted();
                return Ok(false);
            }
            if self.input.advance()? {
                let row = self.input.current_row()?.clone();
                self.absorb(row);
            } else {
                self.finish();
            }
        }
    }

    fn current_row(&self) -> QueryResult<&Row> {
        self.base.current_row()
    }

    fn close(&mut self) -> QueryResult<()> {
        self.reset();
        self.base.set_closed();
        self.input.close()
    }

    fn state(&self) -> CursorState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "Flatten"
    }

    fn rows_produced(&self) -> u64 {
        self.base.rows_produced()
    }
}
