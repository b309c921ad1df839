//! Select cursor.

use std::sync::Arc;

use arbordb_core::HKey;
use tracing::debug;

use crate::error::QueryResult;
use crate::exec::context::{ExecutionContext, ExecutionStats};
use crate::exec::operator::{BoxedCursor, Cursor, CursorBase, CursorState};
use crate::exec::row::Row;
use crate::plan::physical::SelectNode;

/// Drops rows of the target type that fail the predicate.
///
/// A dropped row takes its whole subtree with it: rows that follow it in
/// HKey order and descend from it are dropped too, whatever their type.
/// Everything else passes through unchanged and in order.
pub struct SelectCursor {
    base: CursorBase,
    node: SelectNode,
    input: BoxedCursor,
    /// Key of the last dropped target row while its descendants are streaming.
    dropped: Option<HKey>,
    stats: Arc<ExecutionStats>,
}

impl SelectCursor {
    /// Creates a select over `input`.
    #[must_use]
    pub fn new(node: SelectNode, input: BoxedCursor) -> Self {
        Self { base: CursorBase::new("Select"), node, input, dropped: None, stats: Arc::default() }
    }
}

impl Cursor for SelectCursor {
    fn open(&mut self, ctx: &ExecutionContext) -> QueryResult<()> {
        self.base.check_can_open()?;
        self.input.open(ctx)?;
        self.dropped = None;
        self.stats = ctx.stats_handle();
        self.base.set_open();
        debug!(row_type = self.node.target.name(), "opened select");
        Ok(())
    }

    fn advance(&mut self) -> QueryResult<bool> {
        if !self.base.begin_advance()? {
            return Ok(false);
        }
        loop {
            if !self.input.advance()? {
                self.dropped = None;
                self.base.set_exhausted();
                return Ok(false);
            }
            let row = self.input.current_row()?;

            if let Some(dropped) = &self.dropped {
                if row.hkey().is_some_and(|hkey| dropped.is_prefix_of(hkey)) {
                    self.stats.record_rows_filtered(1);
                    continue;
                }
                self.dropped = None;
            }

            if *row.row_type() == self.node.target && !self.node.predicate.evaluate(row)? {
                self.dropped = row.hkey().map(HKey::snapshot);
                self.stats.record_rows_filtered(1);
                continue;
            }

            self.base.set_current(row.clone());
            return Ok(true);
        }
    }

    fn current_row(&self) -> QueryResult<&Row> {
        self.base.current_row()
    }

    fn close(&mut self) -> QueryResult<()> {
        self.dropped = None;
        self.base.set_closed();
        self.input.close()
    }

    fn state(&self) -> CursorState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "Select"
    }

    fn rows_produced(&self) -> u64 {
        self.base.rows_produced()
    }
}
