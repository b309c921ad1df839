//! Index scan cursor.

use std::sync::Arc;

use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::exec::adapter::{Adapter, BoxedTraversal};
use crate::exec::context::{ExecutionContext, ExecutionStats};
use crate::exec::operator::{Cursor, CursorBase, CursorState};
use crate::exec::range::IndexKeyRange;
use crate::exec::row::Row;
use crate::plan::physical::IndexScanNode;

/// Produces index rows in index key order within the bound range.
///
/// Each row holds the key column values and the HKey of the row the entry
/// points to. The range is read from the bindings on every open, so a
/// reopened scan always starts from the beginning of the newly bound range.
pub struct IndexScanCursor {
    base: CursorBase,
    adapter: Arc<dyn Adapter>,
    node: IndexScanNode,
    traversal: Option<BoxedTraversal>,
    stats: Arc<ExecutionStats>,
}

impl IndexScanCursor {
    /// Creates an index scan.
    #[must_use]
    pub fn new(node: IndexScanNode, adapter: Arc<dyn Adapter>) -> Self {
        Self { base: CursorBase::new("IndexScan"), adapter, node, traversal: None, stats: Arc::default() }
    }

    fn resolve_range(&self, ctx: &ExecutionContext) -> QueryResult<IndexKeyRange> {
        let key = self.node.binding_key();
        let range = match ctx.bindings().range(key)? {
            Some(range) => range.clone(),
            None if self.node.range_required => {
                return Err(QueryError::binding(format!(
                    "index scan on {} requires a range bound to {key}",
                    self.node.row_type.name()
                )));
            }
            None => IndexKeyRange::unbounded(),
        };
        let key_columns = self.node.row_type.column_count();
        if range.bound_len() > key_columns {
            return Err(QueryError::binding(format!(
                "range bound to {key} has {} values but index {} has {key_columns} key columns",
                range.bound_len(),
                self.node.row_type.name()
            )));
        }
        Ok(range)
    }
}

impl Cursor for IndexScanCursor {
    fn open(&mut self, ctx: &ExecutionContext) -> QueryResult<()> {
        self.base.check_can_open()?;
        let index = self
            .node
            .row_type
            .index_id()
            .ok_or_else(|| QueryError::usage(format!("{} is not an index", self.node.row_type.name())))?;
        let range = self.resolve_range(ctx)?;
        self.traversal = Some(self.adapter.open_index_traversal(index, &range)?);
        self.stats = ctx.stats_handle();
        self.base.set_open();
        debug!(index = self.node.row_type.name(), ?range, "opened index scan");
        Ok(())
    }

    fn advance(&mut self) -> QueryResult<bool> {
        if !self.base.begin_advance()? {
            return Ok(false);
        }
        let traversal =
            self.traversal.as_mut().ok_or_else(|| QueryError::usage("index scan has no open traversal"))?;
        if traversal.advance()? {
            let row = traversal.current_row()?;
            self.stats.record_rows_read(1);
            self.base.set_current(row);
            Ok(true)
        } else {
            self.base.set_exhausted();
            Ok(false)
        }
    }

    fn current_row(&self) -> QueryResult<&Row> {
        self.base.current_row()
    }

    fn close(&mut self) -> QueryResult<()> {
        if let Some(mut traversal) = self.traversal.take() {
            traversal.close();
            debug!(index = self.node.row_type.name(), rows = self.base.rows_produced(), "closed index scan");
        }
        self.base.set_closed();
        Ok(())
    }

    fn state(&self) -> CursorState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "IndexScan"
    }

    fn rows_produced(&self) -> u64 {
        self.base.rows_produced()
    }
}
