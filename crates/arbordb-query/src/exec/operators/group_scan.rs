//! Group scan cursor.

use std::sync::Arc;

use arbordb_core::GroupId;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::exec::adapter::{Adapter, BoxedTraversal};
use crate::exec::context::{ExecutionContext, ExecutionStats};
use crate::exec::operator::{Cursor, CursorBase, CursorState};
use crate::exec::row::Row;

/// Produces every row of a group in HKey order, which is depth-first
/// preorder of the table hierarchy.
pub struct GroupScanCursor {
    base: CursorBase,
    adapter: Arc<dyn Adapter>,
    group: GroupId,
    traversal: Option<BoxedTraversal>,
    stats: Arc<ExecutionStats>,
}

impl GroupScanCursor {
    /// Creates a scan of `group`.
    #[must_use]
    pub fn new(group: GroupId, adapter: Arc<dyn Adapter>) -> Self {
        Self { base: CursorBase::new("GroupScan"), adapter, group, traversal: None, stats: Arc::default() }
    }
}

impl Cursor for GroupScanCursor {
    fn open(&mut self, ctx: &ExecutionContext) -> QueryResult<()> {
        self.base.check_can_open()?;
        self.traversal = Some(self.adapter.open_group_traversal(self.group)?);
        self.stats = ctx.stats_handle();
        self.base.set_open();
        debug!(group = self.group.as_u32(), "opened group scan");
        Ok(())
    }

    fn advance(&mut self) -> QueryResult<bool> {
        if !self.base.begin_advance()? {
            return Ok(false);
        }
        let traversal =
            self.traversal.as_mut().ok_or_else(|| QueryError::usage("group scan has no open traversal"))?;
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
            debug!(group = self.group.as_u32(), rows = self.base.rows_produced(), "closed group scan");
        }
        self.base.set_closed();
        Ok(())
    }

    fn state(&self) -> CursorState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "GroupScan"
    }

    fn rows_produced(&self) -> u64 {
        self.base.rows_produced()
    }
}
