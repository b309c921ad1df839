//! Index lookup cursor.

use std::collections::VecDeque;
use std::sync::Arc;

use arbordb_core::{HKey, TableId};
use tracing::{debug, warn};

use crate::error::{QueryError, QueryResult};
use crate::exec::adapter::{Adapter, BoxedTraversal};
use crate::exec::context::{ExecutionContext, ExecutionStats};
use crate::exec::operator::{BoxedCursor, Cursor, CursorBase, CursorState};
use crate::exec::row::Row;
use crate::plan::physical::{IndexLookupNode, LookupScope};

/// Turns index rows back into stored rows.
///
/// For each input index row, in input order, emits the requested ancestors
/// of the indexed row (root first), then the indexed row itself, then, with
/// [`LookupScope::Branch`], its descendants in HKey order. A row or ancestor
/// that the index points to but storage lacks is a
/// [`RowNotFound`](QueryError::RowNotFound) error.
pub struct IndexLookupCursor {
    base: CursorBase,
    adapter: Arc<dyn Adapter>,
    node: IndexLookupNode,
    /// Ancestor tables, root first.
    ancestors: Vec<TableId>,
    input: BoxedCursor,
    /// Ancestors and the looked-up row, waiting to be emitted.
    pending: VecDeque<Row>,
    /// Descendants of the current indexed row.
    branch: Option<BoxedTraversal>,
    stats: Arc<ExecutionStats>,
}

impl IndexLookupCursor {
    /// Creates a lookup. `ancestors` must be ordered root first.
    #[must_use]
    pub fn new(
        node: IndexLookupNode,
        ancestors: Vec<TableId>,
        input: BoxedCursor,
        adapter: Arc<dyn Adapter>,
    ) -> Self {
        Self {
            base: CursorBase::new("IndexLookup"),
            adapter,
            node,
            ancestors,
            input,
            pending: VecDeque::new(),
            branch: None,
            stats: Arc::default(),
        }
    }

    fn fetch(&self, hkey: &HKey) -> QueryResult<Row> {
        self.stats.record_rows_read(1);
        self.adapter.point_lookup(hkey)?.ok_or_else(|| {
            warn!(%hkey, "index entry refers to a missing row");
            QueryError::RowNotFound { hkey: hkey.snapshot() }
        })
    }

    /// Queues the ancestors and the row for one index entry. Nothing is
    /// queued unless the whole chain resolves.
    fn expand(&mut self, hkey: &HKey) -> QueryResult<()> {
        let mut rows = Vec::with_capacity(self.ancestors.len() + 1);
        for &table in &self.ancestors {
            let ancestor = hkey
                .position_of(table)
                .and_then(|depth| hkey.ancestor(depth + 1))
                .ok_or_else(|| QueryError::usage(format!("table {table} is not on the path of {hkey}")))?;
            rows.push(self.fetch(&ancestor)?);
        }

        let branch = match self.node.scope {
            LookupScope::Row => {
                rows.push(self.fetch(hkey)?);
                None
            }
            LookupScope::Branch => {
                let mut branch = self.adapter.open_branch_traversal(self.node.group, hkey)?;
                if !branch.advance()? || branch.current_hkey() != Some(hkey) {
                    branch.close();
                    warn!(%hkey, "index entry refers to a missing row");
                    return Err(QueryError::RowNotFound { hkey: hkey.snapshot() });
                }
                self.stats.record_rows_read(1);
                rows.push(branch.current_row()?);
                Some(branch)
            }
        };
        self.pending.extend(rows);
        self.branch = branch;
        Ok(())
    }

    fn close_branch(&mut self) {
        if let Some(mut branch) = self.branch.take() {
            branch.close();
        }
    }
}

impl Cursor for IndexLookupCursor {
    fn open(&mut self, ctx: &ExecutionContext) -> QueryResult<()> {
        self.base.check_can_open()?;
        self.input.open(ctx)?;
        self.pending.clear();
        self.close_branch();
        self.stats = ctx.stats_handle();
        self.base.set_open();
        debug!(group = self.node.group.as_u32(), ancestors = self.ancestors.len(), "opened index lookup");
        Ok(())
    }

    fn advance(&mut self) -> QueryResult<bool> {
        if !self.base.begin_advance()? {
            return Ok(false);
        }
        loop {
            if let Some(row) = self.pending.pop_front() {
                self.base.set_current(row);
                return Ok(true);
            }
            if let Some(branch) = self.branch.as_mut() {
                if branch.advance()? {
                    let row = branch.current_row()?;
                    self.stats.record_rows_read(1);
                    self.base.set_current(row);
                    return Ok(true);
                }
                self.close_branch();
            }
            if !self.input.advance()? {
                self.base.set_exhausted();
                return Ok(false);
            }
            let hkey = self
                .input
                .current_row()?
                .hkey()
                .cloned()
                .ok_or_else(|| QueryError::usage("index lookup input row has no hkey"))?;
            self.expand(&hkey)?;
        }
    }

    fn current_row(&self) -> QueryResult<&Row> {
        self.base.current_row()
    }

    fn close(&mut self) -> QueryResult<()> {
        self.pending.clear();
        self.close_branch();
        if self.base.state().is_open() {
            debug!(group = self.node.group.as_u32(), rows = self.base.rows_produced(), "closed index lookup");
        }
        self.base.set_closed();
        self.input.close()
    }

    fn state(&self) -> CursorState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "IndexLookup"
    }

    fn rows_produced(&self) -> u64 {
        self.base.rows_produced()
    }
}
