//! Main query executor.
//!
//! This module provides [`build_cursor`], which turns a physical operator
//! tree into cursors, and the [`Executor`] that binds, opens and drains them.

use std::sync::Arc;

use arbordb_core::{Catalog, TableId};
use tracing::{debug, warn};

use crate::error::{QueryError, QueryResult};
use crate::plan::physical::PhysicalOperator;

use super::adapter::Adapter;
use super::bindings::{Binding, BindingKey, Bindings};
use super::context::{ExecutionConfig, ExecutionContext, ExecutionStats};
use super::operator::{BoxedCursor, CursorState};
use super::operators::{FlattenCursor, GroupScanCursor, IndexLookupCursor, IndexScanCursor, SelectCursor};
use super::row::Row;

/// Builds the cursor tree for `plan`, checking its static parameters
/// against the adapter's catalog.
///
/// # Errors
///
/// Returns a usage error if the plan names an unknown group or index, if a
/// flatten's child type is not a child of its parent type, or if an index
/// lookup names a group other than the indexed table's or asks for an
/// ancestor the indexed table does not have.
pub fn build_cursor(plan: &PhysicalOperator, adapter: &Arc<dyn Adapter>) -> QueryResult<BoxedCursor> {
    let catalog = adapter.schema().catalog();
    let cursor: BoxedCursor = match plan {
        PhysicalOperator::GroupScan(node) => {
            check_group(catalog, node.group)?;
            Box::new(GroupScanCursor::new(node.group, Arc::clone(adapter)))
        }
        PhysicalOperator::Select { node, input } => {
            Box::new(SelectCursor::new(node.clone(), build_cursor(input, adapter)?))
        }
        PhysicalOperator::Flatten { node, input } => {
            let child_parent = catalog.table(node.child.table_id()).and_then(|t| t.parent).map(|p| p.table);
            if node.parent.is_index() || node.child.is_index() || child_parent != Some(node.parent.table_id()) {
                return Err(QueryError::usage(format!(
                    "cannot flatten {} into {}: not a parent and child",
                    node.child.name(),
                    node.parent.name()
                )));
            }
            Box::new(FlattenCursor::new(node.clone(), build_cursor(input, adapter)?))
        }
        PhysicalOperator::IndexScan(node) => {
            let index = node
                .row_type
                .index_id()
                .filter(|id| catalog.index(*id).is_some())
                .ok_or_else(|| QueryError::usage(format!("{} is not a known index", node.row_type.name())))?;
            debug!(index = index.as_u32(), binding = %node.binding_key(), "built index scan");
            Box::new(IndexScanCursor::new(node.clone(), Arc::clone(adapter)))
        }
        PhysicalOperator::IndexLookup { node, input } => {
            check_group(catalog, node.group)?;
            let table = indexed_table(input).ok_or_else(|| {
                QueryError::usage(format!("{} input of index lookup does not produce index rows", input.name()))
            })?;
            if catalog.table(table).map(|t| t.group) != Some(node.group) {
                return Err(QueryError::usage(format!(
                    "index lookup in group {} over an index on a table outside it",
                    node.group.as_u32()
                )));
            }
            let path: Vec<TableId> = catalog.path(table).iter().map(|t| t.id).collect();
            let mut ancestors = Vec::with_capacity(node.ancestors.len());
            for ancestor in &node.ancestors {
                let id = ancestor.table_id();
                if ancestor.is_index() || !catalog.is_ancestor(id, table) {
                    return Err(QueryError::usage(format!(
                        "{} is not an ancestor of the indexed table",
                        ancestor.name()
                    )));
                }
                if !ancestors.contains(&id) {
                    ancestors.push(id);
                }
            }
            ancestors.sort_by_key(|id| path.iter().position(|t| t == id));
            Box::new(IndexLookupCursor::new(node.clone(), ancestors, build_cursor(input, adapter)?, Arc::clone(adapter)))
        }
    };
    Ok(cursor)
}

fn check_group(catalog: &Catalog, group: arbordb_core::GroupId) -> QueryResult<()> {
    catalog
        .group(group)
        .map(|_| ())
        .ok_or_else(|| QueryError::usage(format!("unknown group {}", group.as_u32())))
}

/// The table whose index rows `plan` produces, if it produces index rows.
fn indexed_table(plan: &PhysicalOperator) -> Option<TableId> {
    match plan {
        PhysicalOperator::IndexScan(node) => Some(node.row_type.table_id()),
        PhysicalOperator::Select { input, .. } => indexed_table(input),
        _ => None,
    }
}

/// Builds and drives a cursor tree.
///
/// The executor owns the bindings for the tree. Bind parameters while the
/// tree is closed, then open it and pull rows; close it and bind again to
/// re-run with new parameters. Dropping an open executor closes it.
pub struct Executor {
    /// The root cursor of the tree.
    root: BoxedCursor,
    /// Execution context.
    ctx: ExecutionContext,
}

impl Executor {
    /// Creates an executor for `plan` with default configuration.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the plan is invalid for the adapter's catalog.
    pub fn new(plan: &PhysicalOperator, adapter: &Arc<dyn Adapter>) -> QueryResult<Self> {
        Self::with_config(plan, adapter, ExecutionConfig::default())
    }

    /// Creates an executor with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid settings, or a usage error
    /// if the plan is invalid for the adapter's catalog.
    pub fn with_config(
        plan: &PhysicalOperator,
        adapter: &Arc<dyn Adapter>,
        config: ExecutionConfig,
    ) -> QueryResult<Self> {
        config.validate()?;
        let root = build_cursor(plan, adapter)?;
        Ok(Self { root, ctx: ExecutionContext::with_config(config) })
    }

    /// Binds `value` to `key` for the next run.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the tree is open.
    pub fn bind(&mut self, key: impl Into<BindingKey>, value: impl Into<Binding>) -> QueryResult<()> {
        if self.root.state().is_open() {
            return Err(QueryError::usage("bindings cannot change while the tree is open"));
        }
        self.ctx.bindings_mut().set(key, value);
        Ok(())
    }

    /// Returns the current bindings.
    #[must_use]
    pub fn bindings(&self) -> &Bindings {
        self.ctx.bindings()
    }

    /// Opens the tree.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the tree is already open, a binding error if a
    /// required parameter is unbound, or an adapter error.
    pub fn open(&mut self) -> QueryResult<()> {
        if self.root.state().is_open() {
            return Err(QueryError::usage("tree opened twice without close"));
        }
        if let Err(e) = self.root.open(&self.ctx) {
            // release whatever the partially opened tree holds
            let _ = self.root.close();
            return Err(e);
        }
        Ok(())
    }

    /// Advances the tree. Returns false once exhausted.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the tree.
    pub fn advance(&mut self) -> QueryResult<bool> {
        let produced = self.root.advance()?;
        if produced {
            self.ctx.stats().record_rows_produced(1);
        }
        Ok(produced)
    }

    /// The row produced by the last successful advance.
    ///
    /// # Errors
    ///
    /// Returns a usage error if no row is current.
    pub fn current_row(&self) -> QueryResult<&Row> {
        self.root.current_row()
    }

    /// Advances and returns a copy of the new current row.
    ///
    /// # Errors
    ///
    /// Returns any error raised by the tree.
    pub fn next_row(&mut self) -> QueryResult<Option<Row>> {
        if self.advance()? {
            Ok(Some(self.root.current_row()?.clone()))
        } else {
            Ok(None)
        }
    }

    /// Closes the tree. Safe to call in any state.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while closing cursors.
    pub fn close(&mut self) -> QueryResult<()> {
        if self.root.state().is_open() && self.ctx.config().collect_stats {
            let stats = self.ctx.stats();
            debug!(
                root = self.root.name(),
                rows_read = stats.rows_read(),
                rows_filtered = stats.rows_filtered(),
                rows_produced = stats.rows_produced(),
                elapsed_us = stats.elapsed().as_micros(),
                "execution statistics"
            );
        }
        self.root.close()
    }

    /// Opens the tree, collects every row and closes it.
    ///
    /// # Errors
    ///
    /// Returns the first error raised; the tree is closed either way.
    pub fn collect(&mut self) -> QueryResult<Vec<Row>> {
        self.open()?;
        let mut rows = Vec::new();
        loop {
            match self.next_row() {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => break,
                Err(e) => {
                    let _ = self.close();
                    return Err(e);
                }
            }
        }
        self.close()?;
        Ok(rows)
    }

    /// Opens the tree, counts its rows and closes it.
    ///
    /// # Errors
    ///
    /// Returns the first error raised; the tree is closed either way.
    pub fn count(&mut self) -> QueryResult<usize> {
        self.open()?;
        let mut count = 0;
        loop {
            match self.advance() {
                Ok(true) => count += 1,
                Ok(false) => break,
                Err(e) => {
                    let _ = self.close();
                    return Err(e);
                }
            }
        }
        self.close()?;
        Ok(count)
    }

    /// Returns the statistics accumulated across every run.
    #[must_use]
    pub fn stats(&self) -> &ExecutionStats {
        self.ctx.stats()
    }

    /// Returns the execution context.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Returns the state of the root cursor.
    #[must_use]
    pub fn state(&self) -> CursorState {
        self.root.state()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        if self.root.state().is_open() {
            if let Err(e) = self.root.close() {
                warn!(error = %e, "failed to close cursor tree on drop");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::exec::testing::coi_adapter;
    use crate::exec::store_adapter::StoreAdapter;
    use crate::plan::physical::{IndexLookupNode, IndexScanNode, LookupScope};
    use arbordb_core::Value;
    use arbordb_storage::backends::RedbEngine;

    #[test]
    fn flatten_requires_parent_and_child() {
        let adapter = coi_adapter();
        let schema = adapter.schema();
        let group = schema.catalog().group_by_name("coi").unwrap().id;
        let customer = schema.table_row_type_by_name("customer").unwrap();
        let item = schema.table_row_type_by_name("item").unwrap();
        let plan = PhysicalOperator::flatten(PhysicalOperator::group_scan(group), customer, item);
        let err = build_cursor(&plan, &adapter).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn unknown_group_is_rejected() {
        let adapter = coi_adapter();
        let plan = PhysicalOperator::group_scan(arbordb_core::GroupId::new(9));
        assert_eq!(build_cursor(&plan, &adapter).err().unwrap().kind(), ErrorKind::Usage);
    }

    #[test]
    fn lookup_ancestors_must_be_ancestors() {
        let adapter = coi_adapter();
        let schema = adapter.schema();
        let group = schema.catalog().group_by_name("coi").unwrap().id;
        let index = schema.index_row_type_by_name("order_salesman").unwrap();
        let item = schema.table_row_type_by_name("item").unwrap();
        let plan = PhysicalOperator::index_lookup(
            PhysicalOperator::index_scan(IndexScanNode::new(index)),
            IndexLookupNode::new(group, vec![item]),
        );
        assert_eq!(build_cursor(&plan, &adapter).err().unwrap().kind(), ErrorKind::Usage);

        let plan = PhysicalOperator::index_lookup(PhysicalOperator::group_scan(group), IndexLookupNode::new(group, vec![]));
        assert_eq!(build_cursor(&plan, &adapter).err().unwrap().kind(), ErrorKind::Usage);
    }

    #[test]
    fn lookup_group_must_own_indexed_table() {
        let catalog = Catalog::builder()
            .group("coi")
            .root_table("coi", "customer", &["cid", "name"], "cid")
            .index("customer_name", "customer", &["name"])
            .group("vendors")
            .root_table("vendors", "vendor", &["vid", "name"], "vid")
            .build()
            .unwrap();
        let store = StoreAdapter::new(Arc::new(RedbEngine::in_memory().unwrap()), Arc::new(catalog));
        let customer = store.schema().catalog().table_by_name("customer").unwrap().id;
        store.insert_row(customer, vec![Value::Int(1), Value::from("xyz")]).unwrap();
        let adapter: Arc<dyn Adapter> = Arc::new(store);

        let schema = adapter.schema();
        let vendors = schema.catalog().group_by_name("vendors").unwrap().id;
        let index = schema.index_row_type_by_name("customer_name").unwrap();
        for scope in [LookupScope::Branch, LookupScope::Row] {
            let plan = PhysicalOperator::index_lookup(
                PhysicalOperator::index_scan(IndexScanNode::new(Arc::clone(&index))),
                IndexLookupNode::new(vendors, vec![]).with_scope(scope),
            );
            assert_eq!(build_cursor(&plan, &adapter).err().unwrap().kind(), ErrorKind::Usage);
        }
    }

    #[test]
    fn bind_while_open_is_rejected() {
        let adapter = coi_adapter();
        let group = adapter.schema().catalog().group_by_name("coi").unwrap().id;
        let mut executor = Executor::new(&PhysicalOperator::group_scan(group), &adapter).unwrap();
        executor.open().unwrap();
        let err = executor.bind(BindingKey::Slot(0), arbordb_core::Value::Int(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(executor.open().unwrap_err().kind(), ErrorKind::Usage);
        executor.close().unwrap();
        executor.close().unwrap();
        executor.bind(BindingKey::Slot(0), arbordb_core::Value::Int(1)).unwrap();
        assert_eq!(executor.bindings().len(), 1);
    }

    #[test]
    fn stats_count_rows() {
        let adapter = coi_adapter();
        let group = adapter.schema().catalog().group_by_name("coi").unwrap().id;
        let config = ExecutionConfig::new().with_stats();
        let mut executor = Executor::with_config(&PhysicalOperator::group_scan(group), &adapter, config).unwrap();
        assert_eq!(executor.count().unwrap(), 14);
        assert_eq!(executor.stats().rows_read(), 14);
        assert_eq!(executor.stats().rows_produced(), 14);
        assert_eq!(executor.state(), CursorState::Closed);
    }
}
