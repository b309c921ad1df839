//! Fixtures shared by unit tests.

use std::sync::Arc;

use arbordb_core::{Catalog, HKey, Value};
use arbordb_storage::backends::RedbEngine;

use crate::error::QueryResult;

use super::adapter::Adapter;
use super::context::ExecutionContext;
use super::operator::{Cursor, CursorBase, CursorState};
use super::row::Row;
use super::row_type::Schema;
use super::store_adapter::StoreAdapter;

pub(crate) fn coi_catalog() -> Catalog {
    Catalog::builder()
        .group("coi")
        .root_table("coi", "customer", &["cid", "name"], "cid")
        .child_table("order", "customer", &["oid", "cid", "salesman"], "oid", "cid")
        .child_table("item", "order", &["iid", "oid"], "iid", "oid")
        .index("customer_name", "customer", &["name"])
        .index("order_salesman", "order", &["salesman"])
        .index("item_oid", "item", &["oid"])
        .build()
        .unwrap()
}

/// Customers 1 and 2, two orders each, two items per order.
pub(crate) fn coi_store() -> StoreAdapter<RedbEngine> {
    let store = StoreAdapter::new(Arc::new(RedbEngine::in_memory().unwrap()), Arc::new(coi_catalog()))
        .with_batch_size(3);
    let table = |name: &str| store.schema().catalog().table_by_name(name).unwrap().id;
    let (customer, order, item) = (table("customer"), table("order"), table("item"));

    for (cid, name) in [(1, "xyz"), (2, "abc")] {
        store.insert_row(customer, vec![Value::Int(cid), Value::from(name)]).unwrap();
    }
    for (oid, cid, salesman) in [(11, 1, "ori"), (12, 1, "david"), (21, 2, "tom"), (22, 2, "jack")] {
        store.insert_row(order, vec![Value::Int(oid), Value::Int(cid), Value::from(salesman)]).unwrap();
    }
    for oid in [11, 12, 21, 22] {
        for iid in [oid * 10 + 1, oid * 10 + 2] {
            store.insert_row(item, vec![Value::Int(iid), Value::Int(oid)]).unwrap();
        }
    }
    store
}

pub(crate) fn coi_adapter() -> Arc<dyn Adapter> {
    Arc::new(coi_store())
}

/// A row of `table` keyed by `path`, the primary keys from the root down.
pub(crate) fn table_row(schema: &Schema, table: &str, values: Vec<Value>, path: &[i64]) -> Row {
    let row_type = schema.table_row_type_by_name(table).unwrap();
    let tables = schema.catalog().path(row_type.table_id());
    assert_eq!(tables.len(), path.len());
    let mut hkey = HKey::new();
    for (t, pk) in tables.iter().zip(path) {
        hkey.push_segment(t.id, &Value::Int(*pk));
    }
    Row::new(row_type, values, Some(hkey))
}

/// A cursor over a fixed list of rows.
pub(crate) struct RowsCursor {
    base: CursorBase,
    rows: Vec<Row>,
    next: usize,
}

impl RowsCursor {
    pub(crate) fn new(rows: Vec<Row>) -> Self {
        Self { base: CursorBase::new("Rows"), rows, next: 0 }
    }
}

impl Cursor for RowsCursor {
    fn open(&mut self, _ctx: &ExecutionContext) -> QueryResult<()> {
        self.base.check_can_open()?;
        self.next = 0;
        self.base.set_open();
        Ok(())
    }

    fn advance(&mut self) -> QueryResult<bool> {
        if !self.base.begin_advance()? {
            return Ok(false);
        }
        match self.rows.get(self.next) {
            Some(row) => {
                self.next += 1;
                self.base.set_current(row.clone());
                Ok(true)
            }
            None => {
                self.base.set_exhausted();
                Ok(false)
            }
        }
    }

    fn current_row(&self) -> QueryResult<&Row> {
        self.base.current_row()
    }

    fn close(&mut self) -> QueryResult<()> {
        self.base.set_closed();
        Ok(())
    }

    fn state(&self) -> CursorState {
        self.base.state()
    }

    fn name(&self) -> &'static str {
        "Rows"
    }

    fn rows_produced(&self) -> u64 {
        self.base.rows_produced()
    }
}

/// Drains a cursor, rendering each row.
pub(crate) fn drain(cursor: &mut dyn Cursor) -> Vec<String> {
    cursor.open(&ExecutionContext::new()).unwrap();
    let mut out = Vec::new();
    while cursor.advance().unwrap() {
        out.push(cursor.current_row().unwrap().to_string());
    }
    cursor.close().unwrap();
    out
}
