//! An [`Adapter`] over a [`StorageEngine`].
//!
//! # Layout
//!
//! Each group, index and table primary key gets its own keyspace in the
//! engine:
//!
//! | keyspace          | key                                   | value          |
//! |-------------------|---------------------------------------|----------------|
//! | `group.<group>`   | HKey bytes                            | encoded row    |
//! | `index.<index>`   | sortable key columns, then HKey bytes | empty          |
//! | `pk.<table>`      | sortable primary key                  | HKey bytes     |
//!
//! The primary key keyspace resolves a child's foreign key to its parent's
//! HKey at insert time. A child inserted before its parent is stored under
//! an orphan key (null ancestors, then the missing parent's key) and moved
//! under the parent when the parent arrives, so group order never depends on
//! insertion order.
//!
//! Traversals read in batches, each in its own read transaction, resuming
//! strictly after the last key seen.

use std::collections::VecDeque;
use std::ops::Bound;
use std::sync::Arc;

use arbordb_core::encoding::{
    decode_row, decode_sortable_prefix, encode_row, encode_sortable, encode_sortable_to,
    prefix_successor,
};
use arbordb_core::{Catalog, CoreError, GroupId, HKey, IndexDef, IndexId, TableDef, TableId, Value};
use arbordb_storage::{Cursor as _, KeyValue, StorageEngine, Transaction};
use tracing::{debug, trace};

use crate::error::{QueryError, QueryResult};

use super::adapter::{Adapter, BoxedTraversal, Traversal};
use super::context::{ExecutionConfig, DEFAULT_BATCH_SIZE};
use super::range::IndexKeyRange;
use super::row::Row;
use super::row_type::{RowType, Schema};

/// Keyspace holding the rows of a group.
#[must_use]
pub fn group_keyspace(group: &str) -> String {
    format!("group.{group}")
}

/// Keyspace holding the entries of an index.
#[must_use]
pub fn index_keyspace(index: &str) -> String {
    format!("index.{index}")
}

/// Keyspace mapping a table's primary keys to HKeys.
#[must_use]
pub fn pk_keyspace(table: &str) -> String {
    format!("pk.{table}")
}

fn index_key(index: &IndexDef, values: &[Value], hkey: &HKey) -> Vec<u8> {
    let mut key = Vec::new();
    for &column in &index.columns {
        encode_sortable_to(values.get(column).unwrap_or(&Value::Null), &mut key);
    }
    key.extend_from_slice(hkey.as_bytes());
    key
}

/// Key of a row of `table` whose parent row does not exist: every ancestor
/// segment is null except the last, which carries `value`.
/// The form a primary or foreign key value takes in HKeys and the primary
/// key keyspace. Integral floats key like the equal integer, so a foreign
/// key finds its parent whenever the two compare equal.
fn key_value(value: &Value) -> Value {
    match *value {
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::float_cmp)]
        Value::Float(x) if x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64 => Value::Int(x as i64),
        _ => value.clone(),
    }
}

fn orphan_key(catalog: &Catalog, table: TableId, value: &Value) -> HKey {
    let mut hkey = HKey::new();
    for ancestor in catalog.path(table).iter().filter(|t| t.id != table) {
        hkey.push_segment(ancestor.id, &Value::Null);
    }
    hkey.push_segment(table, value);
    hkey
}

fn end_bound(bytes: Option<Vec<u8>>) -> Bound<Vec<u8>> {
    bytes.map_or(Bound::Unbounded, Bound::Excluded)
}

fn as_slice_bound(bound: &Bound<Vec<u8>>) -> Bound<&[u8]> {
    bound.as_ref().map(Vec::as_slice)
}

fn unknown_table(table: TableId) -> QueryError {
    QueryError::usage(format!("unknown table {table}"))
}

/// Row storage and read access for every group of a catalog.
pub struct StoreAdapter<E: StorageEngine + 'static> {
    engine: Arc<E>,
    schema: Arc<Schema>,
    batch_size: usize,
}

impl<E: StorageEngine + 'static> StoreAdapter<E> {
    /// Creates an adapter storing the groups of `catalog` in `engine`.
    #[must_use]
    pub fn new(engine: Arc<E>, catalog: Arc<Catalog>) -> Self {
        Self { engine, schema: Arc::new(Schema::new(catalog)), batch_size: DEFAULT_BATCH_SIZE }
    }

    /// Sets the number of entries traversals fetch per read transaction.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Applies the storage settings of `config`.
    #[must_use]
    pub fn with_config(self, config: &ExecutionConfig) -> Self {
        self.with_batch_size(config.batch_size)
    }

    /// Returns the row types.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the underlying engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    fn table_def(&self, table: TableId) -> QueryResult<&TableDef> {
        self.schema.catalog().table(table).ok_or_else(|| unknown_table(table))
    }

    fn group_space_of(&self, table: &TableDef) -> QueryResult<String> {
        self.schema
            .catalog()
            .group(table.group)
            .map(|g| group_keyspace(&g.name))
            .ok_or_else(|| QueryError::usage(format!("table {} has no group", table.name)))
    }

    /// Stores a row of `table` and its primary key and index entries, and
    /// returns its HKey.
    ///
    /// # Errors
    ///
    /// Returns a usage error for an unknown table, a wrong number of values
    /// or a duplicate primary key, and an adapter error if the write fails.
    pub fn insert_row(&self, table: TableId, values: Vec<Value>) -> QueryResult<HKey> {
        let catalog = self.schema.catalog();
        let def = self.table_def(table)?;
        if values.len() != def.column_count() {
            return Err(QueryError::usage(format!(
                "table {} has {} columns, got {} values",
                def.name,
                def.column_count(),
                values.len()
            )));
        }
        let group_space = self.group_space_of(def)?;
        let pk = values
            .get(def.primary_key)
            .map(key_value)
            .ok_or_else(|| QueryError::usage(format!("table {} has no primary key column", def.name)))?;

        let mut tx = self.engine.begin_write()?;
        if tx.get(&pk_keyspace(&def.name), &encode_sortable(&pk))?.is_some() {
            return Err(QueryError::usage(format!("duplicate primary key {pk} in table {}", def.name)));
        }
        let hkey = resolve_hkey(&tx, catalog, def, &values)?;
        write_row(&mut tx, &group_space, catalog, def, &hkey, &values)?;
        adopt_orphans(&mut tx, &group_space, catalog, def, &pk, &hkey)?;
        tx.commit()?;

        trace!(table = %def.name, %hkey, "inserted row");
        Ok(hkey)
    }

    /// Removes the row of `table` with primary key `pk`, along with its
    /// primary key and index entries. Descendant rows are left in place.
    ///
    /// Returns false if no such row exists.
    ///
    /// # Errors
    ///
    /// Returns a usage error for an unknown table and an adapter error if the
    /// write fails.
    pub fn delete_row(&self, table: TableId, pk: &Value) -> QueryResult<bool> {
        let catalog = self.schema.catalog();
        let def = self.table_def(table)?;
        let group_space = self.group_space_of(def)?;
        let pk_space = pk_keyspace(&def.name);
        let pk_key = encode_sortable(&key_value(pk));

        let mut tx = self.engine.begin_write()?;
        let Some(hkey_bytes) = tx.get(&pk_space, &pk_key)? else {
            return Ok(false);
        };
        let hkey = HKey::from_bytes(&hkey_bytes)?;
        if let Some(row) = tx.get(&group_space, hkey.as_bytes())? {
            let values = decode_row(&row)?;
            for index in catalog.indexes_on(def.id) {
                tx.delete(&index_keyspace(&index.name), &index_key(index, &values, &hkey))?;
            }
            tx.delete(&group_space, hkey.as_bytes())?;
        }
        tx.delete(&pk_space, &pk_key)?;
        tx.commit()?;

        trace!(table = %def.name, %hkey, "deleted row");
        Ok(true)
    }

    fn traversal(
        &self,
        keyspace: String,
        kind: EntryKind,
        bounds: Option<(Bound<Vec<u8>>, Bound<Vec<u8>>)>,
    ) -> BoxedTraversal {
        let (resume, end, has_more) = match bounds {
            Some((start, end)) => (start, end, true),
            None => (Bound::Unbounded, Bound::Unbounded, false),
        };
        Box::new(StoreTraversal {
            engine: Arc::clone(&self.engine),
            schema: Arc::clone(&self.schema),
            keyspace,
            kind,
            resume,
            end,
            has_more,
            batch: VecDeque::new(),
            batch_size: self.batch_size,
            hkey: HKey::new(),
            index_values: Vec::new(),
            current: None,
        })
    }
}

/// Computes the HKey of a new row: its parent's key (or an orphan key if the
/// parent is absent) extended by the row's own segment.
fn resolve_hkey<T: Transaction>(tx: &T, catalog: &Catalog, def: &TableDef, values: &[Value]) -> QueryResult<HKey> {
    let pk = values
        .get(def.primary_key)
        .map(key_value)
        .ok_or_else(|| QueryError::usage(format!("table {} has no primary key column", def.name)))?;
    let Some(join) = def.parent else {
        return Ok(HKey::from_segments(&[(def.id, pk)]));
    };
    let parent = catalog.table(join.table).ok_or_else(|| unknown_table(join.table))?;
    let fk = values.get(join.column).map_or(Value::Null, key_value);
    let mut hkey = match tx.get(&pk_keyspace(&parent.name), &encode_sortable(&fk))? {
        Some(bytes) => HKey::from_bytes(&bytes)?,
        None => orphan_key(catalog, parent.id, &fk),
    };
    hkey.push_segment(def.id, &pk);
    Ok(hkey)
}

fn write_row<T: Transaction>(
    tx: &mut T,
    group_space: &str,
    catalog: &Catalog,
    def: &TableDef,
    hkey: &HKey,
    values: &[Value],
) -> QueryResult<()> {
    tx.put(group_space, hkey.as_bytes(), &encode_row(values)?)?;
    if let Some(pk) = values.get(def.primary_key) {
        tx.put(&pk_keyspace(&def.name), &encode_sortable(&key_value(pk)), hkey.as_bytes())?;
    }
    for index in catalog.indexes_on(def.id) {
        tx.put(&index_keyspace(&index.name), &index_key(index, values, hkey), &[])?;
    }
    Ok(())
}

/// Moves rows stored under the orphan key of the new row to its real key.
fn adopt_orphans<T: Transaction>(
    tx: &mut T,
    group_space: &str,
    catalog: &Catalog,
    def: &TableDef,
    pk: &Value,
    hkey: &HKey,
) -> QueryResult<()> {
    let orphan = orphan_key(catalog, def.id, pk);
    if orphan == *hkey {
        return Ok(());
    }
    let end = end_bound(prefix_successor(orphan.as_bytes()));
    let adopted: Vec<KeyValue> = {
        let mut cursor = tx.range(group_space, Bound::Included(orphan.as_bytes()), as_slice_bound(&end))?;
        let mut entries = Vec::new();
        while let Some(entry) = cursor.next()? {
            entries.push(entry);
        }
        entries
    };
    if adopted.is_empty() {
        return Ok(());
    }

    let prefix_len = orphan.as_bytes().len();
    for (old_bytes, row) in &adopted {
        let old = HKey::from_bytes(old_bytes)?;
        let mut new_bytes = hkey.as_bytes().to_vec();
        new_bytes.extend_from_slice(&old_bytes[prefix_len..]);
        let new = HKey::from_bytes(&new_bytes)?;

        let table = old
            .last_table()
            .and_then(|t| catalog.table(t))
            .ok_or_else(|| CoreError::Encoding(format!("stored key {old} names no table")))?;
        let values = decode_row(row)?;
        tx.delete(group_space, old_bytes)?;
        for index in catalog.indexes_on(table.id) {
            tx.delete(&index_keyspace(&index.name), &index_key(index, &values, &old))?;
        }
        write_row(tx, group_space, catalog, table, &new, &values)?;
    }
    debug!(table = %def.name, %hkey, count = adopted.len(), "adopted orphan rows");
    Ok(())
}

impl<E: StorageEngine + 'static> Adapter for StoreAdapter<E> {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn open_group_traversal(&self, group: GroupId) -> QueryResult<BoxedTraversal> {
        let def = self
            .schema
            .catalog()
            .group(group)
            .ok_or_else(|| QueryError::usage(format!("unknown group {}", group.as_u32())))?;
        let bounds = (Bound::Unbounded, Bound::Unbounded);
        Ok(self.traversal(group_keyspace(&def.name), EntryKind::Row, Some(bounds)))
    }

    fn open_branch_traversal(&self, group: GroupId, root: &HKey) -> QueryResult<BoxedTraversal> {
        let def = self
            .schema
            .catalog()
            .group(group)
            .ok_or_else(|| QueryError::usage(format!("unknown group {}", group.as_u32())))?;
        let bounds = (Bound::Included(root.as_bytes().to_vec()), end_bound(prefix_successor(root.as_bytes())));
        Ok(self.traversal(group_keyspace(&def.name), EntryKind::Row, Some(bounds)))
    }

    fn open_index_traversal(&self, index: IndexId, range: &IndexKeyRange) -> QueryResult<BoxedTraversal> {
        let catalog = self.schema.catalog();
        let def = catalog
            .index(index)
            .ok_or_else(|| QueryError::usage(format!("unknown index {}", index.as_u32())))?;
        let row_type = self
            .schema
            .index_row_type(index)
            .ok_or_else(|| QueryError::usage(format!("unknown index {}", def.name)))?;
        let kind = EntryKind::Index { key_columns: def.columns.len(), row_type };
        Ok(self.traversal(index_keyspace(&def.name), kind, range.to_byte_bounds()))
    }

    fn point_lookup(&self, hkey: &HKey) -> QueryResult<Option<Row>> {
        let catalog = self.schema.catalog();
        let root = hkey.table_at(0).ok_or_else(|| QueryError::usage("point lookup with an empty key"))?;
        let table = hkey.last_table().ok_or_else(|| QueryError::usage("point lookup with an empty key"))?;
        let group_space = self.group_space_of(catalog.table(root).ok_or_else(|| unknown_table(root))?)?;
        let row_type = self.schema.table_row_type(table).ok_or_else(|| unknown_table(table))?;

        let tx = self.engine.begin_read()?;
        let Some(bytes) = tx.get(&group_space, hkey.as_bytes())? else {
            return Ok(None);
        };
        Ok(Some(Row::new(row_type, decode_row(&bytes)?, Some(hkey.snapshot()))))
    }
}

enum EntryKind {
    /// Group rows keyed by HKey.
    Row,
    /// Index entries: `key_columns` sortable values, then an HKey.
    Index { key_columns: usize, row_type: Arc<RowType> },
}

struct StoreTraversal<E: StorageEngine + 'static> {
    engine: Arc<E>,
    schema: Arc<Schema>,
    keyspace: String,
    kind: EntryKind,
    /// Start of the next batch.
    resume: Bound<Vec<u8>>,
    end: Bound<Vec<u8>>,
    /// False once a batch came back short.
    has_more: bool,
    batch: VecDeque<KeyValue>,
    batch_size: usize,
    hkey: HKey,
    index_values: Vec<Value>,
    current: Option<KeyValue>,
}

impl<E: StorageEngine + 'static> StoreTraversal<E> {
    fn fill(&mut self) -> QueryResult<()> {
        let tx = self.engine.begin_read()?;
        let mut cursor = tx.range(&self.keyspace, as_slice_bound(&self.resume), as_slice_bound(&self.end))?;
        while self.batch.len() < self.batch_size {
            match cursor.next()? {
                Some(entry) => self.batch.push_back(entry),
                None => {
                    self.has_more = false;
                    break;
                }
            }
        }
        if let Some((last, _)) = self.batch.back() {
            self.resume = Bound::Excluded(last.clone());
        }
        trace!(keyspace = %self.keyspace, entries = self.batch.len(), "fetched traversal batch");
        Ok(())
    }
}

impl<E: StorageEngine + 'static> Traversal for StoreTraversal<E> {
    fn advance(&mut self) -> QueryResult<bool> {
        if self.batch.is_empty() && self.has_more {
            self.fill()?;
        }
        let Some((key, value)) = self.batch.pop_front() else {
            self.current = None;
            return Ok(false);
        };
        match &self.kind {
            EntryKind::Row => self.hkey.reset_from_bytes(&key)?,
            EntryKind::Index { key_columns, .. } => {
                self.index_values.clear();
                let mut offset = 0;
                for _ in 0..*key_columns {
                    let (value, used) = decode_sortable_prefix(&key[offset..])?;
                    self.index_values.push(value);
                    offset += used;
                }
                self.hkey.reset_from_bytes(&key[offset..])?;
            }
        }
        self.current = Some((key, value));
        Ok(true)
    }

    fn current_hkey(&self) -> Option<&HKey> {
        self.current.as_ref().map(|_| &self.hkey)
    }

    fn current_row(&self) -> QueryResult<Row> {
        let (_, value) =
            self.current.as_ref().ok_or_else(|| QueryError::usage("traversal is not positioned on an entry"))?;
        match &self.kind {
            EntryKind::Row => {
                let table = self
                    .hkey
                    .last_table()
                    .ok_or_else(|| CoreError::Encoding("stored row has an empty key".to_owned()))?;
                let row_type = self
                    .schema
                    .table_row_type(table)
                    .ok_or_else(|| CoreError::Encoding(format!("stored key names unknown table {table}")))?;
                Ok(Row::new(row_type, decode_row(value)?, Some(self.hkey.snapshot())))
            }
            EntryKind::Index { row_type, .. } => {
                Ok(Row::new(Arc::clone(row_type), self.index_values.clone(), Some(self.hkey.snapshot())))
            }
        }
    }

    fn close(&mut self) {
        self.batch.clear();
        self.current = None;
        self.has_more = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbordb_storage::backends::RedbEngine;

    fn store() -> StoreAdapter<RedbEngine> {
        let catalog = Catalog::builder()
            .group("coi")
            .root_table("coi", "customer", &["cid", "name"], "cid")
            .child_table("order", "customer", &["oid", "cid", "salesman"], "oid", "cid")
            .child_table("item", "order", &["iid", "oid"], "iid", "oid")
            .index("order_salesman", "order", &["salesman"])
            .index("item_oid", "item", &["oid"])
            .build()
            .unwrap();
        StoreAdapter::new(Arc::new(RedbEngine::in_memory().unwrap()), Arc::new(catalog)).with_batch_size(2)
    }

    fn table(store: &StoreAdapter<RedbEngine>, name: &str) -> TableId {
        store.schema().catalog().table_by_name(name).unwrap().id
    }

    fn hkeys(store: &StoreAdapter<RedbEngine>) -> Vec<String> {
        let group = store.schema().catalog().group_by_name("coi").unwrap().id;
        let mut traversal = store.open_group_traversal(group).unwrap();
        let mut out = Vec::new();
        while traversal.advance().unwrap() {
            out.push(traversal.current_hkey().unwrap().to_string());
        }
        out
    }

    #[test]
    fn child_key_extends_parent_key() {
        let store = store();
        let c = store.insert_row(table(&store, "customer"), vec![Value::Int(1), Value::from("xyz")]).unwrap();
        let o = store
            .insert_row(table(&store, "order"), vec![Value::Int(11), Value::Int(1), Value::from("ori")])
            .unwrap();
        assert!(c.is_prefix_of(&o));
        assert_eq!(o.to_string(), "{1,1,2,11}");
    }

    #[test]
    fn orphans_are_adopted_by_late_parents() {
        let store = store();
        store.insert_row(table(&store, "item"), vec![Value::Int(111), Value::Int(11)]).unwrap();
        store
            .insert_row(table(&store, "order"), vec![Value::Int(11), Value::Int(1), Value::from("ori")])
            .unwrap();
        store.insert_row(table(&store, "customer"), vec![Value::Int(1), Value::from("xyz")]).unwrap();
        assert_eq!(hkeys(&store), ["{1,1}", "{1,1,2,11}", "{1,1,2,11,3,111}"]);

        let item = store.insert_row(table(&store, "item"), vec![Value::Int(112), Value::Int(11)]).unwrap();
        assert_eq!(item.to_string(), "{1,1,2,11,3,112}");

        let group = store.schema().catalog().group_by_name("coi").unwrap().id;
        let root = HKey::from_segments(&[(table(&store, "customer"), Value::Int(1))]);
        let mut branch = store.open_branch_traversal(group, &root).unwrap();
        let mut count = 0;
        while branch.advance().unwrap() {
            count += 1;
        }
        assert_eq!(count, 4);
    }

    #[test]
    fn adopted_rows_keep_index_entries_current() {
        let store = store();
        store.insert_row(table(&store, "item"), vec![Value::Int(211), Value::Int(21)]).unwrap();
        store
            .insert_row(table(&store, "order"), vec![Value::Int(21), Value::Int(2), Value::from("tom")])
            .unwrap();
        store.insert_row(table(&store, "customer"), vec![Value::Int(2), Value::from("abc")]).unwrap();

        let index = store.schema().catalog().index_by_name("item_oid").unwrap().id;
        let mut traversal = store.open_index_traversal(index, &IndexKeyRange::unbounded()).unwrap();
        assert!(traversal.advance().unwrap());
        let row = traversal.current_row().unwrap();
        assert_eq!(row.values(), [Value::Int(21)]);
        assert_eq!(row.hkey().unwrap().to_string(), "{1,2,2,21,3,211}");
        assert!(!traversal.advance().unwrap());
        assert!(store.point_lookup(row.hkey().unwrap()).unwrap().is_some());
    }

    #[test]
    fn duplicate_primary_key_is_rejected() {
        let store = store();
        let customer = table(&store, "customer");
        store.insert_row(customer, vec![Value::Int(1), Value::from("xyz")]).unwrap();
        let err = store.insert_row(customer, vec![Value::Int(1), Value::from("abc")]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Usage);
        let err = store.insert_row(customer, vec![Value::Int(3)]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Usage);
    }

    #[test]
    fn float_foreign_key_finds_integer_parent() {
        let store = store();
        let (customer, order) = (table(&store, "customer"), table(&store, "order"));
        let parent = store.insert_row(customer, vec![Value::Int(1), Value::from("xyz")]).unwrap();
        let child = store
            .insert_row(order, vec![Value::Int(11), Value::Float(1.0), Value::from("ori")])
            .unwrap();
        assert!(parent.is_prefix_of(&child));
        assert_eq!(child.to_string(), "{1,1,2,11}");

        let orphan = store
            .insert_row(order, vec![Value::Float(12.0), Value::Float(2.5), Value::from("tom")])
            .unwrap();
        assert!(!parent.is_prefix_of(&orphan));
        assert!(store.delete_row(order, &Value::Int(12)).unwrap());
    }

    #[test]
    fn point_lookup_and_delete() {
        let store = store();
        let customer = table(&store, "customer");
        let hkey = store.insert_row(customer, vec![Value::Int(1), Value::from("xyz")]).unwrap();
        let row = store.point_lookup(&hkey).unwrap().unwrap();
        assert_eq!(row.get_by_name("name"), Some(&Value::from("xyz")));

        assert!(store.delete_row(customer, &Value::Int(1)).unwrap());
        assert!(!store.delete_row(customer, &Value::Int(1)).unwrap());
        assert!(store.point_lookup(&hkey).unwrap().is_none());
    }

    #[test]
    fn empty_range_yields_nothing() {
        let store = store();
        store
            .insert_row(table(&store, "order"), vec![Value::Int(21), Value::Int(2), Value::from("tom")])
            .unwrap();
        let index = store.schema().catalog().index_by_name("order_salesman").unwrap().id;
        let range = IndexKeyRange::at_least(crate::exec::range::IndexBound::exclusive(vec![]));
        let mut traversal = store.open_index_traversal(index, &range).unwrap();
        assert!(!traversal.advance().unwrap());
        assert!(traversal.current_row().is_err());
    }
}
