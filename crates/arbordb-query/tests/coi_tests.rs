//! Operator tests over a customer/order/item group.
//!
//! These tests verify:
//! - Group scans in depth-first order, independent of insertion order
//! - Select and flatten over hierarchical streams
//! - Index scans with bound ranges, and rebinding
//! - Index lookups with ancestors
//! - Error handling

use std::sync::{Arc, Once};

use arbordb_core::{Catalog, GroupId, HKey, Value};
use arbordb_query::exec::store_adapter::group_keyspace;
use arbordb_query::{
    Adapter, BindingKey, Comparison, ErrorKind, ExecutionConfig, Executor, IndexBound,
    IndexKeyRange, IndexLookupNode, IndexScanNode, LookupScope, PhysicalOperator, Row, RowType,
    StoreAdapter,
};
use arbordb_storage::backends::RedbEngine;
use arbordb_storage::{StorageEngine, Transaction};
use proptest::prelude::*;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn catalog() -> Catalog {
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

/// Rows of the fixture as (table, values), parents first.
fn fixture_rows() -> Vec<(&'static str, Vec<Value>)> {
    let mut rows = vec![
        ("customer", vec![Value::Int(1), Value::from("xyz")]),
        ("customer", vec![Value::Int(2), Value::from("abc")]),
    ];
    for (oid, cid, salesman) in [(11, 1, "ori"), (12, 1, "david"), (21, 2, "tom"), (22, 2, "jack")] {
        rows.push(("order", vec![Value::Int(oid), Value::Int(cid), Value::from(salesman)]));
    }
    for oid in [11i64, 12, 21, 22] {
        for iid in [oid * 10 + 1, oid * 10 + 2] {
            rows.push(("item", vec![Value::Int(iid), Value::Int(oid)]));
        }
    }
    rows
}

struct Fixture {
    store: Arc<StoreAdapter<RedbEngine>>,
    adapter: Arc<dyn Adapter>,
    group: GroupId,
    customer: Arc<RowType>,
    order: Arc<RowType>,
    item: Arc<RowType>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_rows(fixture_rows(), ExecutionConfig::new().with_batch_size(4))
    }

    fn with_rows(rows: Vec<(&'static str, Vec<Value>)>, config: ExecutionConfig) -> Self {
        init_tracing();
        let engine = Arc::new(RedbEngine::in_memory().unwrap());
        let store = Arc::new(StoreAdapter::new(engine, Arc::new(catalog())).with_config(&config));
        for (table, values) in rows {
            let id = store.schema().catalog().table_by_name(table).unwrap().id;
            store.insert_row(id, values).unwrap();
        }
        let schema = store.schema();
        Self {
            group: schema.catalog().group_by_name("coi").unwrap().id,
            customer: schema.table_row_type_by_name("customer").unwrap(),
            order: schema.table_row_type_by_name("order").unwrap(),
            item: schema.table_row_type_by_name("item").unwrap(),
            adapter: Arc::clone(&store) as Arc<dyn Adapter>,
            store,
        }
    }

    fn index(&self, name: &str) -> Arc<RowType> {
        self.store.schema().index_row_type_by_name(name).unwrap()
    }

    fn run(&self, plan: &PhysicalOperator) -> Vec<Row> {
        Executor::new(plan, &self.adapter).unwrap().collect().unwrap()
    }

    fn hkey(&self, path: &[i64]) -> HKey {
        let tables = [&self.customer, &self.order, &self.item];
        let segments: Vec<_> = tables.iter().zip(path).map(|(t, v)| (t.table_id(), Value::Int(*v))).collect();
        HKey::from_segments(&segments)
    }

    /// Removes a stored row without touching its index entries.
    fn delete_row_only(&self, path: &[i64]) {
        let mut tx = self.store.engine().begin_write().unwrap();
        assert!(tx.delete(&group_keyspace("coi"), self.hkey(path).as_bytes()).unwrap());
        tx.commit().unwrap();
    }
}

/// Renders rows as `table:pk`.
fn keys(rows: &[Row]) -> Vec<String> {
    rows.iter().map(|r| format!("{}:{}", r.row_type().name(), r.values()[0])).collect()
}

fn hkeys(rows: &[Row]) -> Vec<String> {
    rows.iter().map(|r| r.hkey().unwrap().to_string()).collect()
}

const GROUP_ORDER: [&str; 14] = [
    "customer:1",
    "order:11",
    "item:111",
    "item:112",
    "order:12",
    "item:121",
    "item:122",
    "customer:2",
    "order:21",
    "item:211",
    "item:212",
    "order:22",
    "item:221",
    "item:222",
];

// ============================================================================
// Group Scan Tests
// ============================================================================

mod group_scan {
    use super::*;

    #[test]
    fn yields_depth_first_preorder() {
        let f = Fixture::new();
        let rows = f.run(&PhysicalOperator::group_scan(f.group));
        assert_eq!(keys(&rows), GROUP_ORDER);
    }

    #[test]
    fn prefix_relation_matches_hierarchy() {
        let f = Fixture::new();
        let rows = f.run(&PhysicalOperator::group_scan(f.group));
        let parent_of = |row: &Row| -> Option<String> {
            match row.row_type().name() {
                "order" => Some(format!("customer:{}", row.values()[1])),
                "item" => Some(format!("order:{}", row.values()[1])),
                _ => None,
            }
        };
        let key = |row: &Row| format!("{}:{}", row.row_type().name(), row.values()[0]);
        let is_ancestor = |a: &Row, d: &Row| {
            let mut current = parent_of(d);
            while let Some(p) = current {
                if p == key(a) {
                    return true;
                }
                current = rows.iter().find(|r| key(*r) == p).and_then(|r| parent_of(r));
            }
            false
        };
        for a in &rows {
            for d in &rows {
                assert_eq!(a.is_ancestor_of(d), is_ancestor(a, d), "{a} / {d}");
            }
        }
    }

    #[test]
    fn single_row_batches() {
        let config = ExecutionConfig::from_toml_str("batch_size = 1").unwrap();
        let f = Fixture::with_rows(fixture_rows(), config);
        assert_eq!(keys(&f.run(&PhysicalOperator::group_scan(f.group))), GROUP_ORDER);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn order_is_independent_of_insertion_order(rows in Just(fixture_rows()).prop_shuffle()) {
            let f = Fixture::with_rows(rows, ExecutionConfig::new().with_batch_size(5));
            let scanned = f.run(&PhysicalOperator::group_scan(f.group));
            prop_assert_eq!(keys(&scanned), GROUP_ORDER);
            prop_assert_eq!(scanned[2].hkey().unwrap(), &f.hkey(&[1, 11, 111]));
        }
    }
}

// ============================================================================
// Select and Flatten Tests
// ============================================================================

mod select_flatten {
    use super::*;

    #[test]
    fn select_keeps_matching_customer_subtree() {
        let f = Fixture::new();
        let plan = PhysicalOperator::select(
            PhysicalOperator::group_scan(f.group),
            Arc::clone(&f.customer),
            Comparison::eq(0, 2i64),
        );
        let rows = f.run(&plan);
        assert_eq!(keys(&rows), GROUP_ORDER[7..]);
    }

    #[test]
    fn select_passes_other_types_of_surviving_parents() {
        let f = Fixture::new();
        let plan = PhysicalOperator::select(
            PhysicalOperator::group_scan(f.group),
            Arc::clone(&f.order),
            Comparison::eq(2, "tom"),
        );
        let rows = f.run(&plan);
        assert_eq!(keys(&rows), ["customer:1", "customer:2", "order:21", "item:211", "item:212"]);
    }

    #[test]
    fn flatten_customer_order() {
        let f = Fixture::new();
        let plan =
            PhysicalOperator::flatten(PhysicalOperator::group_scan(f.group), Arc::clone(&f.customer), Arc::clone(&f.order));
        let rows = f.run(&plan);
        assert_eq!(rows.len(), 12);
        assert_eq!(
            rows[0].values(),
            [Value::Int(1), Value::from("xyz"), Value::Int(11), Value::Int(1), Value::from("ori")]
        );
        assert_eq!(rows[0].row_type().name(), "customer_order");
        assert_eq!(rows[0].hkey(), Some(&f.hkey(&[1, 11])));
        let types: Vec<_> = rows.iter().map(|r| r.row_type().name().to_owned()).collect();
        assert_eq!(
            types,
            [
                "customer_order", "item", "item", "customer_order", "item", "item",
                "customer_order", "item", "item", "customer_order", "item", "item",
            ]
        );
    }

    #[test]
    fn flatten_twice_yields_one_row_per_item() {
        let f = Fixture::new();
        let co = RowType::flattened(&f.customer, &f.order);
        let plan = PhysicalOperator::flatten(
            PhysicalOperator::flatten(PhysicalOperator::group_scan(f.group), Arc::clone(&f.customer), Arc::clone(&f.order)),
            co,
            Arc::clone(&f.item),
        );
        let rows = f.run(&plan);
        assert_eq!(rows.len(), 8);
        assert!(rows.iter().all(|r| r.values().len() == 7));
        assert_eq!(
            rows[7].values(),
            [
                Value::Int(2),
                Value::from("abc"),
                Value::Int(22),
                Value::Int(2),
                Value::from("jack"),
                Value::Int(222),
                Value::Int(22),
            ]
        );
        assert_eq!(rows[7].get_by_name("iid"), Some(&Value::Int(222)));
    }

    #[test]
    fn flatten_over_select_surfaces_customer_2_only() {
        let f = Fixture::new();
        let plan = PhysicalOperator::flatten(
            PhysicalOperator::select(PhysicalOperator::group_scan(f.group), Arc::clone(&f.customer), Comparison::eq(0, 2i64)),
            Arc::clone(&f.customer),
            Arc::clone(&f.order),
        );
        let rows = f.run(&plan);
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().filter(|r| r.row_type().name() == "customer_order").all(|r| r.values()[0] == Value::Int(2)));
    }
}

// ============================================================================
// Index Scan Tests
// ============================================================================

mod index_scan {
    use super::*;

    #[test]
    fn customer_name_index_orders_by_name() {
        let f = Fixture::new();
        let rows = f.run(&PhysicalOperator::index_scan(IndexScanNode::new(f.index("customer_name"))));
        assert_eq!(hkeys(&rows), ["{1,2}", "{1,1}"]);
        assert_eq!(rows[0].values(), [Value::from("abc")]);
    }

    #[test]
    fn order_salesman_index_orders_by_salesman() {
        let f = Fixture::new();
        let rows = f.run(&PhysicalOperator::index_scan(IndexScanNode::new(f.index("order_salesman"))));
        assert_eq!(hkeys(&rows), ["{1,1,2,12}", "{1,2,2,22}", "{1,1,2,11}", "{1,2,2,21}"]);
    }

    #[test]
    fn half_open_range() {
        let f = Fixture::new();
        let node = IndexScanNode::new(f.index("order_salesman"));
        let key = node.binding_key();
        let mut executor = Executor::new(&PhysicalOperator::index_scan(node), &f.adapter).unwrap();
        executor
            .bind(
                key,
                IndexKeyRange::new(
                    Some(IndexBound::inclusive(vec![Value::from("jack")])),
                    Some(IndexBound::exclusive(vec![Value::from("tom")])),
                ),
            )
            .unwrap();
        assert_eq!(hkeys(&executor.collect().unwrap()), ["{1,2,2,22}", "{1,1,2,11}"]);

        executor
            .bind(key, IndexKeyRange::at_most(IndexBound::exclusive(vec![Value::from("jack")])))
            .unwrap();
        assert_eq!(hkeys(&executor.collect().unwrap()), ["{1,1,2,12}"]);
    }

    #[test]
    fn unbound_required_range_is_binding_error() {
        let f = Fixture::new();
        let node = IndexScanNode::new(f.index("order_salesman")).require_range();
        let mut executor = Executor::new(&PhysicalOperator::index_scan(node), &f.adapter).unwrap();
        assert_eq!(executor.collect().unwrap_err().kind(), ErrorKind::Binding);
        assert_eq!(executor.stats().rows_read(), 0);
        executor.close().unwrap();
    }
}

// ============================================================================
// Index Lookup Tests
// ============================================================================

mod index_lookup {
    use super::*;

    fn lookup(f: &Fixture, index: &str, ancestors: Vec<Arc<RowType>>) -> PhysicalOperator {
        PhysicalOperator::index_lookup(
            PhysicalOperator::index_scan(IndexScanNode::new(f.index(index)).with_slot(0)),
            IndexLookupNode::new(f.group, ancestors),
        )
    }

    #[test]
    fn branches_follow_index_order() {
        let f = Fixture::new();
        let rows = f.run(&lookup(&f, "order_salesman", vec![]));
        assert_eq!(
            keys(&rows),
            [
                "order:12", "item:121", "item:122", "order:22", "item:221", "item:222",
                "order:11", "item:111", "item:112", "order:21", "item:211", "item:212",
            ]
        );
    }

    #[test]
    fn ancestors_precede_each_row() {
        let f = Fixture::new();
        let rows = f.run(&lookup(&f, "order_salesman", vec![Arc::clone(&f.customer)]));
        assert_eq!(rows.len(), 16);
        assert_eq!(keys(&rows[..4]), ["customer:1", "order:12", "item:121", "item:122"]);
        assert_eq!(keys(&rows[4..8]), ["customer:2", "order:22", "item:221", "item:222"]);
    }

    #[test]
    fn ancestors_are_emitted_root_first() {
        let f = Fixture::new();
        let rows = f.run(&lookup(&f, "item_oid", vec![Arc::clone(&f.order), Arc::clone(&f.customer)]));
        assert_eq!(rows.len(), 24);
        for chunk in rows.chunks(3) {
            let names: Vec<_> = chunk.iter().map(|r| r.row_type().name()).collect();
            assert_eq!(names, ["customer", "order", "item"]);
            assert!(chunk[0].is_ancestor_of(&chunk[1]));
            assert!(chunk[1].is_ancestor_of(&chunk[2]));
        }
        assert_eq!(keys(&rows[..3]), ["customer:1", "order:11", "item:111"]);
        assert_eq!(keys(&rows[21..]), ["customer:2", "order:22", "item:222"]);
    }

    #[test]
    fn row_scope_skips_descendants() {
        let f = Fixture::new();
        let plan = PhysicalOperator::index_lookup(
            PhysicalOperator::index_scan(IndexScanNode::new(f.index("order_salesman"))),
            IndexLookupNode::new(f.group, vec![]).with_scope(LookupScope::Row),
        );
        assert_eq!(keys(&f.run(&plan)), ["order:12", "order:22", "order:11", "order:21"]);
    }

    #[test]
    fn rebinding_reruns_with_new_range() {
        let f = Fixture::new();
        let plan = lookup(&f, "order_salesman", vec![Arc::clone(&f.customer)]);
        let mut executor = Executor::new(&plan, &f.adapter).unwrap();

        executor.bind(BindingKey::Slot(0), IndexKeyRange::point(vec![Value::from("tom")])).unwrap();
        let tom = executor.collect().unwrap();
        assert_eq!(keys(&tom), ["customer:2", "order:21", "item:211", "item:212"]);
        assert_eq!(tom[0].values(), [Value::Int(2), Value::from("abc")]);

        executor.bind(BindingKey::Slot(0), IndexKeyRange::point(vec![Value::from("jack")])).unwrap();
        assert_eq!(keys(&executor.collect().unwrap()), ["customer:2", "order:22", "item:221", "item:222"]);

        executor.bind(BindingKey::Slot(0), IndexKeyRange::point(vec![Value::from("tom")])).unwrap();
        executor.bind(BindingKey::Slot(0), IndexKeyRange::point(vec![Value::from("tom")])).unwrap();
        assert_eq!(executor.collect().unwrap(), tom);
    }

    #[test]
    fn pulls_rows_one_at_a_time() {
        let f = Fixture::new();
        let mut executor = Executor::new(&lookup(&f, "order_salesman", vec![]), &f.adapter).unwrap();
        executor.bind(BindingKey::Slot(0), IndexKeyRange::point(vec![Value::from("david")])).unwrap();
        executor.open().unwrap();
        assert!(executor.advance().unwrap());
        assert_eq!(executor.current_row().unwrap().values()[0], Value::Int(12));
        assert!(executor.advance().unwrap());
        assert!(executor.advance().unwrap());
        assert!(!executor.advance().unwrap());
        assert!(!executor.advance().unwrap());
        assert_eq!(executor.current_row().unwrap_err().kind(), ErrorKind::Usage);
        executor.close().unwrap();
        assert_eq!(executor.stats().rows_produced(), 3);
    }

    #[test]
    fn stale_index_entry_is_row_not_found() {
        let f = Fixture::new();
        f.delete_row_only(&[2, 21]);
        let mut executor = Executor::new(&lookup(&f, "order_salesman", vec![]), &f.adapter).unwrap();
        executor.bind(BindingKey::Slot(0), IndexKeyRange::point(vec![Value::from("tom")])).unwrap();
        let err = executor.collect().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RowNotFound);
        assert!(err.to_string().contains("{1,2,2,21}"));
        assert!(!executor.state().is_open());

        let mut executor = Executor::new(&lookup(&f, "order_salesman", vec![]), &f.adapter).unwrap();
        executor.bind(BindingKey::Slot(0), IndexKeyRange::point(vec![Value::from("jack")])).unwrap();
        assert_eq!(executor.collect().unwrap().len(), 3);
    }

    #[test]
    fn failed_entry_leaves_no_ancestor_behind() {
        let f = Fixture::new();
        f.delete_row_only(&[2, 21]);
        let mut executor = Executor::new(&lookup(&f, "order_salesman", vec![Arc::clone(&f.customer)]), &f.adapter).unwrap();
        executor.bind(BindingKey::Slot(0), IndexKeyRange::point(vec![Value::from("tom")])).unwrap();
        executor.open().unwrap();
        assert_eq!(executor.advance().unwrap_err().kind(), ErrorKind::RowNotFound);
        assert!(!executor.advance().unwrap());
        executor.close().unwrap();
        assert_eq!(executor.stats().rows_produced(), 0);
    }

    #[test]
    fn missing_ancestor_is_row_not_found() {
        let f = Fixture::new();
        f.delete_row_only(&[2]);
        let mut executor = Executor::new(&lookup(&f, "order_salesman", vec![Arc::clone(&f.customer)]), &f.adapter).unwrap();
        executor.bind(BindingKey::Slot(0), IndexKeyRange::point(vec![Value::from("jack")])).unwrap();
        assert_eq!(executor.collect().unwrap_err().kind(), ErrorKind::RowNotFound);
    }

    #[test]
    fn plan_display() {
        let f = Fixture::new();
        let plan = lookup(&f, "order_salesman", vec![Arc::clone(&f.customer)]);
        assert_eq!(
            plan.display_tree().to_string(),
            "└── IndexLookup: group 1 ancestors [customer] (branch)\n    └── IndexScan: order_salesman (range: slot 0)\n"
        );
    }
}
