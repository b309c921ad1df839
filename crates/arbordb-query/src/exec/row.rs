//! Rows produced by cursors.

use std::fmt;
use std::sync::Arc;

use arbordb_core::{HKey, Value};

use super::row_type::RowType;

/// A row: field values, their type, and the key of the stored row they came from.
///
/// Table rows carry their own HKey. Index rows carry the HKey of the row the
/// entry points to. Flattened rows carry the child's HKey.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    row_type: Arc<RowType>,
    values: Vec<Value>,
    hkey: Option<HKey>,
}

impl Row {
    /// Creates a row.
    #[must_use]
    pub fn new(row_type: Arc<RowType>, values: Vec<Value>, hkey: Option<HKey>) -> Self {
        Self { row_type, values, hkey }
    }

    /// Returns the row type.
    #[inline]
    #[must_use]
    pub fn row_type(&self) -> &Arc<RowType> {
        &self.row_type
    }

    /// Returns the value at `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the value of a column by name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.row_type.column_index(name).and_then(|i| self.values.get(i))
    }

    /// Returns all values.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the row, returning its values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Returns the HKey, if the row has one.
    #[inline]
    #[must_use]
    pub fn hkey(&self) -> Option<&HKey> {
        self.hkey.as_ref()
    }

    /// Returns true if this row's key is a strict prefix of `other`'s.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        match (&self.hkey, &other.hkey) {
            (Some(a), Some(b)) => a.is_prefix_of(b),
            _ => false,
        }
    }

    /// Joins this row with `child`: this row's values, then the child's,
    /// keyed by the child's HKey.
    #[must_use]
    pub fn flatten_with(&self, child: &Self, row_type: Arc<RowType>) -> Self {
        let mut values = Vec::with_capacity(self.values.len() + child.values.len());
        values.extend_from_slice(&self.values);
        values.extend_from_slice(&child.values);
        Self { row_type, values, hkey: child.hkey.clone() }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.row_type.name())?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::row_type::Schema;
    use arbordb_core::{Catalog, TableId};

    fn schema() -> Schema {
        let catalog = Catalog::builder()
            .group("coi")
            .root_table("coi", "customer", &["cid", "name"], "cid")
            .child_table("order", "customer", &["oid", "cid", "salesman"], "oid", "cid")
            .build()
            .unwrap();
        Schema::new(Arc::new(catalog))
    }

    #[test]
    fn flatten_concatenates_and_keeps_child_key() {
        let schema = schema();
        let customer = schema.table_row_type_by_name("customer").unwrap();
        let order = schema.table_row_type_by_name("order").unwrap();
        let c_key = HKey::from_segments(&[(TableId::new(1), Value::Int(1))]);
        let mut o_key = c_key.clone();
        o_key.push_segment(TableId::new(2), &Value::Int(11));

        let c = Row::new(Arc::clone(&customer), vec![Value::Int(1), Value::from("xyz")], Some(c_key));
        let o = Row::new(
            Arc::clone(&order),
            vec![Value::Int(11), Value::Int(1), Value::from("ori")],
            Some(o_key.clone()),
        );
        assert!(c.is_ancestor_of(&o));
        assert!(!o.is_ancestor_of(&c));

        let co = c.flatten_with(&o, schema.flattened_row_type(&customer, &order));
        assert_eq!(co.values().len(), 5);
        assert_eq!(co.hkey(), Some(&o_key));
        assert_eq!(co.get_by_name("salesman"), Some(&Value::from("ori")));
        assert_eq!(co.get_by_name("order.cid"), Some(&Value::Int(1)));
        assert_eq!(co.to_string(), r#"customer_order(1, "xyz", 11, 1, "ori")"#);
    }
}
