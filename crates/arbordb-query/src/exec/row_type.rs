//! Row types and the schema that resolves them.
//!
//! Every row flowing through an operator tree carries a [`RowType`]: a table,
//! an index, or the flattening of two other row types. Operators compare row
//! types to decide how to treat a row, so row types for catalog objects are
//! created once by [`Schema`] and shared.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arbordb_core::{Catalog, IndexId, TableId};

/// What a [`RowType`] describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowTypeKind {
    /// Rows of a table.
    Table(TableId),
    /// Entries of a secondary index.
    Index(IndexId),
    /// A parent row joined with one of its child rows.
    Flattened {
        /// Type of the left (ancestor) half.
        parent: Arc<RowType>,
        /// Type of the right (descendant) half.
        child: Arc<RowType>,
    },
}

/// The type of a row: its kind plus qualified column names.
#[derive(Debug, Clone)]
pub struct RowType {
    kind: RowTypeKind,
    name: String,
    columns: Vec<String>,
    table: TableId,
}

impl RowType {
    /// The row type of a flattened parent/child pair.
    ///
    /// Columns are the parent's followed by the child's; the owning table is
    /// the child's.
    #[must_use]
    pub fn flattened(parent: &Arc<Self>, child: &Arc<Self>) -> Arc<Self> {
        let columns = parent.columns.iter().chain(&child.columns).cloned().collect();
        Arc::new(Self {
            name: format!("{}_{}", parent.name, child.name),
            table: child.table,
            kind: RowTypeKind::Flattened { parent: Arc::clone(parent), child: Arc::clone(child) },
            columns,
        })
    }

    /// Returns the kind.
    #[must_use]
    pub fn kind(&self) -> &RowTypeKind {
        &self.kind
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the qualified column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// The table whose rows (or whose rows' index entries) this type carries.
    /// For flattened types this is the child's table.
    #[must_use]
    pub fn table_id(&self) -> TableId {
        self.table
    }

    /// Returns the index id if this is an index row type.
    #[must_use]
    pub fn index_id(&self) -> Option<IndexId> {
        match self.kind {
            RowTypeKind::Index(id) => Some(id),
            _ => None,
        }
    }

    /// Returns true for index row types.
    #[must_use]
    pub fn is_index(&self) -> bool {
        matches!(self.kind, RowTypeKind::Index(_))
    }

    /// Finds a column by qualified name, falling back to the first column
    /// whose bare name matches. Flattened types repeat join columns, so a
    /// bare name resolves to the ancestor's copy.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        if let Some(i) = self.columns.iter().position(|c| c == name) {
            return Some(i);
        }
        let suffix = format!(".{name}");
        self.columns.iter().position(|c| c.ends_with(&suffix))
    }
}

impl PartialEq for RowType {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for RowType {}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Row types for every table and index of a catalog.
#[derive(Debug)]
pub struct Schema {
    catalog: Arc<Catalog>,
    tables: HashMap<TableId, Arc<RowType>>,
    indexes: HashMap<IndexId, Arc<RowType>>,
}

impl Schema {
    /// Creates row types for every table and index in `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let tables = catalog
            .tables()
            .map(|t| {
                let columns = t.columns.iter().map(|c| format!("{}.{c}", t.name)).collect();
                let row_type = RowType { kind: RowTypeKind::Table(t.id), name: t.name.clone(), columns, table: t.id };
                (t.id, Arc::new(row_type))
            })
            .collect();

        let mut indexes = HashMap::new();
        for index in catalog.indexes() {
            let Some(table) = catalog.table(index.table) else { continue };
            let columns = index
                .columns
                .iter()
                .filter_map(|&i| table.columns.get(i))
                .map(|c| format!("{}.{c}", table.name))
                .collect();
            let row_type = RowType {
                kind: RowTypeKind::Index(index.id),
                name: index.name.clone(),
                columns,
                table: index.table,
            };
            indexes.insert(index.id, Arc::new(row_type));
        }

        Self { catalog, tables, indexes }
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Row type of a table.
    #[must_use]
    pub fn table_row_type(&self, id: TableId) -> Option<Arc<RowType>> {
        self.tables.get(&id).cloned()
    }

    /// Row type of a table, by table name.
    #[must_use]
    pub fn table_row_type_by_name(&self, name: &str) -> Option<Arc<RowType>> {
        self.catalog.table_by_name(name).and_then(|t| self.table_row_type(t.id))
    }

    /// Row type of an index.
    #[must_use]
    pub fn index_row_type(&self, id: IndexId) -> Option<Arc<RowType>> {
        self.indexes.get(&id).cloned()
    }

    /// Row type of an index, by index name.
    #[must_use]
    pub fn index_row_type_by_name(&self, name: &str) -> Option<Arc<RowType>> {
        self.catalog.index_by_name(name).and_then(|i| self.index_row_type(i.id))
    }

    /// Row type of `parent` flattened with `child`.
    #[must_use]
    pub fn flattened_row_type(&self, parent: &Arc<RowType>, child: &Arc<RowType>) -> Arc<RowType> {
        RowType::flattened(parent, child)
    }
}
