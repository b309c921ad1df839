//! Group, table and index definitions.
//!
//! The catalog is a read-only handle describing how tables nest into groups
//! and which secondary indexes exist. The query engine treats it as a set of
//! already-validated facts; all validation happens once in
//! [`CatalogBuilder::build`].
//!
//! # Example
//!
//! ```
//! use arbordb_core::Catalog;
//!
//! let catalog = Catalog::builder()
//!     .group("coi")
//!     .root_table("coi", "customer", &["cid", "name"], "cid")
//!     .child_table("order", "customer", &["oid", "cid", "salesman"], "oid", "cid")
//!     .child_table("item", "order", &["iid", "oid"], "iid", "oid")
//!     .index("order_salesman", "order", &["salesman"])
//!     .build()
//!     .unwrap();
//!
//! let item = catalog.table_by_name("item").unwrap();
//! let path: Vec<_> = catalog.path(item.id).iter().map(|t| t.name.as_str()).collect();
//! assert_eq!(path, ["customer", "order", "item"]);
//! ```

mod builder;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{GroupId, IndexId, TableId};

pub use builder::CatalogBuilder;

/// A group: the unit of physical co-location for one table hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDef {
    /// Group identifier.
    pub id: GroupId,
    /// Group name.
    pub name: String,
    /// Root table of the hierarchy.
    pub root: TableId,
}

/// The foreign-key join from a child table to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentJoin {
    /// The parent table.
    pub table: TableId,
    /// Position of the foreign-key column in the child table.
    pub column: usize,
}

/// A table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    /// Table identifier; also the ordinal used in hierarchical keys.
    pub id: TableId,
    /// Table name.
    pub name: String,
    /// Column names, in row order.
    pub columns: Vec<String>,
    /// Position of the primary-key column.
    pub primary_key: usize,
    /// Join to the parent table; `None` for a group root.
    pub parent: Option<ParentJoin>,
    /// Group the table belongs to.
    pub group: GroupId,
}

impl TableDef {
    /// Position of the named column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Number of columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns true for the root table of a group.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// A secondary index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    /// Index identifier.
    pub id: IndexId,
    /// Index name.
    pub name: String,
    /// Indexed table.
    pub table: TableId,
    /// Positions of the key columns in the indexed table, in key order.
    pub columns: Vec<usize>,
}

/// Immutable catalog of groups, tables and indexes.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    groups: Vec<GroupDef>,
    tables: Vec<TableDef>,
    indexes: Vec<IndexDef>,
    group_names: HashMap<String, GroupId>,
    table_names: HashMap<String, TableId>,
    index_names: HashMap<String, IndexId>,
}

impl Catalog {
    /// Starts building a catalog.
    #[must_use]
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// Looks up a group by id.
    #[must_use]
    pub fn group(&self, id: GroupId) -> Option<&GroupDef> {
        (id.as_u32() as usize).checked_sub(1).and_then(|i| self.groups.get(i))
    }

    /// Looks up a group by name.
    #[must_use]
    pub fn group_by_name(&self, name: &str) -> Option<&GroupDef> {
        self.group_names.get(name).and_then(|id| self.group(*id))
    }

    /// Looks up a table by id.
    #[must_use]
    pub fn table(&self, id: TableId) -> Option<&TableDef> {
        (id.as_u16() as usize).checked_sub(1).and_then(|i| self.tables.get(i))
    }

    /// Looks up a table by name.
    #[must_use]
    pub fn table_by_name(&self, name: &str) -> Option<&TableDef> {
        self.table_names.get(name).and_then(|id| self.table(*id))
    }

    /// Looks up an index by id.
    #[must_use]
    pub fn index(&self, id: IndexId) -> Option<&IndexDef> {
        (id.as_u32() as usize).checked_sub(1).and_then(|i| self.indexes.get(i))
    }

    /// Looks up an index by name.
    #[must_use]
    pub fn index_by_name(&self, name: &str) -> Option<&IndexDef> {
        self.index_names.get(name).and_then(|id| self.index(*id))
    }

    /// All groups, in declaration order.
    pub fn groups(&self) -> impl Iterator<Item = &GroupDef> {
        self.groups.iter()
    }

    /// All tables, in ordinal order.
    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.iter()
    }

    /// All indexes, in declaration order.
    pub fn indexes(&self) -> impl Iterator<Item = &IndexDef> {
        self.indexes.iter()
    }

    /// Tables belonging to `group`, in ordinal order.
    pub fn tables_in_group(&self, group: GroupId) -> impl Iterator<Item = &TableDef> {
        self.tables.iter().filter(move |t| t.group == group)
    }

    /// The parent of `table`, if it has one.
    #[must_use]
    pub fn parent_of(&self, table: TableId) -> Option<&TableDef> {
        self.table(table).and_then(|t| t.parent).and_then(|p| self.table(p.table))
    }

    /// Direct children of `table`, in ordinal order.
    pub fn children_of(&self, table: TableId) -> impl Iterator<Item = &TableDef> {
        self.tables.iter().filter(move |t| t.parent.is_some_and(|p| p.table == table))
    }

    /// Root-first ancestry of `table`, ending with the table itself. Empty if
    /// the table is unknown.
    #[must_use]
    pub fn path(&self, table: TableId) -> Vec<&TableDef> {
        let mut path = Vec::new();
        let mut current = self.table(table);
        while let Some(def) = current {
            path.push(def);
            current = def.parent.and_then(|p| self.table(p.table));
        }
        path.reverse();
        path
    }

    /// Returns true if `ancestor` lies strictly above `table` in its hierarchy.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: TableId, table: TableId) -> bool {
        let path = self.path(table);
        path.len() > 1 && path[..path.len() - 1].iter().any(|t| t.id == ancestor)
    }

    /// Indexes defined on `table`.
    pub fn indexes_on(&self, table: TableId) -> impl Iterator<Item = &IndexDef> {
        self.indexes.iter().filter(move |i| i.table == table)
    }
}
