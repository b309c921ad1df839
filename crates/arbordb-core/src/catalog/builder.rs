//! Builder for [`Catalog`].

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};
use crate::types::{GroupId, IndexId, TableId};

use super::{Catalog, GroupDef, IndexDef, ParentJoin, TableDef};

#[derive(Debug)]
enum TableDecl {
    Root { group: String },
    Child { parent: String, foreign_key: String },
}

#[derive(Debug)]
struct PendingTable {
    name: String,
    columns: Vec<String>,
    primary_key: String,
    decl: TableDecl,
}

#[derive(Debug)]
struct PendingIndex {
    name: String,
    table: String,
    columns: Vec<String>,
}

/// Builder for constructing a [`Catalog`].
///
/// Declarations are recorded as given and checked together by
/// [`build`](Self::build). Tables are numbered in declaration order starting
/// at 1, and a child table must be declared after its parent.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    groups: Vec<String>,
    tables: Vec<PendingTable>,
    indexes: Vec<PendingIndex>,
}

fn owned(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| (*c).to_owned()).collect()
}

impl CatalogBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a group.
    #[must_use]
    pub fn group(mut self, name: impl Into<String>) -> Self {
        self.groups.push(name.into());
        self
    }

    /// Declares the root table of `group`.
    #[must_use]
    pub fn root_table(
        mut self,
        group: impl Into<String>,
        name: impl Into<String>,
        columns: &[&str],
        primary_key: impl Into<String>,
    ) -> Self {
        self.tables.push(PendingTable {
            name: name.into(),
            columns: owned(columns),
            primary_key: primary_key.into(),
            decl: TableDecl::Root { group: group.into() },
        });
        self
    }

    /// Declares a child table joined to `parent` through `foreign_key`.
    #[must_use]
    pub fn child_table(
        mut self,
        name: impl Into<String>,
        parent: impl Into<String>,
        columns: &[&str],
        primary_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.tables.push(PendingTable {
            name: name.into(),
            columns: owned(columns),
            primary_key: primary_key.into(),
            decl: TableDecl::Child { parent: parent.into(), foreign_key: foreign_key.into() },
        });
        self
    }

    /// Declares a secondary index over `columns` of `table`.
    #[must_use]
    pub fn index(mut self, name: impl Into<String>, table: impl Into<String>, columns: &[&str]) -> Self {
        self.indexes.push(PendingIndex { name: name.into(), table: table.into(), columns: owned(columns) });
        self
    }

    /// Validates the declarations and builds the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] for duplicate names, unknown groups,
    /// parents or columns, groups without exactly one root table, or more
    /// tables than fit in a key ordinal.
    pub fn build(self) -> CoreResult<Catalog> {
        let mut catalog = Catalog::default();

        for (i, name) in self.groups.into_iter().enumerate() {
            let id = u32::try_from(i + 1)
                .map(GroupId::new)
                .map_err(|_| CoreError::Validation("too many groups".to_owned()))?;
            if catalog.group_names.insert(name.clone(), id).is_some() {
                return Err(CoreError::Validation(format!("duplicate group '{name}'")));
            }
            // root is filled in when the root table is declared
            catalog.groups.push(GroupDef { id, name, root: TableId::new(0) });
        }

        for (i, pending) in self.tables.into_iter().enumerate() {
            let id = u16::try_from(i + 1)
                .map(TableId::new)
                .map_err(|_| CoreError::Validation("too many tables".to_owned()))?;
            let table = resolve_table(&mut catalog, id, pending)?;
            catalog.table_names.insert(table.name.clone(), id);
            catalog.tables.push(table);
        }

        if let Some(group) = catalog.groups.iter().find(|g| g.root.as_u16() == 0) {
            return Err(CoreError::Validation(format!("group '{}' has no root table", group.name)));
        }

        for (i, pending) in self.indexes.into_iter().enumerate() {
            let id = u32::try_from(i + 1)
                .map(IndexId::new)
                .map_err(|_| CoreError::Validation("too many indexes".to_owned()))?;
            if catalog.index_names.contains_key(&pending.name) {
                return Err(CoreError::Validation(format!("duplicate index '{}'", pending.name)));
            }
            let table = catalog.table_by_name(&pending.table).ok_or_else(|| {
                CoreError::Validation(format!(
                    "index '{}' refers to unknown table '{}'",
                    pending.name, pending.table
                ))
            })?;
            if pending.columns.is_empty() {
                return Err(CoreError::Validation(format!("index '{}' has no columns", pending.name)));
            }
            let columns = pending
                .columns
                .iter()
                .map(|c| column_position(table, c))
                .collect::<CoreResult<Vec<_>>>()?;
            let table = table.id;
            catalog.index_names.insert(pending.name.clone(), id);
            catalog.indexes.push(IndexDef { id, name: pending.name, table, columns });
        }

        Ok(catalog)
    }
}

fn column_position(table: &TableDef, column: &str) -> CoreResult<usize> {
    table.column_index(column).ok_or_else(|| {
        CoreError::Validation(format!("table '{}' has no column '{column}'", table.name))
    })
}

fn resolve_table(catalog: &mut Catalog, id: TableId, pending: PendingTable) -> CoreResult<TableDef> {
    if catalog.table_names.contains_key(&pending.name) {
        return Err(CoreError::Validation(format!("duplicate table '{}'", pending.name)));
    }
    let mut table = TableDef {
        id,
        name: pending.name,
        columns: pending.columns,
        primary_key: 0,
        parent: None,
        group: GroupId::new(0),
    };
    let mut seen = HashMap::new();
    for (pos, column) in table.columns.iter().enumerate() {
        if seen.insert(column.as_str(), pos).is_some() {
            return Err(CoreError::Validation(format!(
                "table '{}' declares column '{column}' twice",
                table.name
            )));
        }
    }
    table.primary_key = column_position(&table, &pending.primary_key)?;

    match pending.decl {
        TableDecl::Root { group } => {
            let group_id = *catalog.group_names.get(&group).ok_or_else(|| {
                CoreError::Validation(format!("table '{}' refers to unknown group '{group}'", table.name))
            })?;
            let def = catalog
                .groups
                .iter_mut()
                .find(|g| g.id == group_id)
                .ok_or_else(|| CoreError::Validation(format!("unknown group '{group}'")))?;
            if def.root.as_u16() != 0 {
                return Err(CoreError::Validation(format!("group '{group}' already has a root table")));
            }
            def.root = id;
            table.group = group_id;
        }
        TableDecl::Child { parent, foreign_key } => {
            let parent_def = catalog.table_by_name(&parent).ok_or_else(|| {
                CoreError::Validation(format!(
                    "table '{}' refers to unknown parent '{parent}'",
                    table.name
                ))
            })?;
            table.group = parent_def.group;
            table.parent =
                Some(ParentJoin { table: parent_def.id, column: column_position(&table, &foreign_key)? });
        }
    }
    Ok(table)
}
