//! Physical operator node types.

use std::fmt;
use std::sync::Arc;

use arbordb_core::GroupId;

use crate::exec::bindings::{BindingKey, OperatorId};
use crate::exec::expression::RowPredicate;
use crate::exec::row_type::RowType;

/// A physical operator tree.
#[derive(Debug, Clone)]
pub enum PhysicalOperator {
    /// Every row of a group in HKey order.
    GroupScan(GroupScanNode),

    /// Drops rows of one type that fail a predicate, with their descendants.
    Select {
        /// Select configuration.
        node: SelectNode,
        /// Input operator.
        input: Box<PhysicalOperator>,
    },

    /// Joins parent rows with their child rows.
    Flatten {
        /// Flatten configuration.
        node: FlattenNode,
        /// Input operator.
        input: Box<PhysicalOperator>,
    },

    /// Index entries within a bound range, in index key order.
    IndexScan(IndexScanNode),

    /// Fetches the rows index entries point to, with their ancestors.
    IndexLookup {
        /// Lookup configuration.
        node: IndexLookupNode,
        /// Input operator producing index rows.
        input: Box<PhysicalOperator>,
    },
}

/// Parameters of a group scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupScanNode {
    /// The group to scan.
    pub group: GroupId,
}

/// Parameters of a select.
#[derive(Clone)]
pub struct SelectNode {
    /// Rows of this type are tested; other rows pass unless they descend from
    /// a dropped row.
    pub target: Arc<RowType>,
    /// The test.
    pub predicate: Arc<dyn RowPredicate>,
}

impl fmt::Debug for SelectNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectNode")
            .field("target", &self.target.name())
            .field("predicate", &self.predicate.describe())
            .finish()
    }
}

/// Parameters of a flatten.
#[derive(Debug, Clone)]
pub struct FlattenNode {
    /// Type of the parent rows.
    pub parent: Arc<RowType>,
    /// Type of the child rows; its table's parent must be `parent`'s table.
    pub child: Arc<RowType>,
    /// Type of the joined rows.
    pub output: Arc<RowType>,
}

impl FlattenNode {
    /// Creates flatten parameters, deriving the output type.
    #[must_use]
    pub fn new(parent: Arc<RowType>, child: Arc<RowType>) -> Self {
        let output = RowType::flattened(&parent, &child);
        Self { parent, child, output }
    }
}

/// Parameters of an index scan.
///
/// The scanned range is not part of the plan. It is read from the bindings
/// when the cursor opens, under [`binding_key`](IndexScanNode::binding_key).
/// An unbound range scans the whole index unless the node requires one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexScanNode {
    /// Identity used as the default binding key.
    pub id: OperatorId,
    /// Row type of the index.
    pub row_type: Arc<RowType>,
    /// Explicit binding slot, overriding `id`.
    pub slot: Option<u32>,
    /// Fail at open if no range is bound.
    pub range_required: bool,
}

impl IndexScanNode {
    /// Creates a scan over the index described by `row_type`.
    #[must_use]
    pub fn new(row_type: Arc<RowType>) -> Self {
        Self { id: OperatorId::next(), row_type, slot: None, range_required: false }
    }

    /// Reads the range from `slot` instead of from this node's identity.
    #[must_use]
    pub fn with_slot(mut self, slot: u32) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Requires a range to be bound before open.
    #[must_use]
    pub fn require_range(mut self) -> Self {
        self.range_required = true;
        self
    }

    /// The key the range is bound under.
    #[must_use]
    pub fn binding_key(&self) -> BindingKey {
        self.slot.map_or(BindingKey::Operator(self.id), BindingKey::Slot)
    }
}

/// How much of the indexed row an [`IndexLookupNode`] emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LookupScope {
    /// The row and all of its descendants, in HKey order.
    #[default]
    Branch,
    /// The row alone.
    Row,
}

/// Parameters of an index lookup.
#[derive(Debug, Clone)]
pub struct IndexLookupNode {
    /// The group holding the indexed rows.
    pub group: GroupId,
    /// Ancestor types to emit before each row, in any order; they are
    /// emitted root first.
    pub ancestors: Vec<Arc<RowType>>,
    /// What to emit for the indexed row itself.
    pub scope: LookupScope,
}

impl IndexLookupNode {
    /// Creates lookup parameters with [`LookupScope::Branch`].
    #[must_use]
    pub fn new(group: GroupId, ancestors: Vec<Arc<RowType>>) -> Self {
        Self { group, ancestors, scope: LookupScope::Branch }
    }

    /// Sets the scope.
    #[must_use]
    pub fn with_scope(mut self, scope: LookupScope) -> Self {
        self.scope = scope;
        self
    }
}

// ============================================================================
// PhysicalOperator Implementation
// ============================================================================

impl PhysicalOperator {
    /// A scan of every row in `group`.
    #[must_use]
    pub fn group_scan(group: GroupId) -> Self {
        Self::GroupScan(GroupScanNode { group })
    }

    /// Drops rows of type `target` failing `predicate` from `input`.
    #[must_use]
    pub fn select(input: Self, target: Arc<RowType>, predicate: impl RowPredicate + 'static) -> Self {
        Self::Select { node: SelectNode { target, predicate: Arc::new(predicate) }, input: Box::new(input) }
    }

    /// Joins `parent` rows of `input` with their `child` rows.
    #[must_use]
    pub fn flatten(input: Self, parent: Arc<RowType>, child: Arc<RowType>) -> Self {
        Self::Flatten { node: FlattenNode::new(parent, child), input: Box::new(input) }
    }

    /// An index scan.
    #[must_use]
    pub fn index_scan(node: IndexScanNode) -> Self {
        Self::IndexScan(node)
    }

    /// Resolves the index rows of `input` to stored rows.
    #[must_use]
    pub fn index_lookup(input: Self, node: IndexLookupNode) -> Self {
        Self::IndexLookup { node, input: Box::new(input) }
    }

    /// Returns the operator name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GroupScan(_) => "GroupScan",
            Self::Select { .. } => "Select",
            Self::Flatten { .. } => "Flatten",
            Self::IndexScan(_) => "IndexScan",
            Self::IndexLookup { .. } => "IndexLookup",
        }
    }

    /// Returns the inputs of this operator.
    #[must_use]
    pub fn children(&self) -> Vec<&PhysicalOperator> {
        match self {
            Self::GroupScan(_) | Self::IndexScan(_) => vec![],
            Self::Select { input, .. } | Self::Flatten { input, .. } | Self::IndexLookup { input, .. } => {
                vec![input.as_ref()]
            }
        }
    }

    /// Every index scan in the tree, for binding their ranges.
    #[must_use]
    pub fn index_scans(&self) -> Vec<&IndexScanNode> {
        let mut scans = Vec::new();
        self.collect_index_scans(&mut scans);
        scans
    }

    fn collect_index_scans<'a>(&'a self, out: &mut Vec<&'a IndexScanNode>) {
        if let Self::IndexScan(node) = self {
            out.push(node);
        }
        for child in self.children() {
            child.collect_index_scans(out);
        }
    }

    /// Pretty prints the tree.
    #[must_use]
    pub fn display_tree(&self) -> DisplayTree<'_> {
        DisplayTree { plan: self }
    }
}

impl fmt::Display for PhysicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupScan(node) => write!(f, "GroupScan: group {}", node.group.as_u32()),
            Self::Select { node, .. } => {
                write!(f, "Select: {} [{}]", node.target.name(), node.predicate.describe())
            }
            Self::Flatten { node, .. } => {
                write!(f, "Flatten: {} with {}", node.parent.name(), node.child.name())
            }
            Self::IndexScan(node) => {
                write!(f, "IndexScan: {} (range: {}", node.row_type.name(), node.binding_key())?;
                if node.range_required {
                    f.write_str(", required")?;
                }
                f.write_str(")")
            }
            Self::IndexLookup { node, .. } => {
                write!(f, "IndexLookup: group {}", node.group.as_u32())?;
                if !node.ancestors.is_empty() {
                    let names: Vec<_> = node.ancestors.iter().map(|a| a.name()).collect();
                    write!(f, " ancestors [{}]", names.join(", "))?;
                }
                match node.scope {
                    LookupScope::Branch => f.write_str(" (branch)"),
                    LookupScope::Row => f.write_str(" (row)"),
                }
            }
        }
    }
}

/// Helper for tree-style plan display.
pub struct DisplayTree<'a> {
    plan: &'a PhysicalOperator,
}

impl fmt::Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_node(f, self.plan, "", true)
    }
}

fn fmt_node(f: &mut fmt::Formatter<'_>, plan: &PhysicalOperator, prefix: &str, is_last: bool) -> fmt::Result {
    let connector = if is_last { "└── " } else { "├── " };
    writeln!(f, "{prefix}{connector}{plan}")?;

    let children = plan.children();
    let new_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
    for (i, child) in children.iter().enumerate() {
        fmt_node(f, child, &new_prefix, i == children.len() - 1)?;
    }
    Ok(())
}
