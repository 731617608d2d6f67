//! Sunburst hierarchies.
//!
//! A [`Hierarchy`] is the four parallel sequences a sunburst trace consumes
//! (`ids`, `labels`, `parents`, `values`) plus the node kind of each entry.
//! Nodes are laid out root first, then every group in declaration order,
//! then every leaf grouped by parent:
//!
//! ```text
//! index  id                   label               parent               value
//! 0      Artistic Intention   Artistic Intention                       Σ groups
//! 1      AI-1                 Purpose             Artistic Intention   Σ leaves
//! 2      AI-2                 Audience<br>Role    Artistic Intention   Σ leaves
//! 3      ai_aesthetic         Aesthetic<br>...    AI-1                 rows with 1
//! ...
//! ```
//!
//! Values follow the `branchvalues = "total"` convention: every non-leaf
//! value is exactly the sum of its children.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::dataset::Dataset;
use crate::error::{CatalogError, Result};
use crate::taxonomy::{group_id, Dimension, TagSource, Taxonomy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    Group,
    Leaf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hierarchy {
    pub dimension: Dimension,
    /// Number of installations in the dataset the hierarchy was built from.
    pub installations: usize,
    pub ids: Vec<String>,
    pub labels: Vec<String>,
    pub parents: Vec<String>,
    pub values: Vec<u64>,
    pub kinds: Vec<NodeKind>,
}

/// Borrowed view of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node<'a> {
    pub index: usize,
    pub id: &'a str,
    pub label: &'a str,
    pub parent: &'a str,
    pub value: u64,
    pub kind: NodeKind,
}

impl Hierarchy {
    pub fn build(dataset: &Dataset, taxonomy: &Taxonomy, dimension: Dimension) -> Result<Self> {
        let spec = taxonomy.dimension(dimension).ok_or_else(|| {
            CatalogError::InvalidTaxonomy(format!("dimension {} is not declared", dimension.code()))
        })?;

        let root_id = dimension.name().to_string();
        let mut h = Hierarchy {
            dimension,
            installations: dataset.len(),
            ids: vec![root_id.clone()],
            labels: vec![root_id.clone()],
            parents: vec![String::new()],
            values: vec![0],
            kinds: vec![NodeKind::Root],
        };

        for (g, group) in spec.groups.iter().enumerate() {
            h.push(group_id(dimension, g + 1), group.label.clone(), root_id.clone(), 0, NodeKind::Group);
        }

        let mut root_total = 0u64;
        for (g, group) in spec.groups.iter().enumerate() {
            let parent = group_id(dimension, g + 1);
            let mut group_total = 0u64;
            for tag in &group.tags {
                let value = match &tag.source {
                    TagSource::Column(column) => {
                        if !dataset.has_column(column) {
                            tracing::warn!(
                                dimension = dimension.code(),
                                column = %column,
                                "tag column missing from dataset; leaf will be empty"
                            );
                        }
                        dataset.count_flag(column)
                    }
                    TagSource::Field(_) => dataset.count_field(&tag.source.section()),
                };
                group_total += value;
                h.push(tag.source.section(), tag.label.clone(), parent.clone(), value, NodeKind::Leaf);
            }
            h.values[1 + g] = group_total;
            root_total += group_total;
        }
        h.values[0] = root_total;

        Ok(h)
    }

    fn push(&mut self, id: String, label: String, parent: String, value: u64, kind: NodeKind) {
        self.ids.push(id);
        self.labels.push(label);
        self.parents.push(parent);
        self.values.push(value);
        self.kinds.push(kind);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn node(&self, index: usize) -> Option<Node<'_>> {
        if index >= self.len() {
            return None;
        }
        Some(Node {
            index,
            id: &self.ids[index],
            label: &self.labels[index],
            parent: &self.parents[index],
            value: self.values[index],
            kind: self.kinds[index],
        })
    }

    pub fn nodes(&self) -> impl Iterator<Item = Node<'_>> + '_ {
        (0..self.len()).filter_map(move |i| self.node(i))
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|x| x == id)
    }

    pub fn find(&self, id: &str) -> Option<Node<'_>> {
        self.position(id).and_then(|i| self.node(i))
    }

    /// Index of the first leaf; everything before it is root or group.
    pub fn leaf_start(&self) -> usize {
        self.kinds
            .iter()
            .position(|k| *k == NodeKind::Leaf)
            .unwrap_or(self.len())
    }

    pub fn leaves(&self) -> impl Iterator<Item = Node<'_>> + '_ {
        self.nodes().filter(|n| n.kind == NodeKind::Leaf)
    }

    /// Label of the node whose id is `id`'s parent.
    pub fn parent_label(&self, id: &str) -> Option<&str> {
        let node = self.find(id)?;
        self.find(node.parent).map(|p| p.label)
    }

    /// Verify the structural invariants of the hierarchy.
    pub fn check(&self) -> Result<()> {
        let violation = |msg: String| {
            Err(CatalogError::Invariant(format!("{} hierarchy: {msg}", self.dimension.code())))
        };

        let n = self.ids.len();
        if self.labels.len() != n || self.parents.len() != n || self.values.len() != n || self.kinds.len() != n {
            return violation("parallel sequences differ in length".to_string());
        }

        let roots = self.parents.iter().filter(|p| p.is_empty()).count();
        if roots != 1 {
            return violation(format!("{roots} nodes without parent (expected 1)"));
        }

        let mut seen: HashSet<&str> = HashSet::with_capacity(n);
        for id in &self.ids {
            if !seen.insert(id.as_str()) {
                return violation(format!("duplicate id `{id}`"));
            }
        }

        let mut child_totals: HashMap<&str, u64> = HashMap::new();
        for node in self.nodes() {
            if node.parent.is_empty() {
                continue;
            }
            if !seen.contains(node.parent) {
                return violation(format!("node `{}` has unknown parent `{}`", node.id, node.parent));
            }
            *child_totals.entry(node.parent).or_default() += node.value;
        }

        for node in self.nodes().filter(|n| n.kind != NodeKind::Leaf) {
            let children = child_totals.get(node.id).copied().unwrap_or(0);
            if node.value != children {
                return violation(format!(
                    "node `{}` has value {} but its children total {children}",
                    node.id, node.value
                ));
            }
        }

        Ok(())
    }
}
