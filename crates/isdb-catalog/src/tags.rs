//! Tag label -> column ("section") resolution.

use serde::Serialize;

use crate::hierarchy::Hierarchy;
use crate::taxonomy::{strip_marker, Dimension};

/// Outcome of resolving a selected label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Section {
    /// The label is a known leaf; test its backing column.
    Found(String),
    /// Unknown label; test it as a column name (or field value) directly.
    UseAsIs(String),
}

impl Section {
    pub fn column(&self) -> &str {
        match self {
            Section::Found(c) | Section::UseAsIs(c) => c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagEntry {
    pub dimension: Dimension,
    /// Leaf id, i.e. the section the filter tests.
    pub id: String,
    pub label: String,
    pub parent_id: String,
    pub parent_label: String,
}

impl TagEntry {
    /// `"<parent> | <label>"` with line-break markers flattened.
    pub fn caption(&self) -> String {
        format!("{} | {}", strip_marker(&self.parent_label), strip_marker(&self.label))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
}

/// Every leaf of every hierarchy, in dropdown order.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    entries: Vec<TagEntry>,
}

impl TagIndex {
    /// Index the leaves of `hierarchies`, ordered by [`Dimension::ALL`].
    pub fn from_hierarchies<'a>(hierarchies: impl IntoIterator<Item = &'a Hierarchy>) -> Self {
        let mut hierarchies: Vec<&Hierarchy> = hierarchies.into_iter().collect();
        hierarchies.sort_by_key(|h| h.dimension.position());

        let mut entries = Vec::new();
        for h in hierarchies {
            for leaf in h.leaves() {
                let parent_label = h.find(leaf.parent).map(|p| p.label).unwrap_or(leaf.parent);
                entries.push(TagEntry {
                    dimension: h.dimension,
                    id: leaf.id.to_string(),
                    label: leaf.label.to_string(),
                    parent_id: leaf.parent.to_string(),
                    parent_label: parent_label.to_string(),
                });
            }
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[TagEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for `label`, preferring the `active` dimension, then the first
    /// match in dropdown order.
    pub fn find(&self, label: &str, active: Option<Dimension>) -> Option<&TagEntry> {
        active
            .and_then(|d| self.entries.iter().find(|e| e.dimension == d && e.label == label))
            .or_else(|| self.entries.iter().find(|e| e.label == label))
    }

    /// Entry whose leaf id is `id`, preferring the `active` dimension.
    pub fn find_by_id(&self, id: &str, active: Option<Dimension>) -> Option<&TagEntry> {
        active
            .and_then(|d| self.entries.iter().find(|e| e.dimension == d && e.id == id))
            .or_else(|| self.entries.iter().find(|e| e.id == id))
    }

    pub fn resolve(&self, label: &str, active: Option<Dimension>) -> Section {
        match self.find(label, active) {
            Some(entry) => Section::Found(entry.id.clone()),
            None => Section::UseAsIs(label.to_string()),
        }
    }

    pub fn resolve_all<S: AsRef<str>>(&self, labels: &[S], active: Option<Dimension>) -> Vec<Section> {
        labels.iter().map(|l| self.resolve(l.as_ref(), active)).collect()
    }

    pub fn dropdown_options(&self) -> Vec<DropdownOption> {
        self.entries
            .iter()
            .map(|e| DropdownOption {
                label: e.caption(),
                value: e.label.clone(),
            })
            .collect()
    }
}
