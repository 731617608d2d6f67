//! The installation list under the chart.
//!
//! The list reacts to three inputs: the dropdown selection, the last clicked
//! chart segment, and the active dimension. Clicks on the root or on a group
//! segment only zoom the chart and never filter.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::filter::ListingRow;
use crate::hierarchy::NodeKind;
use crate::tags::Section;
use crate::taxonomy::{strip_marker, Dimension};

pub const PROMPT: &str =
    "Click on a sub-category or choose it from the dropdown menu to filter the list below.";
pub const NO_MATCH: &str = "No installation belongs to all those categories.";

/// A clicked sunburst segment, as reported by the chart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickPoint {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub parent: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Listing {
    /// Nothing selected: every installation, with a hint.
    Everything {
        prompt: &'static str,
        columns: Vec<String>,
        rows: Vec<ListingRow>,
    },
    Filtered {
        /// `"<parent> | <label>"` per selected tag.
        chosen: Vec<String>,
        count: usize,
        columns: Vec<String>,
        rows: Vec<ListingRow>,
    },
    NoMatch {
        chosen: Vec<String>,
        message: &'static str,
    },
}

impl Listing {
    pub fn rows(&self) -> &[ListingRow] {
        match self {
            Listing::Everything { rows, .. } | Listing::Filtered { rows, .. } => rows,
            Listing::NoMatch { .. } => &[],
        }
    }
}

impl Catalog {
    /// Leaf behind a clicked segment as `(section, caption)`, or `None` for
    /// root/group clicks and segments no hierarchy knows.
    fn clicked_leaf(&self, click: &ClickPoint, active: Dimension) -> Option<(Section, String)> {
        let mut order = vec![active];
        order.extend(Dimension::ALL.into_iter().filter(|d| *d != active));

        order.into_iter().find_map(|d| {
            let h = self.hierarchy(d);
            let node = h.find(&click.id)?;
            if node.kind != NodeKind::Leaf {
                return None;
            }
            let parent = h.parent_label(node.id).unwrap_or(click.parent.as_str());
            let caption = format!("{} | {}", strip_marker(parent), strip_marker(node.label));
            Some((Section::Found(node.id.to_string()), caption))
        })
    }

    pub fn listing(&self, dropdown: &[String], click: Option<&ClickPoint>, active: Dimension) -> Listing {
        let columns = self.display_columns().to_vec();

        let mut sections: Vec<Section> = Vec::with_capacity(dropdown.len() + 1);
        let mut chosen: Vec<String> = Vec::with_capacity(dropdown.len() + 1);
        for label in dropdown {
            let (section, caption) = match self.tags().find(label, Some(active)) {
                Some(entry) => (Section::Found(entry.id.clone()), entry.caption()),
                None => (Section::UseAsIs(label.clone()), strip_marker(label)),
            };
            if sections.contains(&section) {
                continue;
            }
            sections.push(section);
            chosen.push(caption);
        }

        // The click is already resolved to a leaf id; its label is never looked up again.
        if let Some((section, caption)) = click.and_then(|c| self.clicked_leaf(c, active)) {
            if !sections.contains(&section) {
                sections.push(section);
                chosen.push(caption);
            }
        }

        let rows = self.list_sections(&sections);
        if sections.is_empty() {
            return Listing::Everything {
                prompt: PROMPT,
                columns,
                rows,
            };
        }

        tracing::debug!(sections = ?sections, matches = rows.len(), "filtered installation list");
        if rows.is_empty() {
            return Listing::NoMatch {
                chosen,
                message: NO_MATCH,
            };
        }

        Listing::Filtered {
            chosen,
            count: rows.len(),
            columns,
            rows,
        }
    }
}
