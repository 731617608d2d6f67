//! Human-readable glossary of every dimension, group and tag.

use std::fmt::Write as _;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::taxonomy::{group_id, strip_marker, Dimension};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Glossary {
    pub installations: usize,
    pub dimensions: Vec<GlossaryDimension>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlossaryDimension {
    pub dimension: Dimension,
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub groups: Vec<GlossaryGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlossaryGroup {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub installations: u64,
    pub tags: Vec<GlossaryTag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlossaryTag {
    pub label: String,
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub installations: u64,
}

impl Catalog {
    pub fn glossary(&self) -> Glossary {
        let mut dimensions = Vec::with_capacity(Dimension::ALL.len());
        for dimension in Dimension::ALL {
            let Some(spec) = self.taxonomy().dimension(dimension) else {
                continue;
            };
            let h = self.hierarchy(dimension);
            let value_of = |id: &str| h.find(id).map(|n| n.value).unwrap_or(0);

            let groups = spec
                .groups
                .iter()
                .enumerate()
                .map(|(g, group)| GlossaryGroup {
                    label: strip_marker(&group.label),
                    description: group.description.clone(),
                    installations: value_of(&group_id(dimension, g + 1)),
                    tags: group
                        .tags
                        .iter()
                        .map(|tag| {
                            let section = tag.source.section();
                            GlossaryTag {
                                label: strip_marker(&tag.label),
                                installations: value_of(&section),
                                description: tag.description.clone(),
                                section,
                            }
                        })
                        .collect(),
                })
                .collect();

            dimensions.push(GlossaryDimension {
                dimension,
                name: dimension.name(),
                description: spec.description.clone(),
                groups,
            });
        }

        Glossary {
            installations: self.dataset().len(),
            dimensions,
        }
    }
}

impl Glossary {
    /// Plain-text rendering for terminals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} installations are currently reviewed", self.installations);
        for d in &self.dimensions {
            let _ = writeln!(out, "\n{} ({})", d.name, d.dimension.code());
            if let Some(desc) = &d.description {
                let _ = writeln!(out, "  {desc}");
            }
            for g in &d.groups {
                let _ = writeln!(out, "  {} [{}]", g.label, g.installations);
                for t in &g.tags {
                    match &t.description {
                        Some(desc) => {
                            let _ = writeln!(out, "    - {} [{}]: {desc}", t.label, t.installations);
                        }
                        None => {
                            let _ = writeln!(out, "    - {} [{}]", t.label, t.installations);
                        }
                    }
                }
            }
        }
        out
    }
}
