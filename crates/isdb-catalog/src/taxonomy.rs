//! Declarative description of the four chart dimensions.
//!
//! A taxonomy lists, per dimension, the groups shown on the middle ring of the
//! sunburst and the leaf tags shown on the outer ring. Every leaf names the
//! data it is computed from:
//!
//! - `{"column": "sd_camera"}`: a one-hot column of the dataset,
//! - `{"field": "Computer Science"}`: one value of the multi-valued `Field` column.
//!
//! Leaves are known structurally, so nothing downstream has to guess where the
//! "header" nodes of a hierarchy stop and the real tags begin.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, Result};

/// Line-break marker embedded in multi-word labels.
pub const LINE_BREAK: &str = "<br>";

pub const TAXONOMY_VERSION: &str = "isdb_taxonomy_v1";

const DEFAULT_TAXONOMY_JSON: &str = include_str!("../taxonomy/default.json");

/// Replace spaces with the line-break marker (`Sound Design` -> `Sound<br>Design`).
pub fn to_marker(text: &str) -> String {
    text.trim().replace(' ', LINE_BREAK)
}

/// Replace line-break markers with spaces, for captions and dropdown labels.
pub fn strip_marker(label: &str) -> String {
    label.replace(LINE_BREAK, " ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    #[serde(rename = "AI")]
    ArtisticIntention,
    #[serde(rename = "IN")]
    Interaction,
    #[serde(rename = "SD")]
    SystemDesign,
    #[serde(rename = "FI")]
    Field,
}

impl Dimension {
    /// Radio-selector order; also the order dropdown options are listed in.
    pub const ALL: [Dimension; 4] = [
        Dimension::ArtisticIntention,
        Dimension::Interaction,
        Dimension::SystemDesign,
        Dimension::Field,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Dimension::ArtisticIntention => "AI",
            Dimension::Interaction => "IN",
            Dimension::SystemDesign => "SD",
            Dimension::Field => "FI",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::ArtisticIntention => "Artistic Intention",
            Dimension::Interaction => "Interaction",
            Dimension::SystemDesign => "System Design",
            Dimension::Field => "Field",
        }
    }

    /// Colorscale the dashboard paints this dimension's chart with.
    pub fn colorscale(self) -> &'static str {
        match self {
            Dimension::ArtisticIntention => "Burg",
            Dimension::Interaction => "Blues",
            Dimension::SystemDesign => "Greens",
            Dimension::Field => "GnBu_r",
        }
    }

    pub(crate) fn position(self) -> usize {
        match self {
            Dimension::ArtisticIntention => 0,
            Dimension::Interaction => 1,
            Dimension::SystemDesign => 2,
            Dimension::Field => 3,
        }
    }

    /// Accepts a code (`ai`, `SD`) or a full name (`system design`).
    pub fn parse(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.code().eq_ignore_ascii_case(wanted) || d.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CatalogError::UnknownDimension(wanted.to_string()))
    }
}

impl FromStr for Dimension {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Header names of the free-text metadata columns. Omitted entries keep
/// their default header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataColumns {
    pub name: String,
    pub authors: String,
    pub year: String,
    pub hyperlink: String,
    pub field: String,
}

impl Default for MetadataColumns {
    fn default() -> Self {
        Self {
            name: "Name".to_string(),
            authors: "Authors".to_string(),
            year: "Year".to_string(),
            hyperlink: "Hyperlink".to_string(),
            field: "Field".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub version: String,
    #[serde(default)]
    pub columns: MetadataColumns,
    /// Columns of the installation table, in display order.
    pub display_columns: Vec<String>,
    pub dimensions: Vec<DimensionSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionSpec {
    pub code: Dimension,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub groups: Vec<GroupSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<TagSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSpec {
    pub label: String,
    #[serde(flatten)]
    pub source: TagSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagSource {
    /// One-hot column of the installation table.
    Column(String),
    /// Value of the multi-valued field column.
    Field(String),
}

impl TagSource {
    /// Identifier the row filter tests for this tag. Also used as the leaf id.
    pub fn section(&self) -> String {
        match self {
            TagSource::Column(column) => column.trim().to_string(),
            TagSource::Field(value) => to_marker(value),
        }
    }
}

impl Taxonomy {
    /// The taxonomy compiled into the crate, matching `data/installations.csv`.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(DEFAULT_TAXONOMY_JSON)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let taxonomy: Taxonomy = serde_json::from_str(text)?;
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn dimension(&self, dimension: Dimension) -> Option<&DimensionSpec> {
        self.dimensions.iter().find(|d| d.code == dimension)
    }

    /// Every one-hot column named by a leaf, across dimensions.
    pub fn tag_columns(&self) -> impl Iterator<Item = (Dimension, &str)> + '_ {
        self.dimensions.iter().flat_map(|d| {
            d.groups
                .iter()
                .flat_map(|g| g.tags.iter())
                .filter_map(move |t| match &t.source {
                    TagSource::Column(c) => Some((d.code, c.as_str())),
                    TagSource::Field(_) => None,
                })
        })
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(CatalogError::InvalidTaxonomy(msg));

        if self.version != TAXONOMY_VERSION {
            return invalid(format!(
                "unsupported version `{}` (expected `{TAXONOMY_VERSION}`)",
                self.version
            ));
        }
        if self.display_columns.is_empty() {
            return invalid("`display_columns` is empty".to_string());
        }

        for dimension in Dimension::ALL {
            let declared = self.dimensions.iter().filter(|d| d.code == dimension).count();
            if declared != 1 {
                return invalid(format!(
                    "dimension {} declared {declared} times (expected exactly once)",
                    dimension.code()
                ));
            }
        }

        for spec in &self.dimensions {
            let code = spec.code.code();
            if spec.groups.is_empty() {
                return invalid(format!("dimension {code} has no groups"));
            }

            let mut sections: HashSet<String> = HashSet::new();
            let mut labels: HashSet<&str> = HashSet::new();
            for (g, group) in spec.groups.iter().enumerate() {
                if group.label.trim().is_empty() {
                    return invalid(format!("dimension {code}: group #{} has an empty label", g + 1));
                }
                if group.tags.is_empty() {
                    return invalid(format!("dimension {code}: group `{}` has no tags", group.label));
                }
                for tag in &group.tags {
                    if tag.label.trim().is_empty() {
                        return invalid(format!(
                            "dimension {code}: group `{}` has a tag with an empty label",
                            group.label
                        ));
                    }
                    let section = tag.source.section();
                    if section.is_empty() {
                        return invalid(format!("dimension {code}: tag `{}` has an empty source", tag.label));
                    }
                    if section == spec.code.name() || is_group_id(spec.code, &section) {
                        return invalid(format!(
                            "dimension {code}: tag source `{section}` collides with a synthetic node id"
                        ));
                    }
                    if !sections.insert(section.clone()) {
                        return invalid(format!("dimension {code}: tag source `{section}` declared twice"));
                    }
                    // Dropdown values are raw labels, so they must name one leaf.
                    if !labels.insert(tag.label.as_str()) {
                        return invalid(format!("dimension {code}: tag label `{}` declared twice", tag.label));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Synthetic id of the `n`th (1-based) group of a dimension.
pub(crate) fn group_id(dimension: Dimension, n: usize) -> String {
    format!("{}-{n}", dimension.code())
}

fn is_group_id(dimension: Dimension, id: &str) -> bool {
    id.strip_prefix(dimension.code())
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_taxonomy_declares_every_dimension() {
        let taxonomy = Taxonomy::builtin().expect("builtin taxonomy");
        for d in Dimension::ALL {
            let spec = taxonomy.dimension(d).expect("dimension present");
            assert!(!spec.groups.is_empty());
        }
        assert_eq!(
            taxonomy.display_columns,
            vec!["Name", "Authors", "Field", "Hyperlink", "Year"]
        );
    }

    #[test]
    fn dimension_parse_accepts_codes_and_names() {
        assert_eq!(Dimension::parse("ai").unwrap(), Dimension::ArtisticIntention);
        assert_eq!(Dimension::parse(" SD ").unwrap(), Dimension::SystemDesign);
        assert_eq!(Dimension::parse("interaction").unwrap(), Dimension::Interaction);
        assert_eq!("FI".parse::<Dimension>().unwrap(), Dimension::Field);
        assert!(matches!(
            Dimension::parse("XX"),
            Err(CatalogError::UnknownDimension(s)) if s == "XX"
        ));
    }

    #[test]
    fn tag_source_flattens_into_tag_object() {
        let tag: TagSpec =
            serde_json::from_str(r#"{"label": "Sound<br>Design", "field": "Sound Design"}"#).unwrap();
        assert_eq!(tag.source, TagSource::Field("Sound Design".to_string()));
        assert_eq!(tag.source.section(), "Sound<br>Design");

        let tag: TagSpec = serde_json::from_str(r#"{"label": "Camera", "column": "sd_camera"}"#).unwrap();
        assert_eq!(tag.source.section(), "sd_camera");
    }

    #[test]
    fn marker_helpers_are_inverse_on_single_spaces() {
        assert_eq!(to_marker(" Computer Science "), "Computer<br>Science");
        assert_eq!(strip_marker("Computer<br>Science"), "Computer Science");
    }

    #[test]
    fn validate_rejects_duplicate_sections() {
        let mut taxonomy = Taxonomy::builtin().unwrap();
        let spec = taxonomy
            .dimensions
            .iter_mut()
            .find(|d| d.code == Dimension::SystemDesign)
            .unwrap();
        let dup = spec.groups[0].tags[0].clone();
        spec.groups[1].tags.push(dup);
        let err = taxonomy.validate().unwrap_err();
        assert!(err.to_string().contains("declared twice"), "{err}");
    }

    #[test]
    fn validate_rejects_duplicate_labels_within_a_dimension() {
        let mut taxonomy = Taxonomy::builtin().unwrap();
        let spec = &mut taxonomy.dimensions[0];
        let label = spec.groups[0].tags[0].label.clone();
        spec.groups[1].tags.push(TagSpec {
            label,
            source: TagSource::Column("ai_other".to_string()),
            description: None,
        });
        let err = taxonomy.validate().unwrap_err();
        assert!(err.to_string().contains("tag label"), "{err}");

        // The same label in two different dimensions stays legal.
        let mut taxonomy = Taxonomy::builtin().unwrap();
        let label = taxonomy.dimensions[0].groups[0].tags[0].label.clone();
        taxonomy.dimensions[1].groups[0].tags.push(TagSpec {
            label,
            source: TagSource::Column("in_other".to_string()),
            description: None,
        });
        taxonomy.validate().unwrap();
    }

    #[test]
    fn validate_rejects_missing_dimension() {
        let mut taxonomy = Taxonomy::builtin().unwrap();
        taxonomy.dimensions.retain(|d| d.code != Dimension::Field);
        let err = taxonomy.validate().unwrap_err();
        assert!(err.to_string().contains("FI declared 0 times"), "{err}");
    }

    #[test]
    fn validate_rejects_sections_shaped_like_group_ids() {
        let mut taxonomy = Taxonomy::builtin().unwrap();
        taxonomy.dimensions[0].groups[0].tags[0].source = TagSource::Column("AI-1".to_string());
        assert!(taxonomy.validate().is_err());
        assert_eq!(group_id(Dimension::Interaction, 2), "IN-2");
    }
}
