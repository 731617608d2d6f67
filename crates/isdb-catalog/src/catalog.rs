//! The shared, read-only context every request is answered from.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::figure::SunburstFigure;
use crate::filter::{filter_rows, project_row, ListingRow};
use crate::hierarchy::Hierarchy;
use crate::tags::{Section, TagIndex};
use crate::taxonomy::{Dimension, Taxonomy};

/// Dataset, taxonomy, prebuilt hierarchies and tag index.
///
/// Built once at startup; nothing here is mutated afterwards, so a single
/// `Arc<Catalog>` can serve any number of concurrent requests.
#[derive(Debug, Clone)]
pub struct Catalog {
    taxonomy: Taxonomy,
    dataset: Dataset,
    /// Indexed by `Dimension::position`.
    hierarchies: Vec<Hierarchy>,
    tags: TagIndex,
}

/// Findings of [`Catalog::report`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub installations: usize,
    /// Tag columns the taxonomy declares but the dataset lacks.
    pub missing_columns: Vec<String>,
    /// Dataset columns neither displayed, used as metadata, nor declared as tags.
    pub unmapped_columns: Vec<String>,
    /// Declared leaves no installation carries.
    pub empty_leaves: Vec<String>,
}

impl Catalog {
    pub fn new(taxonomy: Taxonomy, dataset: Dataset) -> Result<Self> {
        taxonomy.validate()?;

        let hierarchies = Dimension::ALL
            .into_iter()
            .map(|d| Hierarchy::build(&dataset, &taxonomy, d))
            .collect::<Result<Vec<_>>>()?;
        for h in &hierarchies {
            h.check()?;
        }
        let tags = TagIndex::from_hierarchies(&hierarchies);

        tracing::info!(
            installations = dataset.len(),
            tags = tags.len(),
            source = %dataset.source().map(|p| p.display().to_string()).unwrap_or_default(),
            "catalog loaded"
        );

        Ok(Self {
            taxonomy,
            dataset,
            hierarchies,
            tags,
        })
    }

    /// Load the dataset at `data`, with the taxonomy at `taxonomy` or the
    /// builtin one.
    pub fn load(data: &Path, taxonomy: Option<&Path>) -> Result<Self> {
        let taxonomy = match taxonomy {
            Some(path) => Taxonomy::from_path(path)?,
            None => Taxonomy::builtin()?,
        };
        let dataset = Dataset::from_path(data, &taxonomy.columns)?;
        Self::new(taxonomy, dataset)
    }

    pub fn from_csv_str(csv: &str, taxonomy: Taxonomy) -> Result<Self> {
        let dataset = Dataset::from_reader(csv.as_bytes(), &taxonomy.columns)?;
        Self::new(taxonomy, dataset)
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn tags(&self) -> &TagIndex {
        &self.tags
    }

    pub fn hierarchy(&self, dimension: Dimension) -> &Hierarchy {
        &self.hierarchies[dimension.position()]
    }

    pub fn hierarchies(&self) -> &[Hierarchy] {
        &self.hierarchies
    }

    pub fn figure(&self, dimension: Dimension) -> SunburstFigure {
        SunburstFigure::from_hierarchy(self.hierarchy(dimension))
    }

    /// Column headers of the installation table.
    pub fn display_columns(&self) -> &[String] {
        &self.taxonomy.display_columns
    }

    pub fn sections<S: AsRef<str>>(&self, labels: &[S], active: Option<Dimension>) -> Vec<Section> {
        self.tags.resolve_all(labels, active)
    }

    /// Rows carrying every tag in `labels`, projected onto the display columns.
    ///
    /// Labels unknown to the tag index are tested as column names (or field
    /// values) directly; one that matches nothing empties the result.
    pub fn make_list<S: AsRef<str>>(&self, labels: &[S], active: Option<Dimension>) -> Vec<ListingRow> {
        self.list_sections(&self.sections(labels, active))
    }

    /// Rows satisfying every already-resolved section, projected onto the
    /// display columns.
    pub fn list_sections(&self, sections: &[Section]) -> Vec<ListingRow> {
        filter_rows(&self.dataset, sections)
            .into_iter()
            .filter_map(|i| self.dataset.row(i))
            .map(|row| project_row(&row, &self.taxonomy.display_columns, &self.taxonomy.columns.hyperlink))
            .collect()
    }

    pub fn report(&self) -> CheckReport {
        let mut report = CheckReport {
            installations: self.dataset.len(),
            ..CheckReport::default()
        };

        let mut known: HashSet<&str> = HashSet::new();
        let columns = &self.taxonomy.columns;
        for c in [&columns.name, &columns.authors, &columns.year, &columns.hyperlink, &columns.field] {
            known.insert(c.as_str());
        }
        for c in &self.taxonomy.display_columns {
            known.insert(c.as_str());
        }

        for (dimension, column) in self.taxonomy.tag_columns() {
            known.insert(column);
            if !self.dataset.has_column(column) {
                report.missing_columns.push(format!("{}:{column}", dimension.code()));
            }
        }

        for header in self.dataset.headers() {
            // The leading row-number column is never a tag.
            if header.is_empty() || header.eq_ignore_ascii_case("id") || known.contains(header.as_str()) {
                continue;
            }
            report.unmapped_columns.push(header.clone());
        }

        for h in &self.hierarchies {
            for leaf in h.leaves().filter(|l| l.value == 0) {
                report.empty_leaves.push(format!("{}:{}", h.dimension.code(), leaf.id));
            }
        }

        report
    }
}
