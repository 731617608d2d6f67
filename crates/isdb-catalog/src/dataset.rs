//! The installation table.
//!
//! Rows are loaded once from CSV and never mutated. Columns are addressed by
//! header name; a lookup on a column the file does not have yields `None`
//! rather than an error, so tags from older sheet revisions stay harmless.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};
use crate::taxonomy::{to_marker, MetadataColumns};

/// Separator between values of the multi-valued field column.
pub const FIELD_SEPARATOR: char = ';';

#[derive(Debug, Clone)]
pub struct Dataset {
    source: Option<PathBuf>,
    headers: Vec<String>,
    index: HashMap<String, usize>,
    field_column: Option<usize>,
    rows: Vec<Vec<String>>,
}

/// Borrowed view of one installation.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    dataset: &'a Dataset,
    index: usize,
}

impl Dataset {
    pub fn from_path(path: &Path, columns: &MetadataColumns) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut dataset = Self::from_reader(file, columns)?;
        dataset.source = Some(path.to_path_buf());
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R, columns: &MetadataColumns) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = csv
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                // Spreadsheet exports tend to prefix the first header with a BOM.
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();

        let mut index = HashMap::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            // First occurrence wins on duplicated headers.
            index.entry(header.clone()).or_insert(i);
        }

        if !index.contains_key(&columns.name) {
            return Err(CatalogError::MissingColumn(columns.name.clone()));
        }
        let field_column = index.get(&columns.field).copied();
        if field_column.is_none() {
            tracing::warn!(column = %columns.field, "dataset has no field column; field tags will be empty");
        }

        let mut rows = Vec::new();
        for record in csv.records() {
            let record = record?;
            let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
            cells.resize(headers.len(), String::new());
            rows.push(cells);
        }

        Ok(Self {
            source: None,
            headers,
            index,
            field_column,
            rows,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        (index < self.rows.len()).then_some(Row {
            dataset: self,
            index,
        })
    }

    /// Rows in source order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = Row<'_>> + '_ {
        (0..self.rows.len()).map(move |index| Row {
            dataset: self,
            index,
        })
    }

    /// Number of rows whose `column` holds a 1.
    pub fn count_flag(&self, column: &str) -> u64 {
        self.rows().filter(|row| row.flag(column) == Some(true)).count() as u64
    }

    /// Number of rows whose field list contains `token` (marker form).
    pub fn count_field(&self, token: &str) -> u64 {
        self.rows().filter(|row| row.has_field(token)).count() as u64
    }
}

impl<'a> Row<'a> {
    /// Zero-based position in the source file.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Raw cell text, or `None` if the dataset has no such column.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let i = *self.dataset.index.get(column)?;
        Some(self.dataset.rows[self.index][i].as_str())
    }

    /// One-hot value of `column`: `Some(true)` only for a numeric 1.
    /// Empty, `NaN` and non-numeric cells read as `Some(false)`; a missing
    /// column reads as `None`.
    pub fn flag(&self, column: &str) -> Option<bool> {
        let cell = self.get(column)?;
        Some(cell.parse::<f64>().map(|v| v == 1.0).unwrap_or(false))
    }

    /// Field values in marker form (`Computer Science` -> `Computer<br>Science`).
    pub fn field_tokens(&self) -> impl Iterator<Item = String> + 'a {
        let dataset: &'a Dataset = self.dataset;
        let text = dataset
            .field_column
            .map(|i| dataset.rows[self.index][i].as_str())
            .unwrap_or("");
        text.split(FIELD_SEPARATOR)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(to_marker)
    }

    pub fn has_field(&self, token: &str) -> bool {
        self.field_tokens().any(|t| t == token)
    }
}
