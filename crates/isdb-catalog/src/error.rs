use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed taxonomy: {0}")]
    TaxonomyJson(#[from] serde_json::Error),

    #[error("invalid taxonomy: {0}")]
    InvalidTaxonomy(String),

    #[error("unknown dimension `{0}` (expected AI|SD|IN|FI)")]
    UnknownDimension(String),

    #[error("dataset has no `{0}` column")]
    MissingColumn(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
