//! Interactive Sound Installations Database: catalog core
//!
//! Turns a flat installation spreadsheet (one row per installation, one
//! one-hot column per descriptive tag, plus a free-text `Field` list) into:
//! - sunburst hierarchies over four dimensions (Artistic Intention,
//!   Interaction, System Design, Field),
//! - a tag index that maps dropdown labels back to the columns they test,
//! - conjunctive row filtering with DOI-normalized projections.
//!
//! Everything is computed once by [`Catalog::new`] and is read-only after
//! that; presentation (HTTP, CLI) lives in `isdb-cli`.

pub mod catalog;
pub mod dataset;
pub mod doi;
pub mod error;
pub mod figure;
pub mod filter;
pub mod glossary;
pub mod hierarchy;
pub mod listing;
pub mod tags;
pub mod taxonomy;

pub use catalog::{Catalog, CheckReport};
pub use dataset::{Dataset, Row};
pub use doi::doi_to_url;
pub use error::{CatalogError, Result};
pub use figure::SunburstFigure;
pub use filter::{filter_rows, ListingCell, ListingRow};
pub use glossary::Glossary;
pub use hierarchy::{Hierarchy, Node, NodeKind};
pub use listing::{ClickPoint, Listing};
pub use tags::{DropdownOption, Section, TagEntry, TagIndex};
pub use taxonomy::{Dimension, Taxonomy};
