//! Sunburst trace payloads for the dashboard frontend.

use serde::Serialize;

use crate::hierarchy::Hierarchy;
use crate::taxonomy::Dimension;

pub const HOVER_TEMPLATE: &str = "<b>%{label} </b> <br>Elements concerned: %{value}<br>";
pub const MAX_DEPTH: u8 = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SunburstFigure {
    pub dimension: Dimension,
    pub name: &'static str,
    pub installations: usize,
    pub ids: Vec<String>,
    pub labels: Vec<String>,
    pub parents: Vec<String>,
    pub values: Vec<u64>,
    pub branchvalues: &'static str,
    pub maxdepth: u8,
    pub hovertemplate: &'static str,
    pub colorscale: &'static str,
    /// Log-scaled marker colors; `None` entries are zero-value nodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_colors: Option<Vec<Option<f64>>>,
}

impl SunburstFigure {
    pub fn from_hierarchy(h: &Hierarchy) -> Self {
        // The field chart keeps the default palette.
        let marker_colors = (h.dimension != Dimension::Field).then(|| {
            h.values
                .iter()
                .map(|&v| (v > 0).then(|| (v as f64).ln()))
                .collect()
        });

        Self {
            dimension: h.dimension,
            name: h.dimension.name(),
            installations: h.installations,
            ids: h.ids.clone(),
            labels: h.labels.clone(),
            parents: h.parents.clone(),
            values: h.values.clone(),
            branchvalues: "total",
            maxdepth: MAX_DEPTH,
            hovertemplate: HOVER_TEMPLATE,
            colorscale: h.dimension.colorscale(),
            marker_colors,
        }
    }
}
