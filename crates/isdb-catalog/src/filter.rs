//! Conjunctive tag filtering over the installation table.

use serde::Serialize;

use crate::dataset::{Dataset, Row};
use crate::doi::doi_to_url;
use crate::tags::Section;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingCell {
    pub column: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// A matching installation projected onto the display columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingRow {
    /// Zero-based row in the source file.
    pub row: usize,
    pub cells: Vec<ListingCell>,
}

/// Does `row` satisfy `section`?
///
/// A field token equal to the section satisfies it; otherwise the section is
/// tested as a one-hot column. A column the dataset does not have leaves the
/// selector unsatisfied.
pub fn section_satisfied(row: &Row<'_>, section: &Section) -> bool {
    let column = section.column();
    row.has_field(column) || row.flag(column).unwrap_or(false)
}

pub fn row_matches(row: &Row<'_>, sections: &[Section]) -> bool {
    sections.iter().all(|s| section_satisfied(row, s))
}

/// Indices of the rows satisfying every section, in source order.
/// An empty selection matches every row.
pub fn filter_rows(dataset: &Dataset, sections: &[Section]) -> Vec<usize> {
    dataset
        .rows()
        .filter(|row| row_matches(row, sections))
        .map(|row| row.index())
        .collect()
}

pub fn project_row(row: &Row<'_>, display_columns: &[String], hyperlink_column: &str) -> ListingRow {
    let cells = display_columns
        .iter()
        .map(|column| {
            let text = row.get(column).unwrap_or("");
            if column == hyperlink_column {
                let url = doi_to_url(text).into_owned();
                ListingCell {
                    column: column.clone(),
                    href: (!url.is_empty()).then(|| url.clone()),
                    text: url,
                }
            } else {
                ListingCell {
                    column: column.clone(),
                    text: text.to_string(),
                    href: None,
                }
            }
        })
        .collect();

    ListingRow {
        row: row.index(),
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::MetadataColumns;

    const SHEET: &str = "\
Name,Authors,Year,Hyperlink,Field,A,B
row1,x,2001,10.1/one,Music,1,1
row2,y,2002,DOI:10.1/two,Visual Arts; Music,1,0
row3,z,2003,https://example.com/three,,0,1
";

    fn sheet() -> Dataset {
        Dataset::from_reader(SHEET.as_bytes(), &MetadataColumns::default()).unwrap()
    }

    fn sections(cols: &[&str]) -> Vec<Section> {
        cols.iter().map(|c| Section::Found(c.to_string())).collect()
    }

    #[test]
    fn conjunction_of_tags() {
        let ds = sheet();
        assert_eq!(filter_rows(&ds, &sections(&["A", "B"])), vec![0]);
        assert_eq!(filter_rows(&ds, &sections(&["A"])), vec![0, 1]);
        assert_eq!(filter_rows(&ds, &sections(&["B"])), vec![0, 2]);
        assert_eq!(filter_rows(&ds, &[]), vec![0, 1, 2]);
    }

    #[test]
    fn field_tokens_and_unknown_columns() {
        let ds = sheet();
        assert_eq!(filter_rows(&ds, &sections(&["Music"])), vec![0, 1]);
        assert_eq!(filter_rows(&ds, &sections(&["Visual<br>Arts", "A"])), vec![1]);
        assert!(filter_rows(&ds, &[Section::UseAsIs("C".to_string())]).is_empty());
        assert!(filter_rows(&ds, &[Section::UseAsIs("A".to_string()), Section::UseAsIs("C".to_string())]).is_empty());
    }

    #[test]
    fn projection_normalizes_hyperlinks() {
        let ds = sheet();
        let display: Vec<String> = ["Name", "Authors", "Field", "Hyperlink", "Year"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let projected = project_row(&ds.row(1).unwrap(), &display, "Hyperlink");
        assert_eq!(projected.row, 1);
        let texts: Vec<&str> = projected.cells.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["row2", "y", "Visual Arts; Music", "https://doi.org/10.1/two", "2002"]
        );
        assert_eq!(projected.cells[3].href.as_deref(), Some("https://doi.org/10.1/two"));
        assert_eq!(projected.cells[0].href, None);

        let third = project_row(&ds.row(2).unwrap(), &display, "Hyperlink");
        assert_eq!(third.cells[3].text, "https://example.com/three");
    }

    #[test]
    fn missing_display_column_projects_empty_cell() {
        let ds = sheet();
        let display = vec!["Name".to_string(), "Venue".to_string()];
        let projected = project_row(&ds.row(0).unwrap(), &display, "Hyperlink");
        assert_eq!(projected.cells[1].text, "");
    }
}
