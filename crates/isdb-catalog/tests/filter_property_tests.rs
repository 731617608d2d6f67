use isdb_catalog::{Catalog, Dimension, NodeKind, Taxonomy};
use proptest::prelude::*;

const MAX_ROWS: usize = 24;

/// (column, label) pairs of the interaction dimension of the builtin taxonomy.
const TAGS: [(&str, &str); 5] = [
    ("in_single", "Single<br>User"),
    ("in_multi", "Multi<br>User"),
    ("in_touch", "Touch"),
    ("in_movement", "Movement"),
    ("in_voice", "Voice"),
];

const FIELDS: [&str; 4] = ["Music", "Visual Arts", "Acoustics", "Sound Design"];

#[derive(Debug, Clone)]
struct SheetCase {
    flags: Vec<[bool; 5]>,
    fields: Vec<Vec<usize>>,
}

impl SheetCase {
    fn csv(&self) -> String {
        let mut out = String::from("ID,Name,Authors,Year,Hyperlink,Field");
        for (column, _) in TAGS {
            out.push(',');
            out.push_str(column);
        }
        out.push('\n');
        for (i, (flags, fields)) in self.flags.iter().zip(&self.fields).enumerate() {
            let field = fields.iter().map(|f| FIELDS[*f]).collect::<Vec<_>>().join("; ");
            out.push_str(&format!("{i},row{i},author{i},2000,10.1/{i},\"{field}\""));
            for flag in flags {
                out.push_str(if *flag { ",1" } else { ",0" });
            }
            out.push('\n');
        }
        out
    }

    fn catalog(&self) -> Catalog {
        Catalog::from_csv_str(&self.csv(), Taxonomy::builtin().expect("taxonomy")).expect("catalog")
    }

    fn rows_with(&self, tags: &[usize]) -> Vec<usize> {
        (0..self.flags.len())
            .filter(|&r| tags.iter().all(|&t| self.flags[r][t]))
            .collect()
    }
}

fn sheet_case() -> impl Strategy<Value = SheetCase> {
    (0usize..=MAX_ROWS).prop_flat_map(|rows| {
        (
            prop::collection::vec(prop::array::uniform5(any::<bool>()), rows),
            prop::collection::vec(prop::collection::vec(0usize..FIELDS.len(), 0..=3), rows),
        )
            .prop_map(|(flags, fields)| SheetCase { flags, fields })
    })
}

fn row_ids(rows: &[isdb_catalog::ListingRow]) -> Vec<usize> {
    rows.iter().map(|r| r.row).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn hierarchies_are_well_formed(case in sheet_case()) {
        let catalog = case.catalog();
        for d in Dimension::ALL {
            let h = catalog.hierarchy(d);
            prop_assert_eq!(h.ids.len(), h.labels.len());
            prop_assert_eq!(h.ids.len(), h.parents.len());
            prop_assert_eq!(h.ids.len(), h.values.len());
            prop_assert_eq!(h.parents.iter().filter(|p| p.is_empty()).count(), 1);
            for parent in h.parents.iter().filter(|p| !p.is_empty()) {
                prop_assert!(h.ids.contains(parent), "dangling parent {}", parent);
            }
            for node in h.nodes().filter(|n| n.kind != NodeKind::Leaf) {
                let children: u64 = h.nodes().filter(|c| c.parent == node.id).map(|c| c.value).sum();
                prop_assert_eq!(node.value, children);
            }
            prop_assert!(h.check().is_ok());
        }
    }

    #[test]
    fn empty_selection_returns_every_row_in_order(case in sheet_case()) {
        let catalog = case.catalog();
        let none: [&str; 0] = [];
        let rows = catalog.make_list(&none, None);
        prop_assert_eq!(row_ids(&rows), (0..case.flags.len()).collect::<Vec<_>>());
    }

    #[test]
    fn single_tag_count_matches_column(case in sheet_case(), t in 0usize..TAGS.len()) {
        let catalog = case.catalog();
        let rows = catalog.make_list(&[TAGS[t].1], Some(Dimension::Interaction));
        prop_assert_eq!(row_ids(&rows), case.rows_with(&[t]));

        let leaf = catalog.hierarchy(Dimension::Interaction).find(TAGS[t].0).expect("leaf");
        prop_assert_eq!(leaf.value as usize, rows.len());
    }

    #[test]
    fn tag_pairs_are_conjunctive(case in sheet_case(), a in 0usize..TAGS.len(), b in 0usize..TAGS.len()) {
        let catalog = case.catalog();
        let rows = catalog.make_list(&[TAGS[a].1, TAGS[b].1], None);
        prop_assert_eq!(row_ids(&rows), case.rows_with(&[a, b]));
    }

    #[test]
    fn field_tags_match_field_lists(case in sheet_case(), f in 0usize..FIELDS.len()) {
        let catalog = case.catalog();
        let label = FIELDS[f].replace(' ', "<br>");
        let rows = catalog.make_list(&[label.as_str()], Some(Dimension::Field));
        let expected: Vec<usize> = (0..case.fields.len()).filter(|&r| case.fields[r].contains(&f)).collect();
        prop_assert_eq!(row_ids(&rows), expected);
    }

    #[test]
    fn filtering_is_idempotent(case in sheet_case(), a in 0usize..TAGS.len()) {
        let catalog = case.catalog();
        let first = catalog.make_list(&[TAGS[a].1], None);
        let second = catalog.make_list(&[TAGS[a].1], None);
        prop_assert_eq!(first, second);
    }
}
