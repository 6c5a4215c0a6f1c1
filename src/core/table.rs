use crate::domain::model::{PageContent, RawTable};
use serde::{Deserialize, Serialize};

/// Boilerplate that statement footers and disclaimers carry inside table grids.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "Copyright",
    "Notes",
    "Bank Statement",
    "Dummy Bank Statement",
];

/// Which detected rows survive into the transactions table.
///
/// The two policies disagree on malformed rows, so exactly one is in force.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFilter {
    /// Drop repeated headers and rows with a cell containing any substring.
    Denylist(Vec<String>),
    /// Drop repeated headers and rows whose width differs from the header.
    ExactWidth,
}

impl Default for RowFilter {
    fn default() -> Self {
        RowFilter::Denylist(DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowFilterKind {
    #[default]
    Denylist,
    ExactWidth,
}

impl RowFilter {
    pub fn from_kind(kind: RowFilterKind, denylist: &[String]) -> Self {
        match kind {
            RowFilterKind::Denylist => RowFilter::Denylist(denylist.to_vec()),
            RowFilterKind::ExactWidth => RowFilter::ExactWidth,
        }
    }

    pub fn keeps(&self, row: &[String], header: &[String]) -> bool {
        if row == header {
            return false;
        }

        match self {
            RowFilter::Denylist(substrings) => !row
                .iter()
                .any(|cell| substrings.iter().any(|skip| cell.contains(skip.as_str()))),
            RowFilter::ExactWidth => row.len() == header.len(),
        }
    }
}

/// Collects the transaction table spread over the document's pages.
///
/// The first detected grid supplies the header; later pages are assumed to
/// repeat it. Returns `None` when no grid was found or no row survived.
pub fn extract_table(pages: &[PageContent], filter: &RowFilter) -> Option<RawTable> {
    let mut header: Option<Vec<String>> = None;
    let mut kept = Vec::new();

    for page in pages {
        let Some(grid) = page.table.as_ref().filter(|g| !g.is_empty()) else {
            continue;
        };

        let header_row: &Vec<String> = header.get_or_insert_with(|| grid[0].clone());
        let before = kept.len();

        for row in grid {
            if filter.keeps(row, header_row) {
                kept.push(row.clone());
            }
        }

        tracing::debug!(
            page = page.number,
            grid_rows = grid.len(),
            kept = kept.len() - before,
            "Filtered table rows"
        );
    }

    let header = header?;
    if kept.is_empty() {
        return None;
    }

    let table = RawTable::new(header, kept);
    (!table.is_empty()).then_some(table)
}
