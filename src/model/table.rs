//! The flattened two-column table.

use serde::{Deserialize, Serialize};

use super::PageRecord;

/// One row of the aligned table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableRow {
    /// Column A cell
    pub source: Option<String>,
    /// Column B cell
    pub target: Option<String>,
}

/// Rows built by concatenating every page record's source and target lists
/// independently.
///
/// Row `k` of column A and row `k` of column B are simply the `k`-th entries
/// of each flattened stream; the shorter column is padded with empty cells.
/// The table is built once and then only read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AlignedTable {
    rows: Vec<TableRow>,
    page_count: usize,
}

impl AlignedTable {
    /// Flatten page records into a table.
    pub fn from_records(records: &[PageRecord]) -> Self {
        let source: Vec<&String> = records
            .iter()
            .flat_map(|r| r.source_paragraphs.iter())
            .collect();
        let target: Vec<&String> = records
            .iter()
            .flat_map(|r| r.target_paragraphs.iter())
            .collect();

        let len = source.len().max(target.len());
        let rows = (0..len)
            .map(|i| TableRow {
                source: source.get(i).map(|s| (*s).clone()),
                target: target.get(i).map(|s| (*s).clone()),
            })
            .collect();

        Self {
            rows,
            page_count: records.len(),
        }
    }

    /// All rows in order.
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Number of rows (header excluded).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of pages the table was built from.
    pub fn page_count(&self) -> usize {
        self.page_count
    }
}
