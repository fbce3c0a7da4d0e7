//! Per-page paired paragraph records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which of the two parallel documents something belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Source-language document (column A)
    Source,
    /// Target-language document (column B)
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Source => f.write_str("source"),
            Side::Target => f.write_str("target"),
        }
    }
}

/// Build the page-marker pseudo-paragraph for a page, e.g. `"P0"`.
pub fn page_marker(prefix: &str, page_index: usize) -> String {
    format!("{}{}", prefix, page_index)
}

/// Paragraphs of one logical page from both documents.
///
/// Both sequences start with the page marker. They are not required to have
/// equal length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Zero-based logical page index, identical in both documents
    pub page_index: usize,
    /// Marker followed by the source page's paragraphs
    pub source_paragraphs: Vec<String>,
    /// Marker followed by the target page's paragraphs
    pub target_paragraphs: Vec<String>,
}

impl PageRecord {
    /// Create a record, prefixing both paragraph lists with `marker`.
    pub fn new(
        page_index: usize,
        marker: &str,
        source: impl IntoIterator<Item = String>,
        target: impl IntoIterator<Item = String>,
    ) -> Self {
        let source_paragraphs = std::iter::once(marker.to_string()).chain(source).collect();
        let target_paragraphs = std::iter::once(marker.to_string()).chain(target).collect();
        Self {
            page_index,
            source_paragraphs,
            target_paragraphs,
        }
    }

    /// Paragraph list for one side, marker included.
    pub fn paragraphs(&self, side: Side) -> &[String] {
        match side {
            Side::Source => &self.source_paragraphs,
            Side::Target => &self.target_paragraphs,
        }
    }

    /// Check if a side produced nothing but its page marker.
    pub fn is_empty_side(&self, side: Side) -> bool {
        self.paragraphs(side).len() <= 1
    }

    /// Number of table rows this page occupies.
    pub fn row_span(&self) -> usize {
        self.source_paragraphs
            .len()
            .max(self.target_paragraphs.len())
    }
}
