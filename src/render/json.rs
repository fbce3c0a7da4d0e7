//! JSON rendering of the aligned table.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::AlignedTable;

use super::{EmitOptions, TableLayout};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

#[derive(Serialize)]
struct JsonTable<'a> {
    header: [&'a str; 2],
    pages: usize,
    column_widths: [f32; 2],
    font_size: f32,
    line_height: f32,
    header_height: f32,
    rows: Vec<JsonRow<'a>>,
}

#[derive(Serialize)]
struct JsonRow<'a> {
    source: Option<&'a str>,
    target: Option<&'a str>,
    height: f32,
}

/// Convert a table and its layout to JSON.
pub fn to_json(table: &AlignedTable, options: &EmitOptions) -> Result<String> {
    let layout = TableLayout::compute(table, options);

    let rows = table
        .rows()
        .iter()
        .zip(&layout.row_heights)
        .map(|(row, &height)| JsonRow {
            source: row.source.as_deref(),
            target: row.target.as_deref(),
            height,
        })
        .collect();

    let document = JsonTable {
        header: [&options.source_label, &options.target_label],
        pages: table.page_count(),
        column_widths: layout.column_widths,
        font_size: layout.font_size,
        line_height: layout.line_height,
        header_height: layout.header_height,
        rows,
    };

    let result = match options.json_format {
        JsonFormat::Pretty => serde_json::to_string_pretty(&document),
        JsonFormat::Compact => serde_json::to_string(&document),
    };

    result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}
