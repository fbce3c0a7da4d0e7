//! Row height estimation for spreadsheet-style output.
//!
//! Cells wrap at a fixed number of characters derived from the column width
//! (`max(10, floor(width * 1.8))`). Each cell's line count is estimated by a
//! greedy word wrap, and a row is as tall as its tallest cell, never less
//! than 15 points.

use serde::Serialize;

use crate::model::AlignedTable;
use crate::script::display_width;

use super::EmitOptions;

/// Minimum row height in points.
pub const MIN_ROW_HEIGHT: f32 = 15.0;

/// Column widths and per-row heights of a rendered table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableLayout {
    /// Source and target column widths, in character units
    pub column_widths: [f32; 2],
    pub font_size: f32,
    pub line_height: f32,
    /// Header row height
    pub header_height: f32,
    /// Body row heights, one per table row
    pub row_heights: Vec<f32>,
}

impl TableLayout {
    /// Compute the layout of `table` under `options`.
    pub fn compute(table: &AlignedTable, options: &EmitOptions) -> Self {
        let widths = [
            chars_per_line(options.source_width),
            chars_per_line(options.target_width),
        ];
        let line_height = options.line_height();

        let height = |cells: [Option<&str>; 2]| -> f32 {
            let lines = cells
                .iter()
                .zip(widths)
                .filter_map(|(cell, width)| cell.map(|text| estimate_lines(text, width)))
                .max()
                .unwrap_or(1)
                .max(1);
            (lines as f32 * line_height).max(MIN_ROW_HEIGHT)
        };

        let header_height = height([
            Some(options.source_label.as_str()),
            Some(options.target_label.as_str()),
        ]);
        let row_heights = table
            .rows()
            .iter()
            .map(|row| height([row.source.as_deref(), row.target.as_deref()]))
            .collect();

        Self {
            column_widths: [options.source_width, options.target_width],
            font_size: options.font_size,
            line_height,
            header_height,
            row_heights,
        }
    }
}

/// Characters that fit on one line of a column `width` units wide.
pub fn chars_per_line(width: f32) -> usize {
    ((width * 1.8).floor().max(0.0) as usize).max(10)
}

/// Estimate wrapped lines for `text` at `chars_per_line`.
///
/// Every `\n`-separated segment takes at least one line. Words wrap greedily
/// with one space between them; a word longer than a line takes
/// `ceil(len / chars_per_line)` lines. Wide characters count twice.
pub fn estimate_lines(text: &str, chars_per_line: usize) -> usize {
    let cpl = chars_per_line.max(1);
    let mut lines = 0;

    for segment in text.split('\n') {
        let mut current = 0usize;
        let mut words = segment.split_whitespace().peekable();
        if words.peek().is_none() {
            lines += 1;
            continue;
        }

        for word in words {
            let len = display_width(word);
            if current > 0 && current + 1 + len <= cpl {
                current += 1 + len;
                continue;
            }
            if current > 0 {
                lines += 1;
            }
            let overflow = len.saturating_sub(1) / cpl;
            lines += overflow;
            current = len - overflow * cpl;
        }

        if current > 0 {
            lines += 1;
        }
    }

    lines
}
