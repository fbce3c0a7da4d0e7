//! Markdown table rendering.

use crate::model::AlignedTable;

use super::EmitOptions;

/// Render the table as a two-column GitHub-flavored Markdown table.
pub fn to_markdown(table: &AlignedTable, options: &EmitOptions) -> String {
    let mut output = String::new();

    push_row(&mut output, &options.source_label, &options.target_label);
    output.push_str("| --- | --- |\n");

    for row in table.rows() {
        push_row(
            &mut output,
            row.source.as_deref().unwrap_or(""),
            row.target.as_deref().unwrap_or(""),
        );
    }

    output
}

fn push_row(output: &mut String, source: &str, target: &str) {
    output.push_str("| ");
    output.push_str(&escape_cell(source));
    output.push_str(" | ");
    output.push_str(&escape_cell(target));
    output.push_str(" |\n");
}

/// Escape a cell: pipes and backslashes are escaped, line breaks become
/// `<br>` so the row stays on one line.
fn escape_cell(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.trim().chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' | '|' => {
                result.push('\\');
                result.push(c);
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                result.push_str("<br>");
            }
            '\n' => result.push_str("<br>"),
            _ => result.push(c),
        }
    }
    result
}
