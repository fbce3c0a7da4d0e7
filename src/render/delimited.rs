//! CSV output.

use csv::WriterBuilder;

use crate::error::{Error, Result};
use crate::model::AlignedTable;

use super::EmitOptions;

/// Write the table as two-column CSV with a header row.
///
/// Padding cells are empty fields. Embedded newlines and quotes are quoted
/// per RFC 4180.
pub fn to_csv(table: &AlignedTable, options: &EmitOptions) -> Result<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    writer.write_record([options.source_label.as_str(), options.target_label.as_str()])?;
    for row in table.rows() {
        writer.write_record([
            row.source.as_deref().unwrap_or(""),
            row.target.as_deref().unwrap_or(""),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Render(format!("CSV flush error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| Error::Render(format!("CSV encoding error: {}", e)))
}
