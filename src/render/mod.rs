//! Table emission: layout sizing and CSV, JSON or Markdown output.

mod delimited;
mod json;
mod layout;
mod markdown;
mod options;

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use delimited::to_csv;
pub use json::{to_json, JsonFormat};
pub use layout::{chars_per_line, estimate_lines, TableLayout, MIN_ROW_HEIGHT};
pub use markdown::to_markdown;
pub use options::EmitOptions;

use crate::error::{Error, Result};
use crate::model::AlignedTable;

/// Output format of the aligned table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Markdown,
}

impl OutputFormat {
    /// Guess the format from a file extension.
    pub fn from_extension(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Markdown => "md",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "md" | "markdown" => Ok(Self::Markdown),
            other => Err(Error::Config(format!("unknown output format: {}", other))),
        }
    }
}

/// Render the table in the given format.
pub fn render(table: &AlignedTable, format: OutputFormat, options: &EmitOptions) -> Result<String> {
    match format {
        OutputFormat::Csv => to_csv(table, options),
        OutputFormat::Json => to_json(table, options),
        OutputFormat::Markdown => Ok(to_markdown(table, options)),
    }
}

/// Render the table and write it to `path` in one step.
pub fn write_table<P: AsRef<Path>>(
    table: &AlignedTable,
    path: P,
    format: OutputFormat,
    options: &EmitOptions,
) -> Result<()> {
    let content = render(table, format, options)?;
    std::fs::write(path, content)?;
    Ok(())
}
