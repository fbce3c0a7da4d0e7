//! Emission options and configuration.

use serde::{Deserialize, Serialize};

use super::JsonFormat;

/// Options for writing the aligned table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    /// Header label of the source column
    pub source_label: String,

    /// Header label of the target column
    pub target_label: String,

    /// Width of the source column, in character units
    pub source_width: f32,

    /// Width of the target column, in character units
    pub target_width: f32,

    /// Cell font size in points
    pub font_size: f32,

    /// JSON layout
    #[serde(skip)]
    pub json_format: JsonFormat,
}

impl EmitOptions {
    /// Create new emit options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both header labels.
    pub fn with_labels(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_label = source.into();
        self.target_label = target.into();
        self
    }

    /// Set both column widths.
    pub fn with_column_width(mut self, width: f32) -> Self {
        self.source_width = width;
        self.target_width = width;
        self
    }

    /// Set the font size.
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size;
        self
    }

    /// Set JSON layout.
    pub fn with_json_format(mut self, format: JsonFormat) -> Self {
        self.json_format = format;
        self
    }

    /// Height of one wrapped line.
    pub fn line_height(&self) -> f32 {
        self.font_size * 1.2
    }
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            source_label: "source".to_string(),
            target_label: "target".to_string(),
            source_width: 100.0,
            target_width: 100.0,
            font_size: 14.0,
            json_format: JsonFormat::Pretty,
        }
    }
}
