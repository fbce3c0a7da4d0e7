//! Reconstructed paragraphs.

use serde::{Deserialize, Serialize};

/// A unit of prose formed by merging adjacent fragments.
///
/// `text` is always the direct concatenation of the merged fragment texts,
/// with no separator inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Accumulated text
    pub text: String,
    /// Top edge of the first fragment
    pub y0: f32,
    /// Bottom edge of the most recently merged fragment
    pub y1: f32,
    /// Number of fragments merged into this paragraph
    pub fragments: usize,
}

impl Paragraph {
    /// Start a paragraph from a single fragment.
    pub fn new(text: impl Into<String>, y0: f32, y1: f32) -> Self {
        Self {
            text: text.into(),
            y0,
            y1,
            fragments: 1,
        }
    }

    /// Append a fragment's text and take over its bottom edge.
    pub fn append(&mut self, text: &str, y1: f32) {
        self.text.push_str(text);
        self.y1 = y1;
        self.fragments += 1;
    }

    /// Check if the paragraph has no visible text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
