//! Extraction options.

use serde::{Deserialize, Serialize};

/// Order in which fragments are returned for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractOrder {
    /// Column-aware, top-to-bottom then left-to-right
    #[default]
    #[serde(rename = "reading", alias = "reading_order")]
    ReadingOrder,
    /// Whatever order the content stream draws text in
    Native,
}

/// Options for fragment extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Fragment order
    pub order: ExtractOrder,

    /// Normalize fragment text to Unicode NFC
    pub normalize_unicode: bool,

    /// Emit non-prose fragments for image XObjects
    pub include_images: bool,

    /// Maximum nesting depth when descending into form XObjects
    pub max_form_depth: u8,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set fragment order.
    pub fn with_order(mut self, order: ExtractOrder) -> Self {
        self.order = order;
        self
    }

    /// Use native content-stream order.
    pub fn native(mut self) -> Self {
        self.order = ExtractOrder::Native;
        self
    }

    /// Enable or disable NFC normalization.
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize_unicode = normalize;
        self
    }

    /// Enable or disable image fragments.
    pub fn with_images(mut self, include: bool) -> Self {
        self.include_images = include;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            order: ExtractOrder::ReadingOrder,
            normalize_unicode: true,
            include_images: true,
            max_form_depth: 8,
        }
    }
}
