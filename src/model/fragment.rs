//! Positioned text fragments as reported by the extraction boundary.

use serde::{Deserialize, Serialize};

/// Axis-aligned box in top-down page coordinates.
///
/// The origin is the top-left corner of the logical page and `y` grows
/// downward, so `y0 <= y1` for a well-formed box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Box width.
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    /// Box height.
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Block-type discriminator of a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    /// Running text
    #[default]
    Prose,
    /// Images and other non-text blocks
    NonProse,
}

/// A single positioned run of text, before paragraph merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFragment {
    /// Position on the logical page
    pub bbox: BoundingBox,
    /// Extracted text (empty for non-prose blocks)
    pub text: String,
    /// Prose or non-prose
    pub kind: FragmentKind,
}

impl RawFragment {
    /// Create a prose fragment.
    pub fn prose(text: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            bbox,
            text: text.into(),
            kind: FragmentKind::Prose,
        }
    }

    /// Create a non-prose fragment (image block).
    pub fn non_prose(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            text: String::new(),
            kind: FragmentKind::NonProse,
        }
    }

    /// Convenience constructor used heavily in tests: a full-width prose
    /// fragment spanning `y0..y1`.
    pub fn at(text: impl Into<String>, y0: f32, y1: f32) -> Self {
        Self::prose(text, BoundingBox::new(0.0, y0, 0.0, y1))
    }

    /// Check if this fragment carries prose.
    pub fn is_prose(&self) -> bool {
        self.kind == FragmentKind::Prose
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_union() {
        let a = BoundingBox::new(10.0, 20.0, 50.0, 30.0);
        let b = BoundingBox::new(5.0, 25.0, 40.0, 45.0);
        let u = a.union(&b);
        assert_eq!(u, BoundingBox::new(5.0, 20.0, 50.0, 45.0));
        assert_eq!(u.width(), 45.0);
        assert_eq!(u.height(), 25.0);
    }

    #[test]
    fn test_fragment_kinds() {
        assert!(RawFragment::at("text", 0.0, 10.0).is_prose());
        let image = RawFragment::non_prose(BoundingBox::default());
        assert!(!image.is_prose());
        assert!(image.text.is_empty());
    }
}
