//! Removal of page-number and numeric-table artifacts.

use regex::Regex;

use crate::error::Result;
use crate::model::Paragraph;

/// Default noise pattern: a digit cluster, optionally followed by more
/// clusters after separators, with optional dash decoration (`12`, `12   34`,
/// `- 7 -`, `３／４`).
pub const DEFAULT_NOISE_PATTERN: &str =
    r"[-–—]?\s*[0-9０-９]+(?:[\s\-–—/／.・,:|]+[0-9０-９]+)*\s*[-–—]?";

/// Drops paragraphs whose whole text matches a noise pattern.
///
/// Must run after reconstruction: numeric fragments are item boundaries the
/// reconstructor needs to see.
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    pattern: Regex,
}

impl NoiseFilter {
    /// Compile a filter. The pattern is anchored to the full text.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(r"^(?:{})$", pattern))?;
        Ok(Self { pattern })
    }

    /// Check if a text is noise.
    pub fn is_noise(&self, text: &str) -> bool {
        self.pattern.is_match(text.trim())
    }

    /// Drop noise paragraphs, keeping order.
    pub fn filter(&self, paragraphs: Vec<Paragraph>) -> Vec<Paragraph> {
        paragraphs
            .into_iter()
            .filter(|p| {
                let noise = self.is_noise(&p.text);
                if noise {
                    log::debug!("dropping noise paragraph {:?}", p.text);
                }
                !noise
            })
            .collect()
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self {
            pattern: Regex::new(&format!(r"^(?:{})$", DEFAULT_NOISE_PATTERN)).unwrap(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_clusters_are_noise() {
        let filter = NoiseFilter::default();
        assert!(filter.is_noise("12   34"));
        assert!(filter.is_noise("12"));
        assert!(filter.is_noise("  7  "));
        assert!(filter.is_noise("- 7 -"));
        assert!(filter.is_noise("３４"));
        assert!(filter.is_noise("1.2.3"));
    }

    #[test]
    fn test_prose_is_kept() {
        let filter = NoiseFilter::default();
        assert!(!filter.is_noise("Section 12 covers topic 34 in depth"));
        assert!(!filter.is_noise("2024年度の業績"));
        assert!(!filter.is_noise("1 Introduction"));
        assert!(!filter.is_noise(""));
    }

    #[test]
    fn test_filter_drops_whole_paragraphs() {
        let filter = NoiseFilter::default();
        let paragraphs = vec![
            Paragraph::new("本文です。", 0.0, 10.0),
            Paragraph::new("12   34", 10.0, 20.0),
            Paragraph::new("Section 12 covers topic 34 in depth", 20.0, 30.0),
        ];
        let kept: Vec<String> = filter
            .filter(paragraphs)
            .into_iter()
            .map(|p| p.text)
            .collect();
        assert_eq!(kept, vec!["本文です。", "Section 12 covers topic 34 in depth"]);
    }

    #[test]
    fn test_custom_pattern_is_anchored() {
        let filter = NoiseFilter::new(r"CONFIDENTIAL").unwrap();
        assert!(filter.is_noise("CONFIDENTIAL"));
        assert!(!filter.is_noise("CONFIDENTIAL report"));
        assert!(!filter.is_noise("12"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(NoiseFilter::new("(unclosed").is_err());
    }
}
