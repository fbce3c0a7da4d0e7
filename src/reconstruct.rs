//! Paragraph reconstruction from positioned fragments.
//!
//! Extraction tends to cut prose at line wraps, column boxes and font
//! changes. The reconstructor walks a page's fragments in order and glues a
//! fragment onto the running paragraph when three tests pass:
//!
//! 1. the vertical gap to the paragraph's bottom edge is below the threshold,
//! 2. the paragraph does not already end with a sentence terminator,
//! 3. the fragment does not start with a digit (a new numbered item).
//!
//! Terminators and digit ranges come from a per-language [`LanguageProfile`].

use serde::{Deserialize, Serialize};

use crate::model::{Paragraph, RawFragment};

/// Default vertical gap (page units) under which fragments may merge.
pub const DEFAULT_MERGE_THRESHOLD: f32 = 3.0;

/// Sentence terminators and numbered-item digits for one language stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageProfile {
    /// Marks that close a sentence; a paragraph ending with one never merges
    pub terminators: Vec<String>,
    /// Inclusive character ranges counted as item-leading digits
    pub item_digits: Vec<(char, char)>,
}

impl LanguageProfile {
    /// Full-width Japanese terminators `。！？`.
    pub fn japanese() -> Self {
        Self {
            terminators: vec!["。".into(), "！".into(), "？".into()],
            item_digits: default_digits(),
        }
    }

    /// ASCII terminators `. ! ?`.
    pub fn english() -> Self {
        Self {
            terminators: vec![".".into(), "!".into(), "?".into()],
            item_digits: default_digits(),
        }
    }

    /// Preset for a language code (`ja`, `en`, or the English names).
    pub fn for_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "ja" | "jp" | "japanese" => Some(Self::japanese()),
            "en" | "english" => Some(Self::english()),
            _ => None,
        }
    }

    /// Replace the terminator set.
    pub fn with_terminators<I, S>(mut self, terminators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terminators = terminators.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the digit ranges.
    pub fn with_item_digits(mut self, ranges: Vec<(char, char)>) -> Self {
        self.item_digits = ranges;
        self
    }

    /// Check if `text` ends with one of the terminators.
    pub fn ends_sentence(&self, text: &str) -> bool {
        let text = text.trim_end();
        self.terminators
            .iter()
            .any(|t| !t.is_empty() && text.ends_with(t.as_str()))
    }

    /// Check if `text` starts with an item digit.
    pub fn starts_item(&self, text: &str) -> bool {
        text.chars().next().is_some_and(|c| {
            self.item_digits
                .iter()
                .any(|&(lo, hi)| (lo..=hi).contains(&c))
        })
    }
}

impl Default for LanguageProfile {
    fn default() -> Self {
        Self::japanese()
    }
}

/// ASCII and full-width digits.
fn default_digits() -> Vec<(char, char)> {
    vec![('0', '9'), ('\u{FF10}', '\u{FF19}')]
}

/// Merges a page's fragments into paragraphs.
#[derive(Debug, Clone)]
pub struct ParagraphReconstructor {
    threshold: f32,
    profile: LanguageProfile,
}

impl ParagraphReconstructor {
    /// Create a reconstructor for one language stream.
    pub fn new(threshold: f32, profile: LanguageProfile) -> Self {
        Self { threshold, profile }
    }

    /// Merge threshold in page units.
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Language profile in use.
    pub fn profile(&self) -> &LanguageProfile {
        &self.profile
    }

    /// Reconstruct paragraphs from one page's fragments, in order.
    ///
    /// Non-prose fragments and fragments with blank text are skipped
    /// transparently: they neither open nor close a paragraph, and the next
    /// real fragment is measured against the last real paragraph.
    pub fn reconstruct(&self, fragments: &[RawFragment]) -> Vec<Paragraph> {
        let mut paragraphs = Vec::new();
        let mut current: Option<Paragraph> = None;

        for fragment in fragments {
            if !fragment.is_prose() {
                continue;
            }
            let text = fragment.text.trim();
            if text.is_empty() {
                continue;
            }

            if let Some(paragraph) = current.as_mut() {
                if self.should_merge(paragraph, fragment.bbox.y0, text) {
                    paragraph.append(text, fragment.bbox.y1);
                    continue;
                }
            }

            let next = Paragraph::new(text, fragment.bbox.y0, fragment.bbox.y1);
            if let Some(done) = current.replace(next) {
                paragraphs.push(done);
            }
        }

        if let Some(done) = current {
            paragraphs.push(done);
        }

        paragraphs.retain(|p| !p.is_empty());
        paragraphs
    }

    fn should_merge(&self, paragraph: &Paragraph, y0: f32, text: &str) -> bool {
        let close = y0 - paragraph.y1 < self.threshold;
        let open_sentence = !self.profile.ends_sentence(&paragraph.text);
        let new_item = self.profile.starts_item(text);

        log::trace!(
            "merge test: gap={:.1} close={} open={} item={}",
            y0 - paragraph.y1,
            close,
            open_sentence,
            new_item
        );

        close && open_sentence && !new_item
    }
}

impl Default for ParagraphReconstructor {
    fn default() -> Self {
        Self::new(DEFAULT_MERGE_THRESHOLD, LanguageProfile::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoundingBox;

    fn ja(threshold: f32) -> ParagraphReconstructor {
        ParagraphReconstructor::new(threshold, LanguageProfile::japanese())
    }

    fn texts(paragraphs: &[Paragraph]) -> Vec<&str> {
        paragraphs.iter().map(|p| p.text.as_str()).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(ja(5.0).reconstruct(&[]).is_empty());
    }

    #[test]
    fn test_reference_scenario() {
        let fragments = vec![
            RawFragment::at("第一段落", 0.0, 10.0),
            RawFragment::at("の続き。", 10.0, 20.0),
            RawFragment::at("2", 30.0, 35.0),
        ];
        let paragraphs = ja(5.0).reconstruct(&fragments);
        assert_eq!(texts(&paragraphs), vec!["第一段落の続き。", "2"]);
        assert_eq!(paragraphs[0].y0, 0.0);
        assert_eq!(paragraphs[0].y1, 20.0);
    }

    #[test]
    fn test_chain_merges_into_one() {
        let fragments = vec![
            RawFragment::at("A", 0.0, 10.0),
            RawFragment::at("B", 11.0, 20.0),
            RawFragment::at("C", 21.0, 30.0),
        ];
        let paragraphs = ja(5.0).reconstruct(&fragments);
        assert_eq!(texts(&paragraphs), vec!["ABC"]);
        assert_eq!(paragraphs[0].fragments, 3);
        assert_eq!(paragraphs[0].y1, 30.0);
    }

    #[test]
    fn test_digit_start_never_merges() {
        let fragments = vec![
            RawFragment::at("項目一覧", 0.0, 10.0),
            RawFragment::at("1 最初の項目", 10.0, 20.0),
            RawFragment::at("２ 全角の項目", 20.0, 30.0),
        ];
        let paragraphs = ja(100.0).reconstruct(&fragments);
        assert_eq!(
            texts(&paragraphs),
            vec!["項目一覧", "1 最初の項目", "２ 全角の項目"]
        );
    }

    #[test]
    fn test_terminator_always_splits() {
        let fragments = vec![
            RawFragment::at("終わり！", 0.0, 10.0),
            RawFragment::at("次の文", 10.0, 20.0),
            RawFragment::at("疑問？", 20.0, 30.0),
            RawFragment::at("答え", 20.0, 30.0),
        ];
        let paragraphs = ja(100.0).reconstruct(&fragments);
        assert_eq!(texts(&paragraphs), vec!["終わり！", "次の文疑問？", "答え"]);
    }

    #[test]
    fn test_gap_at_threshold_splits() {
        let fragments = vec![
            RawFragment::at("上", 0.0, 10.0),
            RawFragment::at("下", 15.0, 25.0),
        ];
        assert_eq!(texts(&ja(5.0).reconstruct(&fragments)), vec!["上", "下"]);
        assert_eq!(texts(&ja(5.1).reconstruct(&fragments)), vec!["上下"]);
    }

    #[test]
    fn test_blank_fragments_are_transparent() {
        let fragments = vec![
            RawFragment::at("前半", 0.0, 10.0),
            RawFragment::at("   ", 40.0, 50.0),
            RawFragment::at("後半", 12.0, 20.0),
        ];
        let paragraphs = ja(5.0).reconstruct(&fragments);
        assert_eq!(texts(&paragraphs), vec!["前半後半"]);
    }

    #[test]
    fn test_non_prose_is_transparent() {
        let fragments = vec![
            RawFragment::at("図の", 0.0, 10.0),
            RawFragment::non_prose(BoundingBox::new(0.0, 10.0, 100.0, 200.0)),
            RawFragment::at("説明", 11.0, 20.0),
        ];
        let paragraphs = ja(5.0).reconstruct(&fragments);
        assert_eq!(texts(&paragraphs), vec!["図の説明"]);
    }

    #[test]
    fn test_fragment_text_is_trimmed() {
        let fragments = vec![
            RawFragment::at("  line one ", 0.0, 10.0),
            RawFragment::at("\nline two\n", 10.0, 20.0),
        ];
        let en = ParagraphReconstructor::new(5.0, LanguageProfile::english());
        assert_eq!(texts(&en.reconstruct(&fragments)), vec!["line oneline two"]);
    }

    #[test]
    fn test_english_profile() {
        let fragments = vec![
            RawFragment::at("The first sentence ends here.", 0.0, 10.0),
            RawFragment::at("A new one", 10.0, 20.0),
            RawFragment::at(" continues", 20.0, 30.0),
        ];
        let en = ParagraphReconstructor::new(5.0, LanguageProfile::english());
        let paragraphs = en.reconstruct(&fragments);
        assert_eq!(
            texts(&paragraphs),
            vec!["The first sentence ends here.", "A new onecontinues"]
        );
    }

    #[test]
    fn test_custom_terminators() {
        let profile = LanguageProfile::english().with_terminators([";"]);
        let r = ParagraphReconstructor::new(5.0, profile);
        let fragments = vec![
            RawFragment::at("clause;", 0.0, 10.0),
            RawFragment::at("next.", 10.0, 20.0),
            RawFragment::at("same", 20.0, 30.0),
        ];
        assert_eq!(texts(&r.reconstruct(&fragments)), vec!["clause;", "next.same"]);
    }

    #[test]
    fn test_profile_predicates() {
        let profile = LanguageProfile::japanese();
        assert!(profile.ends_sentence("文。"));
        assert!(profile.ends_sentence("文。  "));
        assert!(!profile.ends_sentence("文"));
        assert!(profile.starts_item("3章"));
        assert!(profile.starts_item("３章"));
        assert!(!profile.starts_item("第3章"));
        assert!(!profile.starts_item(""));
    }

    #[test]
    fn test_profile_for_code() {
        assert_eq!(LanguageProfile::for_code("JA"), Some(LanguageProfile::japanese()));
        assert_eq!(LanguageProfile::for_code("english"), Some(LanguageProfile::english()));
        assert_eq!(LanguageProfile::for_code("fr"), None);
    }
}
