//! Grouping of drawn spans into lines, blocks and fragments.
//!
//! Spans on a shared baseline form a line; consecutive lines form a block
//! until spacing, font size or left margin change. Each block becomes one
//! prose fragment. In reading order, blocks are laid out per detected column
//! and then sorted top-to-bottom, left-to-right together with image boxes.

use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;

use crate::model::{BoundingBox, RawFragment};
use crate::script::{is_spaceless_script_char, join_lines};

use super::content::{PageItem, TextSpan};
use super::options::{ExtractOptions, ExtractOrder};

/// Fallback line spacing when a run has fewer than two lines.
const DEFAULT_LINE_SPACING: f32 = 12.0;

/// Spans sharing a baseline, sorted left to right.
#[derive(Debug, Clone)]
pub(crate) struct TextLine {
    spans: Vec<TextSpan>,
    baseline: f32,
    x: f32,
    font_size: f32,
}

impl TextLine {
    fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));

        // Dominant size, weighted by text length
        let total: usize = spans.iter().map(|s| s.text.len()).sum();
        let font_size = if total > 0 {
            spans
                .iter()
                .map(|s| s.font_size * s.text.len() as f32)
                .sum::<f32>()
                / total as f32
        } else {
            spans.first().map(|s| s.font_size).unwrap_or(0.0)
        };

        let baseline = spans.first().map(|s| s.baseline).unwrap_or(0.0);
        let x = spans.first().map(|s| s.x).unwrap_or(0.0);

        Self {
            spans,
            baseline,
            x,
            font_size,
        }
    }

    /// Line text, with a space wherever two spans are visibly apart.
    fn text(&self) -> String {
        let mut out = String::new();
        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 {
                let prev = &self.spans[i - 1];
                let gap = span.x - prev.right();
                let chars = span.text.chars().count();
                let char_width = if chars > 0 && span.width > 0.0 {
                    span.width / chars as f32
                } else {
                    span.font_size * 0.5
                };

                let seam_is_cjk = prev.text.chars().last().is_some_and(is_spaceless_script_char)
                    && span.text.chars().next().is_some_and(is_spaceless_script_char);
                let has_space = prev.text.ends_with([' ', '\u{00A0}'])
                    || span.text.starts_with([' ', '\u{00A0}']);

                if gap > char_width * 0.2 && !seam_is_cjk && !has_space {
                    out.push(' ');
                }
            }
            out.push_str(&span.text);
        }
        out
    }

    fn bbox(&self) -> BoundingBox {
        let mut spans = self.spans.iter().map(TextSpan::bbox);
        let first = spans
            .next()
            .unwrap_or_else(|| BoundingBox::new(self.x, self.baseline, self.x, self.baseline));
        spans.fold(first, |acc, b| acc.union(&b))
    }
}

/// Vertical strip of the page holding one column of text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Column {
    left: f32,
    right: f32,
}

impl Column {
    fn contains(&self, x: f32) -> bool {
        x >= self.left && x <= self.right
    }

    fn contains_span(&self, span: &TextSpan) -> bool {
        self.contains(span.x) || self.contains(span.x + span.width / 2.0)
    }
}

/// Turn a page's drawn items into fragments in the requested order.
pub(crate) fn build_fragments(items: Vec<PageItem>, options: &ExtractOptions) -> Vec<RawFragment> {
    match options.order {
        ExtractOrder::ReadingOrder => reading_order(items, options.normalize_unicode),
        ExtractOrder::Native => native_order(items, options.normalize_unicode),
    }
}

fn reading_order(items: Vec<PageItem>, normalize: bool) -> Vec<RawFragment> {
    let mut spans = Vec::new();
    let mut fragments = Vec::new();
    for item in items {
        match item {
            PageItem::Span(span) => spans.push(span),
            PageItem::Image(bbox) => fragments.push(RawFragment::non_prose(bbox)),
        }
    }

    let columns = detect_columns(&spans);
    let mut per_column: Vec<Vec<TextSpan>> = vec![Vec::new(); columns.len()];
    for span in spans {
        let idx = columns
            .iter()
            .position(|c| c.contains_span(&span))
            .unwrap_or(0);
        if let Some(bucket) = per_column.get_mut(idx) {
            bucket.push(span);
        }
    }

    for column_spans in per_column {
        let lines = group_spans_into_lines(column_spans);
        fragments.extend(
            group_lines_into_blocks(lines)
                .into_iter()
                .filter_map(|block| block_to_fragment(block, normalize)),
        );
    }

    fragments.sort_by(|a, b| {
        a.bbox
            .y0
            .partial_cmp(&b.bbox.y0)
            .unwrap_or(Ordering::Equal)
            .then(a.bbox.x0.partial_cmp(&b.bbox.x0).unwrap_or(Ordering::Equal))
    });
    fragments
}

fn native_order(items: Vec<PageItem>, normalize: bool) -> Vec<RawFragment> {
    let mut fragments = Vec::new();
    let mut lines: Vec<TextLine> = Vec::new();
    let mut line_spans: Vec<TextSpan> = Vec::new();

    let flush_blocks = |lines: &mut Vec<TextLine>, fragments: &mut Vec<RawFragment>| {
        let blocks = group_lines_into_blocks(std::mem::take(lines));
        fragments.extend(
            blocks
                .into_iter()
                .filter_map(|block| block_to_fragment(block, normalize)),
        );
    };

    for item in items {
        match item {
            PageItem::Span(span) => {
                let same_line = line_spans.last().is_some_and(|last| {
                    (span.baseline - last.baseline).abs() <= span.font_size * 0.3
                });
                if !same_line && !line_spans.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(&mut line_spans)));
                }
                line_spans.push(span);
            }
            PageItem::Image(bbox) => {
                if !line_spans.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(&mut line_spans)));
                }
                flush_blocks(&mut lines, &mut fragments);
                fragments.push(RawFragment::non_prose(bbox));
            }
        }
    }

    if !line_spans.is_empty() {
        lines.push(TextLine::from_spans(line_spans));
    }
    flush_blocks(&mut lines, &mut fragments);
    fragments
}

fn block_to_fragment(lines: Vec<TextLine>, normalize: bool) -> Option<RawFragment> {
    let mut text = String::new();
    let mut bbox: Option<BoundingBox> = None;

    for line in &lines {
        let line_text = line.text();
        let line_text = line_text.trim();
        if line_text.is_empty() {
            continue;
        }
        text = join_lines(&text, line_text);
        let line_box = line.bbox();
        bbox = Some(match bbox {
            Some(b) => b.union(&line_box),
            None => line_box,
        });
    }

    let bbox = bbox?;
    let text = if normalize { text.nfc().collect() } else { text };
    Some(RawFragment::prose(text, bbox))
}

/// Find a single vertical gutter splitting the spans into two columns.
///
/// Falls back to one column when the text is narrow, the widest gap is too
/// thin, or either side would be nearly empty.
pub(crate) fn detect_columns(spans: &[TextSpan]) -> Vec<Column> {
    const SLICE: f32 = 3.0;
    const MAX_SLICES: usize = 4096;
    const MIN_GAP: f32 = 12.0;
    const MIN_COLUMN_WIDTH: f32 = 80.0;

    if spans.is_empty() {
        return vec![Column {
            left: f32::NEG_INFINITY,
            right: f32::INFINITY,
        }];
    }

    let min_x = spans.iter().map(|s| s.x).fold(f32::INFINITY, f32::min);
    let max_x = spans.iter().map(|s| s.right()).fold(f32::NEG_INFINITY, f32::max);
    let single = vec![Column {
        left: min_x - 10.0,
        right: max_x + 10.0,
    }];

    let extent = max_x - min_x;
    if extent < 250.0 {
        return single;
    }

    let slice = SLICE.max(extent / MAX_SLICES as f32);
    let slices = ((extent / slice) as usize + 1).min(MAX_SLICES);
    let mut occupancy = vec![0usize; slices];
    for span in spans {
        let start = ((span.x - min_x) / slice) as usize;
        let end = ((span.right() - min_x) / slice) as usize;
        for slot in occupancy.iter_mut().take(end.min(slices - 1) + 1).skip(start) {
            *slot += 1;
        }
    }

    // Search the middle 70% for empty runs, preferring wide and central ones
    let center = slices as f32 / 2.0;
    let mut best: Option<(usize, usize)> = None;
    let consider = |start: usize, len: usize, best: &mut Option<(usize, usize)>| {
        let width = len as f32 * slice;
        if width < 10.0 {
            return;
        }
        let dist = ((start + len / 2) as f32 - center).abs();
        let better = match *best {
            None => true,
            Some((bs, bl)) => {
                let best_width = bl as f32 * slice;
                let best_dist = ((bs + bl / 2) as f32 - center).abs();
                width > best_width * 1.5 || (width >= best_width * 0.7 && dist < best_dist)
            }
        };
        if better {
            *best = Some((start, len));
        }
    };

    let mut run_start = 0;
    let mut run_len = 0;
    for (i, &count) in occupancy
        .iter()
        .enumerate()
        .take(slices * 85 / 100)
        .skip(slices * 15 / 100)
    {
        if count == 0 {
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
        } else if run_len > 0 {
            consider(run_start, run_len, &mut best);
            run_len = 0;
        }
    }
    if run_len > 0 {
        consider(run_start, run_len, &mut best);
    }

    let Some((gap_start, gap_len)) = best else {
        return single;
    };
    if (gap_len as f32 * slice) < MIN_GAP {
        return single;
    }

    let gutter = min_x + (gap_start as f32 + gap_len as f32 / 2.0) * slice;
    if gutter - min_x < MIN_COLUMN_WIDTH || max_x - gutter < MIN_COLUMN_WIDTH {
        log::debug!("column too narrow, treating page as single column");
        return single;
    }

    let left = spans
        .iter()
        .filter(|s| s.x + s.width / 2.0 < gutter)
        .count();
    let right = spans.len() - left;
    let min_spans = (spans.len() / 10).max(2);
    if left < min_spans || right < min_spans {
        log::debug!("spans imbalanced ({} / {}), treating page as single column", left, right);
        return single;
    }

    log::debug!("detected gutter at x={:.1}", gutter);
    vec![
        Column {
            left: min_x - 10.0,
            right: gutter,
        },
        Column {
            left: gutter,
            right: max_x + 10.0,
        },
    ]
}

/// Group one column's spans into lines, top to bottom.
fn group_spans_into_lines(mut spans: Vec<TextSpan>) -> Vec<TextLine> {
    spans.sort_by(|a, b| {
        a.baseline
            .partial_cmp(&b.baseline)
            .unwrap_or(Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
    });

    let mut lines = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_baseline: Option<f32> = None;

    for span in spans {
        let tolerance = span.font_size * 0.3;
        match current_baseline {
            Some(baseline) if (span.baseline - baseline).abs() <= tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(&mut current)));
                }
                current_baseline = Some(span.baseline);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        lines.push(TextLine::from_spans(current));
    }

    lines
}

/// Split a run of lines into blocks.
fn group_lines_into_blocks(lines: Vec<TextLine>) -> Vec<Vec<TextLine>> {
    let avg_spacing = average_line_spacing(&lines);
    let mut blocks: Vec<Vec<TextLine>> = Vec::new();
    let mut current: Vec<TextLine> = Vec::new();

    for line in lines {
        if let Some(prev) = current.last() {
            if should_break_block(prev, &line, avg_spacing) {
                blocks.push(std::mem::take(&mut current));
            }
        }
        current.push(line);
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

fn average_line_spacing(lines: &[TextLine]) -> f32 {
    let spacings: Vec<f32> = lines
        .windows(2)
        .map(|w| (w[1].baseline - w[0].baseline).abs())
        .filter(|s| *s > 0.1)
        .collect();

    if spacings.is_empty() {
        return DEFAULT_LINE_SPACING;
    }
    spacings.iter().sum::<f32>() / spacings.len() as f32
}

fn should_break_block(prev: &TextLine, curr: &TextLine, avg_spacing: f32) -> bool {
    let spacing = (curr.baseline - prev.baseline).abs();

    // Paragraph gap, either relative to this run or to the type size
    spacing > avg_spacing * 1.5
        || spacing > prev.font_size.max(curr.font_size) * 2.0
        || (prev.font_size - curr.font_size).abs() > 1.0
        || (prev.x - curr.x).abs() > 20.0
}
