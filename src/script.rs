//! Character classification for CJK-aware joining and width estimation.

/// Check if a character comes from a script that doesn't use word spaces.
///
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs
    (0x4E00..=0x9FFF).contains(&code)
    // Extension A
    || (0x3400..=0x4DBF).contains(&code)
    // Extensions B-F
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana
    || (0x3040..=0x309F).contains(&code)
    // Katakana
    || (0x30A0..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
    // Full-width forms (ＡＢＣ, ０-９, ！？)
    || (0xFF01..=0xFF60).contains(&code)
}

/// Check if a character occupies two columns in a monospace grid.
pub fn is_wide_char(c: char) -> bool {
    let code = c as u32;
    is_spaceless_script_char(c)
        // Hangul syllables
        || (0xAC00..=0xD7A3).contains(&code)
        // Full-width signs
        || (0xFFE0..=0xFFE6).contains(&code)
}

/// Display width of a string in columns (wide characters count as two).
pub fn display_width(text: &str) -> usize {
    text.chars().map(|c| if is_wide_char(c) { 2 } else { 1 }).sum()
}

/// Rough glyph advance of a string, in ems.
///
/// Content streams don't carry glyph widths without parsing font programs,
/// so extraction estimates them: wide characters take a full em, spaces a
/// quarter, everything else half.
pub fn estimate_em_width(text: &str) -> f32 {
    text.chars()
        .map(|c| {
            if is_wide_char(c) {
                1.0
            } else if c.is_whitespace() {
                0.25
            } else {
                0.5
            }
        })
        .sum()
}

/// Join two pieces of text from consecutive lines.
///
/// No space is inserted between two space-less script characters, or when
/// either side already carries whitespace at the seam.
pub fn join_lines(left: &str, right: &str) -> String {
    let mut out = String::with_capacity(left.len() + right.len() + 1);
    out.push_str(left);

    let last = left.chars().last();
    let first = right.chars().next();
    let needs_space = match (last, first) {
        (Some(a), Some(b)) => {
            !a.is_whitespace()
                && !b.is_whitespace()
                && !(is_spaceless_script_char(a) && is_spaceless_script_char(b))
        }
        _ => false,
    };

    if needs_space {
        out.push(' ');
    }
    out.push_str(right);
    out
}
