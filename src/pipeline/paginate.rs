//! Layout: wrap monospaced text to the page width and cut it into pages.
//!
//! Widths are estimated, not measured: every character is assumed to be
//! `font_size × 0.6` points wide. That is exactly the advance width of the
//! Courier family used by [`crate::pipeline::render`], so for ASCII text the
//! estimate is the real width.
//!
//! ## Wrapping
//!
//! A line that is too wide is broken greedily. Each sub-line takes as many
//! content characters as the width holds, then backs up to the last
//! whitespace so words are not split; only a single word longer than the
//! whole line is hard-split. The indentation is not charged against that
//! budget. The first sub-line keeps the line's indentation, continuation
//! sub-lines get two extra spaces so the reader can see they belong to the
//! line above:
//!
//! ```text
//!     result = compute(first_argument, second_argument,
//!       third_argument)
//! ```

use crate::error::Code2PdfError;
use tracing::debug;

/// Average advance width of a monospaced glyph as a fraction of the font size.
pub const CHAR_WIDTH_RATIO: f32 = 0.6;

/// Extra indentation in front of continuation sub-lines.
const CONTINUATION_INDENT: &str = "  ";

/// Inputs for [`paginate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub max_lines_per_page: usize,
    pub page_width: f32,
    pub font_size: f32,
    pub margin: f32,
}

impl LayoutParams {
    /// Page width minus both margins.
    pub fn effective_width(&self) -> f32 {
        self.page_width - 2.0 * self.margin
    }

    /// Estimated advance width of one character.
    pub fn char_width(&self) -> f32 {
        self.font_size * CHAR_WIDTH_RATIO
    }

    /// Characters whose estimated width fits in the effective width. May be
    /// zero for absurd geometry.
    pub fn chars_per_line(&self) -> usize {
        // The epsilon keeps an exact fit (e.g. 500 pt / 6 pt) from flooring
        // one short because of f32 rounding.
        (self.effective_width() / self.char_width() + 1e-4).floor() as usize
    }

    /// [`Self::chars_per_line`], but at least 1 so wrapping always progresses.
    pub fn max_chars(&self) -> usize {
        self.chars_per_line().max(1)
    }

    fn validate(&self) -> Result<(), Code2PdfError> {
        if self.max_lines_per_page == 0 {
            return Err(Code2PdfError::InvalidConfig(
                "max lines per page must be ≥ 1".into(),
            ));
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(Code2PdfError::InvalidConfig(format!(
                "font size must be a positive number, got {}",
                self.font_size
            )));
        }
        let width = self.effective_width();
        if !(width.is_finite() && width > 0.0) {
            return Err(Code2PdfError::InvalidConfig(format!(
                "effective width must be positive, got {width} (page width {}, margin {})",
                self.page_width, self.margin
            )));
        }
        Ok(())
    }
}

/// Lay `text` out into page-sized blocks.
///
/// Each returned string holds at most `params.max_lines_per_page` lines
/// joined with `\n`; blocks are in reading order. Empty text yields no
/// blocks. A single trailing line break does not count as an extra empty
/// line, so `"a\n"` and `"a"` paginate identically.
///
/// # Errors
/// [`Code2PdfError::InvalidConfig`] if `max_lines_per_page` is zero or the
/// font size / effective width is not positive.
pub fn paginate(text: &str, params: &LayoutParams) -> Result<Vec<String>, Code2PdfError> {
    params.validate()?;

    let mut pages = Vec::new();
    let mut current: Vec<String> = Vec::with_capacity(params.max_lines_per_page);

    for line in split_lines(text) {
        for wrapped in wrap_line(line, params) {
            current.push(wrapped);
            if current.len() == params.max_lines_per_page {
                pages.push(current.join("\n"));
                current.clear();
            }
        }
    }
    if !current.is_empty() {
        pages.push(current.join("\n"));
    }

    debug!(
        "Paginated {} bytes into {} page(s) of ≤{} lines",
        text.len(),
        pages.len(),
        params.max_lines_per_page
    );
    Ok(pages)
}

/// Split on `\n`, dropping the empty piece after a final line break.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    let empty = text.is_empty();
    body.split('\n').filter(move |_| !empty)
}

/// Wrap one raw line into sub-lines that fit the effective width.
///
/// Every returned sub-line has its trailing whitespace trimmed. A line that
/// already fits comes back as a single element. The content of each
/// sub-line (everything after its indentation) holds at most
/// [`LayoutParams::max_chars`] characters.
pub fn wrap_line(line: &str, params: &LayoutParams) -> Vec<String> {
    let line = line.trim_end();
    let indent_end = line
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    let (indent, content) = line.split_at(indent_end);

    let max_chars = params.max_chars();
    if line.chars().count() <= max_chars {
        return vec![line.to_string()];
    }

    let mut out = Vec::new();
    let mut prefix = indent.to_string();
    let mut remaining = content;

    while !remaining.is_empty() {
        if remaining.chars().count() <= max_chars {
            out.push(format!("{prefix}{remaining}").trim_end().to_string());
            break;
        }

        let (head, tail) = split_at_word_boundary(remaining, max_chars);
        out.push(format!("{prefix}{head}").trim_end().to_string());
        remaining = tail.trim_start();

        if out.len() == 1 {
            prefix.push_str(CONTINUATION_INDENT);
        }
    }

    out
}

/// Split `s` so the head has at most `room` characters, preferring the last
/// whitespace at or before the boundary. Falls back to a hard split.
fn split_at_word_boundary(s: &str, room: usize) -> (&str, &str) {
    // Byte offset of the character at index `room` (the first one that does
    // not fit). Callers guarantee `s` has more than `room` characters.
    let boundary = s
        .char_indices()
        .nth(room)
        .map(|(i, _)| i)
        .unwrap_or(s.len());

    let window_end = boundary + s[boundary..].chars().next().map_or(0, char::len_utf8);
    let split = s[..window_end]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map(|(i, _)| i)
        .filter(|&i| i > 0);

    match split {
        Some(i) => (&s[..i], &s[i..]),
        None => (&s[..boundary], &s[boundary..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Params whose effective width holds exactly `chars` characters.
    fn params_for(chars: usize, max_lines: usize) -> LayoutParams {
        // font 10 → 6 pt per char
        LayoutParams {
            max_lines_per_page: max_lines,
            page_width: chars as f32 * 6.0 + 20.0,
            font_size: 10.0,
            margin: 10.0,
        }
    }

    fn lines_of(pages: &[String]) -> Vec<String> {
        pages
            .iter()
            .flat_map(|p| p.split('\n').map(str::to_string))
            .collect()
    }

    #[test]
    fn max_chars_matches_width() {
        assert_eq!(params_for(5, 10).max_chars(), 5);
        assert_eq!(params_for(80, 10).max_chars(), 80);
    }

    #[test]
    fn hello_world_splits_at_space() {
        let pages = paginate("hello world", &params_for(7, 10)).unwrap();
        assert_eq!(lines_of(&pages), vec!["hello", "  world"]);
    }

    #[test]
    fn five_char_budget_keeps_world_whole() {
        let pages = paginate("hello world", &params_for(5, 10)).unwrap();
        assert_eq!(pages, vec!["hello\n  world"]);
    }

    #[test]
    fn continuation_indent_does_not_split_fitting_words() {
        let wrapped = wrap_line("ab cdefg hijkl", &params_for(5, 100));
        assert_eq!(wrapped, vec!["ab", "  cdefg", "  hijkl"]);
    }

    #[test]
    fn empty_text_is_empty_sequence() {
        assert!(paginate("", &params_for(20, 5)).unwrap().is_empty());
    }

    #[test]
    fn single_trailing_newline_is_not_a_line() {
        let p = params_for(20, 5);
        assert_eq!(paginate("a\n", &p).unwrap(), vec!["a"]);
        assert_eq!(paginate("a\n\n", &p).unwrap(), vec!["a\n"]);
        assert_eq!(paginate("\n", &p).unwrap(), vec![""]);
    }

    #[test]
    fn zero_max_lines_is_config_error() {
        let err = paginate("x", &params_for(20, 0)).unwrap_err();
        assert!(matches!(err, Code2PdfError::InvalidConfig(_)));
    }

    #[test]
    fn non_positive_geometry_is_config_error() {
        let mut p = params_for(20, 5);
        p.font_size = 0.0;
        assert!(paginate("x", &p).is_err());

        let mut p = params_for(20, 5);
        p.margin = p.page_width;
        assert!(paginate("x", &p).is_err());
    }

    #[test]
    fn blocks_never_exceed_max_lines() {
        let text: String = (0..97).map(|i| format!("line {i} {}\n", "w ".repeat(i % 13))).collect();
        for n in [1, 2, 7, 50] {
            let pages = paginate(&text, &params_for(12, n)).unwrap();
            assert!(!pages.is_empty());
            for page in &pages {
                assert!(page.split('\n').count() <= n, "page over {n} lines: {page:?}");
            }
        }
    }

    #[test]
    fn short_lines_paginate_losslessly() {
        let lines: Vec<String> = (0..23).map(|i| format!("    let x{i} = {i};")).collect();
        let text = lines.join("\n");
        let pages = paginate(&text, &params_for(40, 10)).unwrap();

        let expected: Vec<String> = lines.chunks(10).map(|c| c.join("\n")).collect();
        assert_eq!(pages, expected);
        assert_eq!(pages.len(), 3);
    }

    #[test]
    fn whitespace_only_line_is_kept_as_empty_line() {
        let pages = paginate("a\n   \t \nb", &params_for(20, 10)).unwrap();
        assert_eq!(pages, vec!["a\n\nb"]);
    }

    #[test]
    fn overlong_line_splits_within_budget() {
        let p = params_for(20, 100);
        let line = "alpha beta gamma delta epsilon zeta eta theta iota kappa";
        let wrapped = wrap_line(line, &p);
        assert!(wrapped.len() >= 2);
        for sub in &wrapped {
            assert!(sub.trim_start().chars().count() <= 20, "too wide: {sub:?}");
        }
        let words: Vec<&str> = wrapped.iter().flat_map(|s| s.split_whitespace()).collect();
        assert_eq!(words, line.split_whitespace().collect::<Vec<_>>());
    }

    #[test]
    fn indentation_first_and_continuation() {
        let p = params_for(24, 100);
        let line = "    print(first_value, second_value, third_value)";
        let wrapped = wrap_line(line, &p);
        assert!(wrapped.len() >= 2);
        assert!(wrapped[0].starts_with("    p"));
        for cont in &wrapped[1..] {
            assert!(cont.starts_with("      "), "continuation: {cont:?}");
            assert!(!cont[6..].starts_with(' '), "continuation: {cont:?}");
        }
    }

    #[test]
    fn long_word_is_hard_split() {
        let p = params_for(8, 100);
        let wrapped = wrap_line("abcdefghijklmnopqrst", &p);
        assert_eq!(wrapped, vec!["abcdefgh", "  ijklmnop", "  qrst"]);
    }

    #[test]
    fn split_prefers_whitespace_at_boundary() {
        assert_eq!(split_at_word_boundary("hello world", 5), ("hello", " world"));
        assert_eq!(split_at_word_boundary("hi there world", 10), ("hi there", " world"));
        assert_eq!(split_at_word_boundary("abcdefgh", 3), ("abc", "defgh"));
    }

    #[test]
    fn multibyte_characters_count_as_one() {
        let p = params_for(4, 100);
        let wrapped = wrap_line("éééééé", &p);
        assert_eq!(wrapped, vec!["éééé", "  éé"]);
    }

    #[test]
    fn trailing_whitespace_is_trimmed() {
        let pages = paginate("code();   \n", &params_for(40, 5)).unwrap();
        assert_eq!(pages, vec!["code();"]);
    }

    #[test]
    fn deep_indentation_still_progresses() {
        let p = params_for(6, 100);
        let wrapped = wrap_line("          xy", &p);
        assert!(!wrapped.is_empty());
        let content: String = wrapped.iter().map(|s| s.trim()).collect();
        assert_eq!(content, "xy");
    }
}
