//! Text normalisation applied before layout.
//!
//! Source files and program output arrive with whatever bytes the student's
//! editor or the toolchain produced: CRLF endings, tabs, a UTF-8 BOM, ANSI
//! colour codes from `g++ -fdiagnostics-color`, stray form feeds. None of
//! that survives monospaced PDF text well, so each rule here rewrites one
//! class of artefact. All rules are pure `&str → String` passes.
//!
//! ## Rule Order
//!
//! Line endings first so later rules only see `\n`; escape sequences before
//! control characters because ESC is itself a control character; tabs are
//! expanded last so column positions are computed on the final text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Columns between tab stops.
pub const TAB_WIDTH: usize = 4;

/// Normalise text for monospaced layout.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Strip ANSI escape sequences (colour codes, cursor movement)
/// 3. Strip invisible Unicode (BOM, zero-width spaces, soft hyphens)
/// 4. Drop remaining control characters except `\n` and `\t`
/// 5. Expand tabs to the next multiple of [`TAB_WIDTH`] columns
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_ansi_escapes(&s);
    let s = remove_invisible_chars(&s);
    let s = remove_control_chars(&s);
    expand_tabs(&s, TAB_WIDTH)
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip ANSI escape sequences ─────────────────────────────────────

static RE_ANSI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b(?:\[[0-?]*[ -/]*[@-~]|\][^\x07\x1b]*(?:\x07|\x1b\\)|[@-Z\\-_])").unwrap()
});

fn strip_ansi_escapes(input: &str) -> String {
    RE_ANSI.replace_all(input, "").into_owned()
}

// ── Rule 3: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Remove control characters ────────────────────────────────────────

fn remove_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|&c| c == '\n' || c == '\t' || !c.is_control())
        .collect()
}

// ── Rule 5: Expand tabs ──────────────────────────────────────────────────────

fn expand_tabs(input: &str, width: usize) -> String {
    if !input.contains('\t') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len() + 16);
    let mut column = 0usize;
    for c in input.chars() {
        match c {
            '\t' => {
                let pad = width - column % width;
                out.extend(std::iter::repeat_n(' ', pad));
                column += pad;
            }
            '\n' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_strip_ansi_colour_codes() {
        let input = "\x1b[1mmain.cpp:3:5:\x1b[0m \x1b[01;31merror:\x1b[0m expected ';'";
        assert_eq!(strip_ansi_escapes(input), "main.cpp:3:5: error: expected ';'");
    }

    #[test]
    fn test_strip_ansi_leaves_plain_text() {
        assert_eq!(strip_ansi_escapes("x = [1, 2]"), "x = [1, 2]");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "\u{FEFF}print('hi')\u{200B}";
        assert_eq!(remove_invisible_chars(input), "print('hi')");
    }

    #[test]
    fn test_remove_control_chars_keeps_newlines_and_tabs() {
        assert_eq!(remove_control_chars("a\x0cb\n\tc\x07"), "ab\n\tc");
    }

    #[test]
    fn test_expand_tabs_to_stops() {
        assert_eq!(expand_tabs("\tx", 4), "    x");
        assert_eq!(expand_tabs("ab\tc", 4), "ab  c");
        assert_eq!(expand_tabs("abcd\te", 4), "abcd    e");
        assert_eq!(expand_tabs("a\n\tb", 4), "a\n    b");
    }

    #[test]
    fn test_clean_text_full_pipeline() {
        let input = "\u{FEFF}int main() {\r\n\tputs(\"\x1b[32mok\x1b[0m\");\r\n}\r\n";
        let result = clean_text(input);
        assert_eq!(result, "int main() {\n    puts(\"ok\");\n}\n");
    }
}
