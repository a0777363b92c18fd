//! Detects pages that look like they contain LaTeX math so the math script
//! is only included where it's needed.

use regex::Regex;
use std::sync::LazyLock;

// Two `$`s with at least one character between them that's neither `$` nor
// whitespace.
static INLINE_MATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$[^$]*[^$\s][^$]*\$").expect("invalid math regex")
});

/// Returns whether any line of `text` contains a `$...$` span with
/// non-whitespace content.
pub fn has_math(text: &str) -> bool {
    text.lines().any(|line| INLINE_MATH.is_match(line))
}
