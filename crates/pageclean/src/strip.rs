//! Boilerplate stripping for extracted page text

use crate::error::ExtractError;
use regex::Regex;
use std::sync::OnceLock;

/// Minimum number of characters a stripped page must keep
pub const MIN_CONTENT_LENGTH: usize = 50;

/// Anything that is not a word character, whitespace or basic punctuation
fn disallowed_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s.,!?-]").expect("valid character class"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid whitespace pattern"))
}

/// Strip boilerplate characters and whitespace from extracted text
///
/// Drops characters outside `{word, whitespace, . , ! ? -}`, collapses
/// whitespace runs to a single space, drops blank lines and trims.
/// Disallowed characters go first so their removal can never leave a
/// double space behind, which keeps the transform idempotent.
pub fn strip_boilerplate(text: &str) -> String {
    let allowed = disallowed_chars().replace_all(text, "");
    let collapsed = whitespace_runs().replace_all(&allowed, " ");

    collapsed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Reject text shorter than `min_length` characters
pub fn ensure_sufficient(text: &str, min_length: usize) -> Result<(), ExtractError> {
    let length = text.chars().count();
    if length < min_length {
        return Err(ExtractError::InsufficientContent { length });
    }
    Ok(())
}
