// src/formatting/plain_text.rs
//! Plain-text views of HTML body fragments, used for word counting.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]*>").expect("tag regex is a valid pattern"));

/// Entity replacements, `&amp;` last so `&amp;lt;` decodes to `&lt;`.
const ENTITIES: [(&str, &str); 6] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&nbsp;", "\u{a0}"),
    ("&amp;", "&"),
];

/// Removes markup tags and decodes the basic HTML entities.
pub fn strip_markup(html: &str) -> String {
    let without_tags = TAG_PATTERN.replace_all(html, "");
    ENTITIES
        .iter()
        .fold(without_tags.into_owned(), |text, (entity, plain)| {
            text.replace(entity, plain)
        })
}

/// Counts words by splitting on the single space character.
///
/// Runs of spaces produce empty tokens, and those count. Empty text counts
/// as zero words.
pub fn count_words(text: &str) -> usize {
    if text.is_empty() {
        0
    } else {
        text.split(' ').count()
    }
}
