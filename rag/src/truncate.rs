//! Explicit word-level truncation applied before summarization.

use std::borrow::Cow;

use unicode_segmentation::UnicodeSegmentation;

/// Cuts `text` after its first `max_words` Unicode words.
///
/// Returns the kept prefix and whether anything was removed. Whitespace before the cut is dropped.
#[must_use]
pub fn truncate_words(text: &str, max_words: usize) -> (Cow<'_, str>, bool) {
    match text.unicode_word_indices().nth(max_words) {
        Some((cut, _)) => (Cow::Borrowed(text[..cut].trim_end()), true),
        None => (Cow::Borrowed(text), false),
    }
}
