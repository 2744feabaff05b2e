//! Abstractive summarization contract.
//!
//! A [`Summarizer`] turns one document into a shorter text. Generation is allowed to be
//! non-deterministic (beam ties, sampling, hardware differences), so callers should only rely on
//! structural properties of the output: it terminates and is non-empty for non-empty input.
//!
//! Backends have a maximum input length. A summarizer must report over-long input as an error
//! instead of cutting it down on its own; truncation, when wanted, is an explicit step performed by
//! the caller before the call.

use alloc::string::String;
use core::future::Future;

/// Output length bounds for a generated summary, in model tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryLength {
    /// Upper bound on generated tokens.
    pub max_length: usize,
    /// Generation may not stop before this many tokens.
    pub min_length: usize,
}

impl SummaryLength {
    /// Creates length bounds. `min_length` is clamped to `max_length`.
    #[must_use]
    pub fn new(max_length: usize, min_length: usize) -> Self {
        Self {
            max_length,
            min_length: min_length.min(max_length),
        }
    }
}

impl Default for SummaryLength {
    fn default() -> Self {
        Self {
            max_length: 150,
            min_length: 40,
        }
    }
}

/// Produces abstractive summaries.
///
/// # Example
///
/// ```rust
/// use casebrief_core::{Summarizer, SummaryLength};
///
/// struct Lead;
///
/// impl Summarizer for Lead {
///     async fn summarize(&self, text: &str, length: SummaryLength) -> casebrief_core::Result {
///         let words: Vec<&str> = text.split_whitespace().take(length.max_length).collect();
///         Ok(words.join(" "))
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let summary = Lead.summarize("one two three", SummaryLength::new(2, 1)).await.unwrap();
/// assert_eq!(summary, "one two");
/// # });
/// ```
pub trait Summarizer: Send + Sync {
    /// Generates a summary of `text` within `length` bounds.
    ///
    /// Fails when the backend fails or when `text` exceeds the model's input limit.
    ///
    /// Heavy synchronous work belongs off the polling thread; deadlines and concurrency are
    /// applied by polling the returned future.
    fn summarize(
        &self,
        text: &str,
        length: SummaryLength,
    ) -> impl Future<Output = crate::Result<String>> + Send;
}

impl<T: Summarizer> Summarizer for &T {
    fn summarize(
        &self,
        text: &str,
        length: SummaryLength,
    ) -> impl Future<Output = crate::Result<String>> + Send {
        (**self).summarize(text, length)
    }
}
