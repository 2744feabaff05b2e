//! Configuration for the retrieval pipeline.

use std::time::Duration;

use casebrief_core::SummaryLength;

/// What [`Pipeline::run`](crate::Pipeline::run) does when summarizing one document fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Keep the failure on that entry and finish the others.
    #[default]
    Isolate,
    /// Abort the whole query on the first failure.
    AbortBatch,
}

/// Configuration for a [`Pipeline`](crate::Pipeline).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of results when the caller does not choose.
    pub default_top_k: usize,
    /// Length bounds passed to the summarizer.
    pub summary_length: SummaryLength,
    /// Deadline for each embedding call.
    pub embed_timeout: Option<Duration>,
    /// Deadline for each summarization call.
    pub summarize_timeout: Option<Duration>,
    /// Maximum summaries generated at once within a query.
    pub summary_concurrency: usize,
    /// Handling of per-document summarization failures.
    pub failure_policy: FailurePolicy,
    /// Cut documents to this many words before summarizing.
    pub truncate_input_words: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_top_k: 3,
            summary_length: SummaryLength::default(),
            embed_timeout: None,
            summarize_timeout: None,
            summary_concurrency: 1,
            failure_policy: FailurePolicy::Isolate,
            truncate_input_words: None,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder for custom configuration.
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Creates a new configuration builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    /// Sets the default number of results.
    #[must_use]
    pub const fn default_top_k(mut self, k: usize) -> Self {
        self.config.default_top_k = k;
        self
    }

    /// Sets the summary length bounds.
    #[must_use]
    pub const fn summary_length(mut self, length: SummaryLength) -> Self {
        self.config.summary_length = length;
        self
    }

    /// Sets the deadline for each embedding call.
    #[must_use]
    pub const fn embed_timeout(mut self, timeout: Duration) -> Self {
        self.config.embed_timeout = Some(timeout);
        self
    }

    /// Sets the deadline for each summarization call.
    #[must_use]
    pub const fn summarize_timeout(mut self, timeout: Duration) -> Self {
        self.config.summarize_timeout = Some(timeout);
        self
    }

    /// Sets how many summaries may be generated at once. Values below 1 mean 1.
    #[must_use]
    pub fn summary_concurrency(mut self, limit: usize) -> Self {
        self.config.summary_concurrency = limit.max(1);
        self
    }

    /// Sets the per-document failure policy.
    #[must_use]
    pub const fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    /// Cuts documents to at most `words` words before summarizing.
    #[must_use]
    pub const fn truncate_input_words(mut self, words: usize) -> Self {
        self.config.truncate_input_words = Some(words);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> PipelineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_top_k, 3);
        assert_eq!(config.summary_length, SummaryLength::new(150, 40));
        assert!(config.embed_timeout.is_none());
        assert!(config.summarize_timeout.is_none());
        assert_eq!(config.summary_concurrency, 1);
        assert_eq!(config.failure_policy, FailurePolicy::Isolate);
        assert!(config.truncate_input_words.is_none());
    }

    #[test]
    fn builder_config() {
        let config = PipelineConfig::builder()
            .default_top_k(5)
            .summary_length(SummaryLength::new(60, 10))
            .embed_timeout(Duration::from_secs(3))
            .summarize_timeout(Duration::from_secs(30))
            .summary_concurrency(0)
            .failure_policy(FailurePolicy::AbortBatch)
            .truncate_input_words(350)
            .build();

        assert_eq!(config.default_top_k, 5);
        assert_eq!(config.summary_length.max_length, 60);
        assert_eq!(config.embed_timeout, Some(Duration::from_secs(3)));
        assert_eq!(config.summarize_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.summary_concurrency, 1);
        assert_eq!(config.failure_policy, FailurePolicy::AbortBatch);
        assert_eq!(config.truncate_input_words, Some(350));
    }
}
