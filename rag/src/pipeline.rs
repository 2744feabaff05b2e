//! Retrieval followed by per-document summarization.

use std::borrow::Cow;
use std::pin::pin;
use std::sync::Arc;

use casebrief_core::{EmbeddingModel, Summarizer};
use futures::stream::{self, StreamExt};

use crate::config::{FailurePolicy, PipelineConfig};
use crate::deadline::guarded;
use crate::error::{Operation, RagError, Result};
use crate::index::{FlatIndex, VectorIndex};
use crate::knowledge::KnowledgeBase;
use crate::retriever::Retriever;
use crate::truncate::truncate_words;
use crate::types::{Document, RetrievedDocument, Summary, SummaryResult};

/// End-to-end query handling: retrieve the closest documents, then summarize each of them.
///
/// All collaborators are built once and injected; a pipeline keeps no state between queries and
/// can be shared freely.
///
/// # Example
///
/// ```rust,ignore
/// let knowledge = Arc::new(KnowledgeBase::build(&embedder, corpus, &config).await?);
/// let pipeline = Pipeline::new(Arc::new(embedder), Arc::new(summarizer), knowledge, config);
///
/// for entry in pipeline.run("tenant eviction notice", 3).await? {
///     match &entry.summary {
///         Ok(summary) => println!("#{} {}", entry.rank, summary.text),
///         Err(err) => eprintln!("#{} failed: {err}", entry.rank),
///     }
/// }
/// ```
pub struct Pipeline<M, S, I = FlatIndex> {
    retriever: Retriever<M, I>,
    summarizer: Arc<S>,
    config: PipelineConfig,
}

impl<M, S, I> Clone for Pipeline<M, S, I> {
    fn clone(&self) -> Self {
        Self {
            retriever: self.retriever.clone(),
            summarizer: Arc::clone(&self.summarizer),
            config: self.config.clone(),
        }
    }
}

impl<M, S, I: std::fmt::Debug> std::fmt::Debug for Pipeline<M, S, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("retriever", &self.retriever)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<M, S, I> Pipeline<M, S, I>
where
    M: EmbeddingModel,
    S: Summarizer,
    I: VectorIndex,
{
    /// Creates a pipeline over a built knowledge base.
    #[must_use]
    pub fn new(
        embedder: Arc<M>,
        summarizer: Arc<S>,
        knowledge: Arc<KnowledgeBase<I>>,
        config: PipelineConfig,
    ) -> Self {
        let retriever = Retriever::new(embedder, knowledge).with_embed_timeout(config.embed_timeout);
        Self {
            retriever,
            summarizer,
            config,
        }
    }

    /// Retrieves the `top_k` closest documents to `query` and summarizes each one.
    ///
    /// Entries come back in retrieval order with 1-based ranks. Under
    /// [`FailurePolicy::Isolate`] a failed summary is stored on its entry and the call still
    /// succeeds; under [`FailurePolicy::AbortBatch`] the first failure is returned instead.
    ///
    /// # Errors
    /// Any error from [`Retriever::retrieve`], or a summarization error under
    /// [`FailurePolicy::AbortBatch`].
    pub async fn run(&self, query: &str, top_k: usize) -> Result<Vec<SummaryResult>> {
        let retrieved = self.retriever.retrieve(query, top_k).await?;
        self.summarize_all(retrieved).await
    }

    /// [`run`](Self::run) with the configured default `top_k`.
    ///
    /// # Errors
    /// See [`run`](Self::run).
    pub async fn run_default(&self, query: &str) -> Result<Vec<SummaryResult>> {
        self.run(query, self.config.default_top_k).await
    }

    /// Summarizes already retrieved documents, keeping their order.
    ///
    /// # Errors
    /// The first summarization error under [`FailurePolicy::AbortBatch`].
    pub async fn summarize_all(
        &self,
        retrieved: Vec<RetrievedDocument>,
    ) -> Result<Vec<SummaryResult>> {
        let concurrency = self.config.summary_concurrency.max(1);
        let summaries = {
            let pending: Vec<_> = retrieved
                .iter()
                .map(|entry| self.summarize_document(&entry.document))
                .collect();
            let mut outcomes = pin!(stream::iter(pending).buffered(concurrency));

            let mut summaries = Vec::with_capacity(retrieved.len());
            while let Some(outcome) = outcomes.next().await {
                if let Err(err) = &outcome {
                    let document = retrieved[summaries.len()].id();
                    tracing::warn!(document, error = %err, "summarization failed");
                }
                match outcome {
                    Err(err) if self.config.failure_policy == FailurePolicy::AbortBatch => {
                        return Err(err);
                    }
                    outcome => summaries.push(outcome),
                }
            }
            summaries
        };

        Ok(retrieved
            .into_iter()
            .zip(summaries)
            .enumerate()
            .map(|(position, (entry, summary))| SummaryResult {
                rank: position + 1,
                document: entry.document,
                distance: entry.distance,
                summary,
            })
            .collect())
    }

    async fn summarize_document(&self, document: &Document) -> Result<Summary> {
        let (input, input_truncated) = match self.config.truncate_input_words {
            Some(limit) => truncate_words(&document.text, limit),
            None => (Cow::Borrowed(document.text.as_str()), false),
        };
        if input_truncated {
            tracing::debug!(document = document.id, "truncated document before summarization");
        }

        let text = guarded(
            Operation::Summarize,
            self.config.summarize_timeout,
            self.summarizer.summarize(&input, self.config.summary_length),
            RagError::Summarization,
        )
        .await?;
        if text.trim().is_empty() {
            return Err(RagError::Summarization(anyhow::anyhow!(
                "summarizer returned an empty summary"
            )));
        }
        Ok(Summary {
            text,
            input_truncated,
        })
    }

    /// The retriever used by this pipeline.
    pub const fn retriever(&self) -> &Retriever<M, I> {
        &self.retriever
    }

    /// The pipeline configuration.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::CorpusStore;
    use casebrief_core::SummaryLength;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    struct AxisEmbedding;

    impl EmbeddingModel for AxisEmbedding {
        fn dim(&self) -> usize {
            1
        }

        #[allow(clippy::cast_precision_loss)]
        async fn embed(&self, text: &str) -> casebrief_core::Result<Vec<f32>> {
            Ok(vec![text.len() as f32])
        }
    }

    /// Upper-cases its input, failing on texts containing "fail".
    #[derive(Default)]
    struct Shout {
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
        lengths: Mutex<Vec<SummaryLength>>,
    }

    impl Summarizer for Shout {
        async fn summarize(&self, text: &str, length: SummaryLength) -> casebrief_core::Result {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(text.to_string());
            self.lengths.lock().unwrap().push(length);
            if text.contains("fail") {
                anyhow::bail!("generation error");
            }
            Ok(text.to_uppercase())
        }
    }

    async fn pipeline(
        texts: &[&str],
        config: PipelineConfig,
    ) -> (Pipeline<AxisEmbedding, Shout>, Arc<Shout>) {
        let corpus = CorpusStore::new(texts.iter().copied());
        let knowledge = KnowledgeBase::build(&AxisEmbedding, corpus, &config)
            .await
            .unwrap();
        let summarizer = Arc::new(Shout::default());
        let pipeline = Pipeline::new(
            Arc::new(AxisEmbedding),
            summarizer.clone(),
            Arc::new(knowledge),
            config,
        );
        (pipeline, summarizer)
    }

    #[tokio::test]
    async fn summaries_follow_retrieval_order() {
        let (pipeline, _) = pipeline(&["aa", "aaaa", "a"], PipelineConfig::default()).await;
        let results = pipeline.run("aaa", 3).await.unwrap();
        let ranks: Vec<usize> = results.iter().map(|r| r.rank).collect();
        let ids: Vec<usize> = results.iter().map(|r| r.document.id).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        // "aa" and "aaaa" tie at distance 1; the lower id wins.
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(results[0].summary.as_ref().unwrap().text, "AA");
    }

    #[tokio::test]
    async fn failures_are_isolated_per_document() {
        let (pipeline, summarizer) =
            pipeline(&["ok-1", "fail", "ok-22"], PipelineConfig::default()).await;
        let results = pipeline.run("four", 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 3);

        let failed: Vec<bool> = results.iter().map(|r| !r.is_ok()).collect();
        let failed_id = results.iter().find(|r| !r.is_ok()).unwrap().document.id;
        assert_eq!(failed.iter().filter(|f| **f).count(), 1);
        assert_eq!(failed_id, 1);
        assert!(results.iter().all(|r| match &r.summary {
            Ok(_) => true,
            Err(err) => matches!(err, RagError::Summarization(_)),
        }));
    }

    #[tokio::test]
    async fn abort_batch_stops_at_first_failure() {
        let config = PipelineConfig::builder()
            .failure_policy(FailurePolicy::AbortBatch)
            .build();
        let (pipeline, summarizer) = pipeline(&["fail", "ok-1", "ok-22"], config).await;
        let err = pipeline.run("fail", 3).await.unwrap_err();
        assert!(matches!(err, RagError::Summarization(_)));
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
    }

    /// Sleeps asynchronously, longer for shorter texts, so later hits finish first.
    struct Staggered;

    impl Summarizer for Staggered {
        async fn summarize(&self, text: &str, _length: SummaryLength) -> casebrief_core::Result {
            let steps = 6u64.saturating_sub(text.len() as u64);
            async_io::Timer::after(Duration::from_millis(40 * steps)).await;
            Ok(text.to_uppercase())
        }
    }

    /// Blocks a thread for every call, handing the work to the `blocking` pool.
    struct Sleepy;

    impl Summarizer for Sleepy {
        async fn summarize(&self, text: &str, _length: SummaryLength) -> casebrief_core::Result {
            let text = text.to_uppercase();
            blocking::unblock(move || {
                std::thread::sleep(Duration::from_millis(400));
                Ok::<_, anyhow::Error>(text)
            })
            .await
        }
    }

    async fn pipeline_with<S: Summarizer>(
        texts: &[&str],
        summarizer: S,
        config: PipelineConfig,
    ) -> Pipeline<AxisEmbedding, S> {
        let corpus = CorpusStore::new(texts.iter().copied());
        let knowledge = KnowledgeBase::build(&AxisEmbedding, corpus, &config)
            .await
            .unwrap();
        Pipeline::new(
            Arc::new(AxisEmbedding),
            Arc::new(summarizer),
            Arc::new(knowledge),
            config,
        )
    }

    #[tokio::test]
    async fn concurrency_keeps_order() {
        let config = PipelineConfig::builder().summary_concurrency(5).build();
        let texts = ["b", "bb", "bbb", "bbbb", "bbbbb"];
        let pipeline = pipeline_with(&texts, Staggered, config).await;

        let started = Instant::now();
        let results = pipeline.run("b", 5).await.unwrap();
        let elapsed = started.elapsed();

        let summaries: Vec<&str> = results
            .iter()
            .map(|r| r.summary.as_ref().unwrap().text.as_str())
            .collect();
        assert_eq!(summaries, vec!["B", "BB", "BBB", "BBBB", "BBBBB"]);
        // One at a time would take 600ms.
        assert!(elapsed < Duration::from_millis(450), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn blocking_summaries_run_side_by_side() {
        let config = PipelineConfig::builder().summary_concurrency(3).build();
        let pipeline = pipeline_with(&["c", "cc", "ccc"], Sleepy, config).await;

        let started = Instant::now();
        let results = pipeline.run("c", 3).await.unwrap();
        let elapsed = started.elapsed();

        assert!(results.iter().all(SummaryResult::is_ok));
        assert!(elapsed < Duration::from_millis(1000), "took {elapsed:?}");
    }

    #[tokio::test]
    async fn blocking_summaries_still_time_out() {
        let config = PipelineConfig::builder()
            .summary_concurrency(3)
            .summarize_timeout(Duration::from_millis(20))
            .build();
        let pipeline = pipeline_with(&["c", "cc", "ccc"], Sleepy, config).await;

        let started = Instant::now();
        let results = pipeline.run("c", 3).await.unwrap();

        assert!(started.elapsed() < Duration::from_millis(300));
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| matches!(
            r.summary,
            Err(RagError::Timeout {
                operation: Operation::Summarize,
                ..
            })
        )));
    }

    #[tokio::test]
    async fn truncation_is_explicit_and_reported() {
        let config = PipelineConfig::builder().truncate_input_words(2).build();
        let (pipeline, summarizer) = pipeline(&["one two three four"], config).await;
        let results = pipeline.run("one", 1).await.unwrap();
        let summary = results[0].summary.as_ref().unwrap();
        assert!(summary.input_truncated);
        assert_eq!(summarizer.seen.lock().unwrap()[0], "one two");
    }

    #[tokio::test]
    async fn configured_lengths_reach_the_summarizer() {
        let config = PipelineConfig::builder()
            .summary_length(SummaryLength::new(60, 12))
            .build();
        let (pipeline, summarizer) = pipeline(&["alpha"], config).await;
        pipeline.run_default("alpha").await.unwrap();
        assert_eq!(
            summarizer.lengths.lock().unwrap()[0],
            SummaryLength::new(60, 12)
        );
    }

    #[tokio::test]
    async fn retrieval_errors_abort_before_summarizing() {
        let (pipeline, summarizer) = pipeline(&["alpha"], PipelineConfig::default()).await;
        let err = pipeline.run("   ", 1).await.unwrap_err();
        assert!(matches!(err, RagError::InvalidQuery(_)));
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    }

    struct Stalled;

    impl Summarizer for Stalled {
        async fn summarize(&self, _text: &str, _length: SummaryLength) -> casebrief_core::Result {
            async_io::Timer::after(Duration::from_secs(30)).await;
            Ok("late".into())
        }
    }

    #[tokio::test]
    async fn slow_summaries_time_out_per_entry() {
        let config = PipelineConfig::builder()
            .summarize_timeout(Duration::from_millis(20))
            .build();
        let knowledge = KnowledgeBase::build(&AxisEmbedding, CorpusStore::new(["x"]), &config)
            .await
            .unwrap();
        let pipeline = Pipeline::new(
            Arc::new(AxisEmbedding),
            Arc::new(Stalled),
            Arc::new(knowledge),
            config,
        );
        let results = pipeline.run("x", 1).await.unwrap();
        assert!(matches!(
            results[0].summary,
            Err(RagError::Timeout {
                operation: Operation::Summarize,
                ..
            })
        ));
    }
}
