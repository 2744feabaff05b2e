//! Startup build of the corpus and its vector index.

use anyhow::Context;
use casebrief_core::EmbeddingModel;

use crate::config::PipelineConfig;
use crate::corpus::CorpusStore;
use crate::deadline::guarded;
use crate::error::{Operation, RagError, Result};
use crate::index::{FlatIndex, VectorIndex};

/// A corpus together with the index built from it.
///
/// Index identifiers are corpus positions: both hold exactly the same number of entries. The value
/// is immutable once constructed and is shared between queries behind an `Arc`.
#[derive(Debug)]
pub struct KnowledgeBase<I = FlatIndex> {
    corpus: CorpusStore,
    index: I,
}

impl KnowledgeBase<FlatIndex> {
    /// Embeds every document in corpus order and builds a [`FlatIndex`].
    ///
    /// This is the one blocking step before queries can be served.
    ///
    /// # Errors
    /// - [`RagError::EmptyCorpus`] if `corpus` has no documents (the embedder is not called)
    /// - [`RagError::Embedding`] or [`RagError::Timeout`] if a document cannot be embedded
    /// - [`RagError::DimensionMismatch`] if the embedder returns vectors of different lengths
    pub async fn build<M>(embedder: &M, corpus: CorpusStore, config: &PipelineConfig) -> Result<Self>
    where
        M: EmbeddingModel,
    {
        if corpus.is_empty() {
            return Err(RagError::EmptyCorpus);
        }

        let mut embeddings = Vec::with_capacity(corpus.len());
        for document in &corpus {
            let call = async {
                embedder
                    .embed(&document.text)
                    .await
                    .with_context(|| format!("document {}", document.id))
            };
            let embedding =
                guarded(Operation::Embed, config.embed_timeout, call, RagError::Embedding).await?;
            if document.id == 0 && embedding.len() != embedder.dim() {
                tracing::warn!(
                    advertised = embedder.dim(),
                    actual = embedding.len(),
                    "embedder dimension differs from its output, using the output"
                );
            }
            embeddings.push(embedding);
        }

        let index = FlatIndex::build(embeddings)?;
        tracing::info!(
            documents = index.len(),
            dimension = index.dimension(),
            "built vector index"
        );
        Ok(Self { corpus, index })
    }
}

impl<I: VectorIndex> KnowledgeBase<I> {
    /// Pairs a corpus with an index built elsewhere.
    ///
    /// # Errors
    /// - [`RagError::EmptyCorpus`] if the corpus is empty
    /// - [`RagError::Misaligned`] if the sizes differ
    pub fn from_parts(corpus: CorpusStore, index: I) -> Result<Self> {
        if corpus.is_empty() {
            return Err(RagError::EmptyCorpus);
        }
        if corpus.len() != index.len() {
            return Err(RagError::Misaligned {
                index: index.len(),
                corpus: corpus.len(),
            });
        }
        Ok(Self { corpus, index })
    }

    /// The document store.
    pub const fn corpus(&self) -> &CorpusStore {
        &self.corpus
    }

    /// The vector index.
    pub const fn index(&self) -> &I {
        &self.index
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    /// Always `false`: a knowledge base cannot be empty.
    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingEmbedding {
        calls: Arc<AtomicUsize>,
        fail_on: Option<&'static str>,
    }

    impl EmbeddingModel for CountingEmbedding {
        fn dim(&self) -> usize {
            2
        }

        #[allow(clippy::cast_precision_loss)]
        async fn embed(&self, text: &str) -> casebrief_core::Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(text) {
                anyhow::bail!("cannot embed {text:?}");
            }
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    fn embedder(fail_on: Option<&'static str>) -> (CountingEmbedding, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            CountingEmbedding {
                calls: calls.clone(),
                fail_on,
            },
            calls,
        )
    }

    #[tokio::test]
    async fn builds_one_vector_per_document() {
        let (model, calls) = embedder(None);
        let corpus = CorpusStore::new(["a", "bb", "ccc"]);
        let kb = KnowledgeBase::build(&model, corpus, &PipelineConfig::default())
            .await
            .unwrap();
        assert_eq!(kb.len(), 3);
        assert_eq!(kb.index().len(), 3);
        assert_eq!(kb.index().dimension(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(kb.index().embedding(1).unwrap(), &[2.0, 1.0]);
    }

    #[tokio::test]
    async fn empty_corpus_is_fatal_without_embedding() {
        let (model, calls) = embedder(None);
        let result =
            KnowledgeBase::build(&model, CorpusStore::default(), &PipelineConfig::default()).await;
        assert!(matches!(result, Err(RagError::EmptyCorpus)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn embedding_failure_names_the_document() {
        let (model, _) = embedder(Some("bb"));
        let corpus = CorpusStore::new(["a", "bb", "ccc"]);
        let err = KnowledgeBase::build(&model, corpus, &PipelineConfig::default())
            .await
            .unwrap_err();
        match err {
            RagError::Embedding(source) => assert_eq!(source.to_string(), "document 1"),
            other => panic!("expected embedding error, got {other:?}"),
        }
    }

    #[test]
    fn parts_must_align() {
        let corpus = CorpusStore::new(["a", "b", "c"]);
        let index = FlatIndex::build([vec![0.0], vec![1.0]]).unwrap();
        assert!(matches!(
            KnowledgeBase::from_parts(corpus, index),
            Err(RagError::Misaligned {
                index: 2,
                corpus: 3
            })
        ));
    }
}
