//! Query → ranked documents.

use std::sync::Arc;
use std::time::Duration;

use casebrief_core::EmbeddingModel;

use crate::deadline::guarded;
use crate::error::{Operation, RagError, Result};
use crate::index::{FlatIndex, VectorIndex};
use crate::knowledge::KnowledgeBase;
use crate::types::RetrievedDocument;

/// Embeds `query` once and returns the `top_k` closest documents, closest first.
///
/// Validation happens before the embedder is touched: a blank query fails with
/// [`RagError::InvalidQuery`] and `top_k == 0` with [`RagError::InvalidArgument`]. The trimmed query
/// is what gets embedded. Any embedding or search failure is returned as [`RagError::Retrieval`]
/// wrapping the cause; nothing is retried.
pub async fn retrieve<M, I>(
    query: &str,
    top_k: usize,
    embedder: &M,
    knowledge: &KnowledgeBase<I>,
    embed_timeout: Option<Duration>,
) -> Result<Vec<RetrievedDocument>>
where
    M: EmbeddingModel,
    I: VectorIndex,
{
    let query = query.trim();
    if query.is_empty() {
        return Err(RagError::InvalidQuery("query is empty".into()));
    }
    if top_k == 0 {
        return Err(RagError::InvalidArgument("top_k must be at least 1".into()));
    }

    let embedding = guarded(
        Operation::Embed,
        embed_timeout,
        embedder.embed(query),
        RagError::Embedding,
    )
    .await
    .map_err(RagError::retrieval)?;

    let neighbors = knowledge
        .index()
        .search(&embedding, top_k)
        .map_err(RagError::retrieval)?;

    let corpus = knowledge.corpus();
    let documents = neighbors
        .into_iter()
        .map(|neighbor| {
            corpus
                .get(neighbor.id)
                .map(|document| RetrievedDocument {
                    document: document.clone(),
                    distance: neighbor.distance,
                })
                .ok_or_else(|| {
                    RagError::retrieval(RagError::Misaligned {
                        index: knowledge.index().len(),
                        corpus: corpus.len(),
                    })
                })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(top_k, returned = documents.len(), "retrieved documents");
    Ok(documents)
}

/// Retriever bound to an embedder and a built [`KnowledgeBase`].
pub struct Retriever<M, I = FlatIndex> {
    embedder: Arc<M>,
    knowledge: Arc<KnowledgeBase<I>>,
    embed_timeout: Option<Duration>,
}

impl<M, I> Clone for Retriever<M, I> {
    fn clone(&self) -> Self {
        Self {
            embedder: Arc::clone(&self.embedder),
            knowledge: Arc::clone(&self.knowledge),
            embed_timeout: self.embed_timeout,
        }
    }
}

impl<M, I: std::fmt::Debug> std::fmt::Debug for Retriever<M, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("knowledge", &self.knowledge)
            .field("embed_timeout", &self.embed_timeout)
            .finish_non_exhaustive()
    }
}

impl<M, I> Retriever<M, I>
where
    M: EmbeddingModel,
    I: VectorIndex,
{
    /// Creates a retriever over shared collaborators.
    #[must_use]
    pub const fn new(embedder: Arc<M>, knowledge: Arc<KnowledgeBase<I>>) -> Self {
        Self {
            embedder,
            knowledge,
            embed_timeout: None,
        }
    }

    /// Sets a deadline for the query embedding call.
    #[must_use]
    pub const fn with_embed_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.embed_timeout = timeout;
        self
    }

    /// See [`retrieve`].
    ///
    /// # Errors
    /// [`RagError::InvalidQuery`], [`RagError::InvalidArgument`] or [`RagError::Retrieval`].
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedDocument>> {
        retrieve(
            query,
            top_k,
            &*self.embedder,
            &*self.knowledge,
            self.embed_timeout,
        )
        .await
    }

    /// The shared knowledge base.
    pub fn knowledge(&self) -> &KnowledgeBase<I> {
        &self.knowledge
    }

    /// The shared embedder.
    pub fn embedder(&self) -> Arc<M> {
        Arc::clone(&self.embedder)
    }
}
