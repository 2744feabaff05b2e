//! # casebrief
//!
//! High level façade crate that re-exports the model traits from [`casebrief_core`] and the
//! retrieval engine from [`casebrief_rag`]. Enable the `ort` feature to get the local ONNX
//! Runtime backends as [`ort`].
//!
//! ## What's inside?
//!
//! - [`EmbeddingModel`] and [`Summarizer`], the two model seams.
//! - [`KnowledgeBase`], built once from a corpus and shared between queries.
//! - [`Retriever`] for exact k-nearest-neighbour search under squared Euclidean distance.
//! - [`Pipeline`], which retrieves and then summarizes every hit in rank order.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use casebrief::{CorpusStore, KnowledgeBase, Pipeline, PipelineConfig};
//! use casebrief::ort::{OrtEmbedding, OrtSummarizer};
//!
//! async fn demo(texts: Vec<String>) -> anyhow::Result<()> {
//!     let embedder = OrtEmbedding::from_directory("models/all-mpnet-base-v2")?;
//!     let summarizer = OrtSummarizer::from_directory("models/t5-small")?;
//!     let config = PipelineConfig::default();
//!
//!     let knowledge = KnowledgeBase::build(&embedder, CorpusStore::new(texts), &config).await?;
//!     let pipeline = Pipeline::new(Arc::new(embedder), Arc::new(summarizer), Arc::new(knowledge), config);
//!
//!     for case in pipeline.run("unlawful eviction", 3).await? {
//!         println!("Case {}: {:?}", case.rank, case.summary.map(|s| s.text));
//!     }
//!     Ok(())
//! }
//! ```

pub use casebrief_core::{Embedding, EmbeddingModel, Summarizer, SummaryLength};
pub use casebrief_rag::*;

#[cfg(feature = "ort")]
pub use casebrief_ort as ort;
