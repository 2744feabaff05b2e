//! Retrieval-augmented summarization over a fixed corpus.
//!
//! The crate composes two model collaborators from [`casebrief_core`] with an exact vector index:
//!
//! - [`KnowledgeBase::build`]: embed every document once at startup and index the vectors.
//! - [`Retriever::retrieve`]: embed a query and return the closest documents, closest first.
//! - [`Pipeline::run`]: retrieve, then summarize each hit independently, in retrieval order.
//!
//! The index ([`index::FlatIndex`]) is a brute-force scan under squared Euclidean distance. Results
//! are exact and deterministic: equal distances always rank the lower document id first. Nothing is
//! mutated after the build, so one knowledge base can serve any number of concurrent queries.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use casebrief_rag::{CorpusStore, KnowledgeBase, Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! let corpus = CorpusStore::new(texts);
//! let knowledge = KnowledgeBase::build(&embedder, corpus, &config).await?;
//! let pipeline = Pipeline::new(Arc::new(embedder), Arc::new(summarizer), Arc::new(knowledge), config);
//!
//! for entry in pipeline.run("unpaid rent and eviction", 3).await? {
//!     println!("{}", serde_json::to_string(&entry.to_record())?);
//! }
//! ```

pub mod config;
pub mod corpus;
mod deadline;
pub mod error;
pub mod index;
pub mod knowledge;
pub mod pipeline;
pub mod retriever;
pub mod truncate;
pub mod types;

pub use config::{FailurePolicy, PipelineConfig, PipelineConfigBuilder};
pub use corpus::CorpusStore;
pub use error::{Operation, Position, RagError, Result};
pub use index::{FlatIndex, VectorIndex};
pub use knowledge::KnowledgeBase;
pub use pipeline::Pipeline;
pub use retriever::{Retriever, retrieve};
pub use types::{Document, Neighbor, RetrievedDocument, Summary, SummaryRecord, SummaryResult};
