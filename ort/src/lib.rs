//! Local ONNX Runtime models for casebrief.
//!
//! This crate provides the two collaborators a casebrief pipeline needs, running entirely on the
//! local machine:
//!
//! - [`OrtEmbedding`] implements [`casebrief_core::EmbeddingModel`] for sentence encoders such as
//!   `all-mpnet-base-v2`.
//! - [`OrtSummarizer`] implements [`casebrief_core::Summarizer`] for T5-style encoder-decoder
//!   exports, decoding with [`BeamSearch`].
//!
//! Models are never downloaded: you point the loaders at a directory or at individual files.
//!
//! # Example
//!
//! ```rust,no_run
//! use casebrief_core::{EmbeddingModel, Summarizer, SummaryLength};
//! use casebrief_ort::{OrtEmbedding, OrtSummarizer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let embedder = OrtEmbedding::from_directory("./models/all-mpnet-base-v2")?;
//! let summarizer = OrtSummarizer::from_directory("./models/t5-small")?;
//!
//! let vector = embedder.embed("The tenant withheld rent.").await?;
//! assert_eq!(vector.len(), embedder.dim());
//!
//! let summary = summarizer
//!     .summarize("The tenant withheld rent for three months ...", SummaryLength::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod embedding;
mod error;
mod files;
mod generation;
mod pooling;
mod summarizer;

pub use embedding::{DEFAULT_MAX_TOKENS, OrtEmbedding, OrtEmbeddingBuilder};
pub use error::OrtError;
pub use generation::BeamSearch;
pub use pooling::PoolingStrategy;
pub use summarizer::{DEFAULT_MAX_INPUT_TOKENS, DEFAULT_PREFIX, OrtSummarizer, OrtSummarizerBuilder};
