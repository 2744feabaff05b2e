//! # casebrief-core
//!
//! `no_std` trait abstractions for the two model collaborators of the casebrief engine. The engine
//! never depends on a concrete model; it is generic over these traits, and backend crates simply
//! implement them.
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │  casebrief-rag  │───▶│  casebrief-core  │◀───│    Backends     │
//! │                 │    │   (this crate)   │    │                 │
//! │ - FlatIndex     │    │                  │    │ - casebrief-ort │
//! │ - Retriever     │    │ - EmbeddingModel │    │ - test mocks    │
//! │ - Pipeline      │    │ - Summarizer     │    │                 │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! | Capability | Trait | Description |
//! |------------|-------|-------------|
//! | **Embeddings** | [`EmbeddingModel`] | Convert text to a fixed-length vector |
//! | **Summarization** | [`Summarizer`] | Produce an abstractive summary of a document |
//!
//! ## Example
//!
//! ```rust
//! use casebrief_core::{EmbeddingModel, Summarizer, SummaryLength};
//!
//! async fn brief(
//!     embedder: &impl EmbeddingModel,
//!     summarizer: &impl Summarizer,
//!     text: &str,
//! ) -> casebrief_core::Result {
//!     let vector = embedder.embed(text).await?;
//!     assert_eq!(vector.len(), embedder.dim());
//!     summarizer.summarize(text, SummaryLength::default()).await
//! }
//! ```

#![no_std]
extern crate alloc;

/// Text embeddings.
pub mod embedding;
/// Abstractive summarization.
pub mod summarize;

use alloc::string::String;

#[doc(inline)]
pub use embedding::{Embedding, EmbeddingModel};
#[doc(inline)]
pub use summarize::{SummaryLength, Summarizer};

/// Result type used by model collaborators.
///
/// Type alias for [`anyhow::Result<T>`](anyhow::Result) with [`String`] as default success type.
pub type Result<T = String> = anyhow::Result<T>;

pub use anyhow::Error;
