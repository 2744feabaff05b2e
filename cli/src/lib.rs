//! Command-line front end for casebrief.
//!
//! Loads a corpus and two local ONNX models, builds the knowledge base once, then answers queries
//! from the command line or an interactive prompt.
//!
//! # Usage
//!
//! ```bash
//! casebrief --corpus billsum.jsonl \
//!     --embedding-model models/all-mpnet-base-v2 \
//!     --summarizer-model models/t5-small \
//!     --query "tenant eviction without notice" --top-k 3
//! ```

pub mod args;
pub mod corpus;
pub mod render;

pub use args::Args;
