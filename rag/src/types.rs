//! Core types for the engine.

use serde::{Deserialize, Serialize};

use crate::error::RagError;

/// A corpus document: immutable text at a stable 0-based position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Position in the corpus, assigned at load time.
    pub id: usize,
    /// Raw text content.
    pub text: String,
}

impl Document {
    /// Creates a document.
    #[must_use]
    pub fn new(id: usize, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

/// One k-NN hit from a [`VectorIndex`](crate::index::VectorIndex).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    /// Identifier of the stored vector (its corpus position).
    pub id: usize,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
}

/// A retrieved document with its distance to the query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// The matching document.
    pub document: Document,
    /// Squared Euclidean distance (lower is closer).
    pub distance: f32,
}

impl RetrievedDocument {
    /// Identifier of the matching document.
    #[must_use]
    pub const fn id(&self) -> usize {
        self.document.id
    }
}

/// A generated summary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Summary text.
    pub text: String,
    /// Whether the document was cut before being summarized.
    pub input_truncated: bool,
}

/// Outcome of the pipeline for one retrieved document.
///
/// `summary` holds the per-document failure when the summarizer failed and the pipeline isolates
/// failures.
#[derive(Debug)]
pub struct SummaryResult {
    /// 1-based position in the result list.
    pub rank: usize,
    /// The retrieved document.
    pub document: Document,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
    /// The summary, or why it could not be produced.
    pub summary: Result<Summary, RagError>,
}

impl SummaryResult {
    /// Returns `true` if the summary was produced.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.summary.is_ok()
    }

    /// Converts into a serializable record for presentation layers.
    #[must_use]
    pub fn to_record(&self) -> SummaryRecord {
        let (summary, error, input_truncated) = match &self.summary {
            Ok(summary) => (Some(summary.text.clone()), None, summary.input_truncated),
            Err(err) => (None, Some(err.to_string()), false),
        };
        SummaryRecord {
            rank: self.rank,
            document_id: self.document.id,
            document_text: self.document.text.clone(),
            distance: self.distance,
            summary,
            error,
            input_truncated,
        }
    }
}

/// Flat, serializable view of a [`SummaryResult`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// 1-based position in the result list.
    pub rank: usize,
    /// Corpus position of the document.
    pub document_id: usize,
    /// Document text.
    pub document_text: String,
    /// Squared Euclidean distance to the query.
    pub distance: f32,
    /// Generated summary, absent on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Failure message, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Whether the document was cut before being summarized.
    pub input_truncated: bool,
}
