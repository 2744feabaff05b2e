//! Error types for the retrieval engine.

use core::fmt;
use std::time::Duration;
use thiserror::Error;

/// Model call guarded by a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// An [`EmbeddingModel::embed`](casebrief_core::EmbeddingModel::embed) call.
    Embed,
    /// A [`Summarizer::summarize`](casebrief_core::Summarizer::summarize) call.
    Summarize,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Embed => f.write_str("embedding"),
            Self::Summarize => f.write_str("summarization"),
        }
    }
}

/// Errors that can occur while building the index, retrieving, or summarizing.
#[derive(Debug, Error)]
pub enum RagError {
    /// An embedding does not have the index dimensionality.
    #[error("dimension mismatch at {position}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Where the offending vector came from.
        position: Position,
        /// Index dimensionality.
        expected: usize,
        /// Length of the offending vector.
        actual: usize,
    },

    /// The index was built from zero documents.
    #[error("cannot build an index from an empty corpus")]
    EmptyCorpus,

    /// The query is empty or whitespace only.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A numeric argument is out of range or an input is malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Embedding the query or searching the index failed.
    #[error("retrieval failed: {0}")]
    Retrieval(#[source] Box<RagError>),

    /// The embedding model failed.
    #[error("embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    /// The summarizer failed.
    #[error("summarization failed: {0}")]
    Summarization(#[source] anyhow::Error),

    /// A model call did not finish before its deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// The call that was cut off.
        operation: Operation,
        /// The configured deadline.
        after: Duration,
    },

    /// Index and corpus sizes disagree.
    #[error("index holds {index} vectors but corpus holds {corpus} documents")]
    Misaligned {
        /// Number of indexed vectors.
        index: usize,
        /// Number of corpus documents.
        corpus: usize,
    },
}

/// Origin of a vector that failed a dimension check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// The n-th embedding handed to the index builder.
    Corpus(usize),
    /// A query vector.
    Query,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corpus(id) => write!(f, "document {id}"),
            Self::Query => f.write_str("query"),
        }
    }
}

impl RagError {
    /// Returns `true` for errors caused by caller input rather than a backend.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        match self {
            Self::InvalidQuery(_) | Self::InvalidArgument(_) | Self::DimensionMismatch { .. } => {
                true
            }
            Self::Retrieval(inner) => inner.is_validation(),
            _ => false,
        }
    }

    /// Returns the innermost error, looking through [`RagError::Retrieval`] wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Retrieval(inner) => inner.root(),
            other => other,
        }
    }

    pub(crate) fn retrieval(cause: Self) -> Self {
        Self::Retrieval(Box::new(cause))
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_classified() {
        assert!(RagError::InvalidQuery("empty".into()).is_validation());
        assert!(RagError::InvalidArgument("top_k".into()).is_validation());
        assert!(!RagError::EmptyCorpus.is_validation());
        assert!(!RagError::Embedding(anyhow::anyhow!("backend down")).is_validation());
    }

    #[test]
    fn retrieval_wrapper_exposes_root_cause() {
        let err = RagError::retrieval(RagError::DimensionMismatch {
            position: Position::Query,
            expected: 8,
            actual: 10,
        });
        assert!(err.is_validation());
        assert!(matches!(err.root(), RagError::DimensionMismatch { actual: 10, .. }));
        assert_eq!(
            err.to_string(),
            "retrieval failed: dimension mismatch at query: expected 8, got 10"
        );
    }

    #[test]
    fn timeout_message_names_the_operation() {
        let err = RagError::Timeout {
            operation: Operation::Summarize,
            after: Duration::from_secs(2),
        };
        assert_eq!(err.to_string(), "summarization timed out after 2s");
    }
}
