//! Error types for the ONNX Runtime backends.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when loading or running local ONNX models.
#[derive(Debug, Error)]
pub enum OrtError {
    /// Failed to load or run an ONNX session.
    #[error("onnx runtime error: {0}")]
    Ort(#[from] ort::Error),

    /// Failed to load the tokenizer.
    #[error("failed to load tokenizer from {path}: {message}")]
    Tokenizer {
        /// Path to the tokenizer file.
        path: PathBuf,
        /// Error message from the tokenizers crate.
        message: String,
    },

    /// Model path was not specified in the builder.
    #[error("model path not specified")]
    MissingModelPath,

    /// Tokenizer path was not specified and could not be inferred.
    #[error("tokenizer.json not found in {0}")]
    TokenizerNotFound(PathBuf),

    /// A model file is missing.
    #[error("model file not found: {0}")]
    ModelNotFound(PathBuf),

    /// The model produced none of the outputs we know how to read.
    #[error("model has no output named {0}")]
    MissingOutput(&'static str),

    /// An output tensor has the wrong rank.
    #[error("unexpected output shape: expected {expected} dimensions, got {actual}")]
    UnexpectedRank {
        /// Expected number of dimensions.
        expected: usize,
        /// Actual number of dimensions.
        actual: usize,
    },

    /// The embedding dimension could not be read from the model metadata.
    #[error("cannot determine embedding dimension from model outputs")]
    UnknownDimension,

    /// Tokenization or detokenization failed.
    #[error("tokenization failed: {0}")]
    Tokenization(String),

    /// Ndarray shape error.
    #[error("shape error: {0}")]
    Shape(String),

    /// The tokenized input exceeds what the encoder accepts.
    #[error("input is {tokens} tokens long, the model accepts at most {limit}")]
    InputTooLong {
        /// Tokens after encoding, including the task prefix.
        tokens: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// A session mutex was poisoned by a panic in another thread.
    #[error("onnx session lock poisoned")]
    Poisoned,
}

impl OrtError {
    /// Creates a tokenizer error from a path and error message.
    pub fn tokenizer(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Tokenizer {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_too_long_reports_both_sizes() {
        let err = OrtError::InputTooLong {
            tokens: 611,
            limit: 512,
        };
        assert_eq!(
            err.to_string(),
            "input is 611 tokens long, the model accepts at most 512"
        );
    }
}
