//! Sentence embeddings from an ONNX encoder.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use casebrief_core::EmbeddingModel;
use ndarray::Ix3;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};

use crate::files::{load_session, load_tokenizer, locate, locate_tokenizer, lock};
use crate::{OrtError, PoolingStrategy};

/// Default token budget, the limit `all-mpnet-base-v2` was trained with.
pub const DEFAULT_MAX_TOKENS: usize = 384;

const HIDDEN_STATE_OUTPUTS: [&str; 3] = ["last_hidden_state", "hidden_states", "output"];

/// An embedding model backed by ONNX Runtime.
///
/// Inputs longer than the configured token budget are truncated by the tokenizer. Inference runs
/// on the `blocking` thread pool, so callers can race it against a timer.
///
/// ```rust,no_run
/// use casebrief_ort::OrtEmbedding;
///
/// let embedder = OrtEmbedding::from_directory("./models/all-mpnet-base-v2")?;
///
/// let embedder = OrtEmbedding::builder()
///     .model_path("./model/model.onnx")
///     .tokenizer_path("./model/tokenizer.json")
///     .max_tokens(256)
///     .build()?;
/// # Ok::<(), casebrief_ort::OrtError>(())
/// ```
pub struct OrtEmbedding {
    encoder: Arc<Encoder>,
    dimension: usize,
}

struct Encoder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    pooling: PoolingStrategy,
    normalize: bool,
}

impl std::fmt::Debug for OrtEmbedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtEmbedding")
            .field("dimension", &self.dimension)
            .field("pooling", &self.encoder.pooling)
            .field("normalize", &self.encoder.normalize)
            .finish_non_exhaustive()
    }
}

impl OrtEmbedding {
    /// Loads `model.onnx` and `tokenizer.json` from a directory with default settings.
    ///
    /// # Errors
    /// Returns an error if the model or tokenizer cannot be found or loaded.
    pub fn from_directory(path: impl AsRef<Path>) -> Result<Self, OrtError> {
        let dir = path.as_ref();
        let model_path = locate(dir, &["model.onnx", "model_fp32.onnx", "model_quantized.onnx"])
            .ok_or_else(|| OrtError::ModelNotFound(dir.join("model.onnx")))?;
        Self::builder()
            .model_path(model_path)
            .tokenizer_path(locate_tokenizer(dir)?)
            .build()
    }

    /// Create a builder for custom configuration.
    #[must_use]
    pub fn builder() -> OrtEmbeddingBuilder {
        OrtEmbeddingBuilder::default()
    }

    /// Returns the pooling strategy.
    #[must_use]
    pub fn pooling(&self) -> PoolingStrategy {
        self.encoder.pooling
    }
}

impl Encoder {
    fn hidden_states(&self, text: &str) -> Result<Vec<f32>, OrtError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| OrtError::Tokenization(e.to_string()))?;

        let seq_len = encoding.get_ids().len();
        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| i64::from(id)).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| i64::from(m))
            .collect();

        let input_ids = Tensor::from_array(([1, seq_len], input_ids.into_boxed_slice()))?;
        let attention_mask = Tensor::from_array(([1, seq_len], attention_mask.into_boxed_slice()))?;

        let hidden_states = {
            let mut session = lock(&self.session)?;
            let outputs = session.run(ort::inputs![
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
            ])?;
            let value = HIDDEN_STATE_OUTPUTS
                .iter()
                .find_map(|name| outputs.get(*name))
                .ok_or(OrtError::MissingOutput(HIDDEN_STATE_OUTPUTS[0]))?;
            value.try_extract_array::<f32>()?.to_owned()
        };

        let rank = hidden_states.ndim();
        let hidden_states = hidden_states
            .into_dimensionality::<Ix3>()
            .map_err(|_| OrtError::UnexpectedRank {
                expected: 3,
                actual: rank,
            })?;

        let mut embedding = self.pooling.apply(
            hidden_states.index_axis(ndarray::Axis(0), 0),
            encoding.get_attention_mask(),
        );
        if self.normalize {
            l2_normalize(&mut embedding);
        }
        Ok(embedding)
    }
}

impl EmbeddingModel for OrtEmbedding {
    fn dim(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> casebrief_core::Result<Vec<f32>> {
        let encoder = Arc::clone(&self.encoder);
        let text = text.to_owned();
        Ok(blocking::unblock(move || encoder.hidden_states(&text)).await?)
    }
}

/// Builder for [`OrtEmbedding`].
#[derive(Debug)]
pub struct OrtEmbeddingBuilder {
    model_path: Option<PathBuf>,
    tokenizer_path: Option<PathBuf>,
    pooling: PoolingStrategy,
    normalize: bool,
    max_tokens: usize,
}

impl Default for OrtEmbeddingBuilder {
    fn default() -> Self {
        Self {
            model_path: None,
            tokenizer_path: None,
            pooling: PoolingStrategy::default(),
            normalize: true,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl OrtEmbeddingBuilder {
    /// Set the path to the ONNX model file.
    #[must_use]
    pub fn model_path(mut self, path: impl AsRef<Path>) -> Self {
        self.model_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the path to the tokenizer.json file.
    ///
    /// Defaults to `tokenizer.json` beside the model.
    #[must_use]
    pub fn tokenizer_path(mut self, path: impl AsRef<Path>) -> Self {
        self.tokenizer_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the pooling strategy. Default: [`PoolingStrategy::Mean`].
    #[must_use]
    pub const fn pooling(mut self, strategy: PoolingStrategy) -> Self {
        self.pooling = strategy;
        self
    }

    /// Enable or disable L2 normalization. Default: `true`.
    #[must_use]
    pub const fn normalize(mut self, enabled: bool) -> Self {
        self.normalize = enabled;
        self
    }

    /// Tokens kept per input; the rest is cut off. Default: [`DEFAULT_MAX_TOKENS`].
    #[must_use]
    pub const fn max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }

    /// Build the [`OrtEmbedding`] instance.
    ///
    /// # Errors
    /// Returns an error if the model path is missing, either file cannot be loaded, or the
    /// embedding dimension cannot be read from the model outputs.
    pub fn build(self) -> Result<OrtEmbedding, OrtError> {
        let model_path = self.model_path.ok_or(OrtError::MissingModelPath)?;
        if !model_path.is_file() {
            return Err(OrtError::ModelNotFound(model_path));
        }
        let tokenizer_path = match self.tokenizer_path {
            Some(path) => path,
            None => locate_tokenizer(model_path.parent().unwrap_or(&model_path))?,
        };

        let mut tokenizer = load_tokenizer(&tokenizer_path)?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: self.max_tokens,
                ..TruncationParams::default()
            }))
            .map_err(|e| OrtError::tokenizer(&tokenizer_path, e))?;

        let session = load_session(&model_path)?;
        let dimension = detect_embedding_dimension(&session)?;
        tracing::info!(
            model = %model_path.display(),
            dimension,
            pooling = ?self.pooling,
            "loaded embedding model"
        );

        Ok(OrtEmbedding {
            encoder: Arc::new(Encoder {
                session: Mutex::new(session),
                tokenizer,
                pooling: self.pooling,
                normalize: self.normalize,
            }),
            dimension,
        })
    }
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Reads the hidden size from the last axis of the first tensor output of rank 2 or more.
fn detect_embedding_dimension(session: &Session) -> Result<usize, OrtError> {
    session
        .outputs()
        .iter()
        .find_map(|output| match output.dtype() {
            ort::value::ValueType::Tensor { shape, .. } if shape.len() >= 2 => {
                shape.last().copied().filter(|&dim| dim > 0)
            }
            _ => None,
        })
        .and_then(|dim| usize::try_from(dim).ok())
        .ok_or(OrtError::UnknownDimension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_model_path() {
        let result = OrtEmbeddingBuilder::default().build();
        assert!(matches!(result, Err(OrtError::MissingModelPath)));
    }

    #[test]
    fn builder_validates_model_exists() {
        let result = OrtEmbedding::builder()
            .model_path("/nonexistent/model.onnx")
            .tokenizer_path("/nonexistent/tokenizer.json")
            .build();
        assert!(matches!(result, Err(OrtError::ModelNotFound(_))));
    }

    #[test]
    fn empty_directory_has_no_model() {
        let result = OrtEmbedding::from_directory("/nonexistent/all-mpnet-base-v2");
        assert!(matches!(result, Err(OrtError::ModelNotFound(_))));
    }

    #[test]
    fn normalizes_to_unit_length() {
        let mut vector = vec![3.0, 4.0];
        l2_normalize(&mut vector);
        assert!((vector[0] - 0.6).abs() < 1e-6);
        assert!((vector[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_stays_zero() {
        let mut vector = vec![0.0, 0.0];
        l2_normalize(&mut vector);
        assert_eq!(vector, vec![0.0, 0.0]);
    }

    #[test]
    fn builder_defaults_match_sentence_transformers() {
        let builder = OrtEmbeddingBuilder::default();
        assert!(builder.normalize);
        assert_eq!(builder.pooling, PoolingStrategy::Mean);
        assert_eq!(builder.max_tokens, DEFAULT_MAX_TOKENS);
    }
}
