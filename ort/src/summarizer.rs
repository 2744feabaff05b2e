//! Abstractive summarization with a T5-style encoder-decoder export.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use casebrief_core::{Summarizer, SummaryLength};
use ndarray::{Ix3, s};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use crate::files::{load_session, load_tokenizer, locate, locate_tokenizer, lock};
use crate::{BeamSearch, OrtError};

/// Longest tokenized input the encoder accepts by default.
pub const DEFAULT_MAX_INPUT_TOKENS: usize = 512;

/// Task prefix T5 checkpoints were fine-tuned with.
pub const DEFAULT_PREFIX: &str = "summarize: ";

/// Summarizer running separate encoder and decoder ONNX sessions.
///
/// The expected layout is the one produced by `optimum-cli export onnx` for `t5-small` and its
/// relatives: `encoder_model.onnx`, `decoder_model.onnx` and `tokenizer.json`. Decoding uses
/// [`BeamSearch`] with the lengths passed to [`Summarizer::summarize`], on the `blocking` thread
/// pool.
///
/// ```rust,no_run
/// use casebrief_ort::OrtSummarizer;
///
/// let summarizer = OrtSummarizer::from_directory("./models/t5-small")?;
/// # Ok::<(), casebrief_ort::OrtError>(())
/// ```
pub struct OrtSummarizer {
    model: Arc<Seq2Seq>,
}

struct Seq2Seq {
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    tokenizer: Tokenizer,
    prefix: String,
    max_input_tokens: usize,
    search: BeamSearch,
}

impl std::fmt::Debug for OrtSummarizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtSummarizer")
            .field("prefix", &self.model.prefix)
            .field("max_input_tokens", &self.model.max_input_tokens)
            .field("search", &self.model.search)
            .finish_non_exhaustive()
    }
}

impl OrtSummarizer {
    /// Loads an exported model directory with default settings.
    ///
    /// # Errors
    /// Returns an error if a model file or the tokenizer cannot be found or loaded.
    pub fn from_directory(path: impl AsRef<Path>) -> Result<Self, OrtError> {
        Self::builder().directory(path).build()
    }

    /// Create a builder for custom configuration.
    #[must_use]
    pub fn builder() -> OrtSummarizerBuilder {
        OrtSummarizerBuilder::default()
    }
}

impl Seq2Seq {
    fn generate(&self, text: &str, length: SummaryLength) -> Result<String, OrtError> {
        let input = format!("{}{text}", self.prefix);
        let encoding = self
            .tokenizer
            .encode(input, true)
            .map_err(|e| OrtError::Tokenization(e.to_string()))?;
        let source_len = encoding.get_ids().len();
        if source_len > self.max_input_tokens {
            return Err(OrtError::InputTooLong {
                tokens: source_len,
                limit: self.max_input_tokens,
            });
        }

        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| i64::from(m))
            .collect();
        let (hidden_size, hidden_states) = self.encode(encoding.get_ids(), &attention_mask)?;

        let mut decoder = lock(&self.decoder)?;
        let search = self.search.with_lengths(length.max_length, length.min_length);
        let tokens = search.search(|sequences| {
            decode_step(
                &mut decoder,
                sequences,
                &attention_mask,
                &hidden_states,
                hidden_size,
            )
        })?;
        drop(decoder);

        tracing::debug!(
            input_tokens = source_len,
            output_tokens = tokens.len(),
            "generated summary"
        );
        let summary = self
            .tokenizer
            .decode(&tokens, true)
            .map_err(|e| OrtError::Tokenization(e.to_string()))?;
        Ok(summary.trim().to_string())
    }

    /// Runs the encoder once, returning the hidden size and the flattened `[1, len, hidden]`
    /// states.
    fn encode(&self, ids: &[u32], attention_mask: &[i64]) -> Result<(usize, Vec<f32>), OrtError> {
        let seq_len = ids.len();
        let input_ids: Vec<i64> = ids.iter().map(|&id| i64::from(id)).collect();
        let input_ids = Tensor::from_array(([1, seq_len], input_ids.into_boxed_slice()))?;
        let mask = Tensor::from_array(([1, seq_len], attention_mask.to_vec().into_boxed_slice()))?;

        let mut encoder = lock(&self.encoder)?;
        let outputs = encoder.run(ort::inputs![
            "input_ids" => input_ids,
            "attention_mask" => mask,
        ])?;
        let value = outputs
            .get("last_hidden_state")
            .ok_or(OrtError::MissingOutput("last_hidden_state"))?;
        let array = value.try_extract_array::<f32>()?;
        let rank = array.ndim();
        let array = array
            .into_dimensionality::<Ix3>()
            .map_err(|_| OrtError::UnexpectedRank {
                expected: 3,
                actual: rank,
            })?;
        Ok((array.dim().2, array.iter().copied().collect()))
    }
}

/// One decoder pass over every live beam, batched. Returns the logits of each beam's last
/// position.
fn decode_step(
    decoder: &mut Session,
    sequences: &[Vec<u32>],
    attention_mask: &[i64],
    hidden_states: &[f32],
    hidden_size: usize,
) -> Result<Vec<Vec<f32>>, OrtError> {
    let beams = sequences.len();
    let target_len = sequences.first().map_or(0, Vec::len);
    let source_len = attention_mask.len();

    let input_ids: Vec<i64> = sequences
        .iter()
        .flat_map(|sequence| sequence.iter().map(|&id| i64::from(id)))
        .collect();
    let masks: Vec<i64> = attention_mask.repeat(beams);
    let states: Vec<f32> = hidden_states.repeat(beams);

    let outputs = decoder.run(ort::inputs![
        "input_ids" => Tensor::from_array(([beams, target_len], input_ids.into_boxed_slice()))?,
        "encoder_attention_mask" => Tensor::from_array(([beams, source_len], masks.into_boxed_slice()))?,
        "encoder_hidden_states" => Tensor::from_array(([beams, source_len, hidden_size], states.into_boxed_slice()))?,
    ])?;
    let value = outputs
        .get("logits")
        .ok_or(OrtError::MissingOutput("logits"))?;
    let logits = value.try_extract_array::<f32>()?;
    let rank = logits.ndim();
    let logits = logits
        .into_dimensionality::<Ix3>()
        .map_err(|_| OrtError::UnexpectedRank {
            expected: 3,
            actual: rank,
        })?;
    let last = logits.dim().1.saturating_sub(1);
    Ok((0..beams)
        .map(|beam| logits.slice(s![beam, last, ..]).to_vec())
        .collect())
}

impl Summarizer for OrtSummarizer {
    async fn summarize(&self, text: &str, length: SummaryLength) -> casebrief_core::Result {
        let model = Arc::clone(&self.model);
        let text = text.to_owned();
        Ok(blocking::unblock(move || model.generate(&text, length)).await?)
    }
}

/// Builder for [`OrtSummarizer`].
#[derive(Debug)]
pub struct OrtSummarizerBuilder {
    directory: Option<PathBuf>,
    encoder_path: Option<PathBuf>,
    decoder_path: Option<PathBuf>,
    tokenizer_path: Option<PathBuf>,
    prefix: String,
    max_input_tokens: usize,
    search: BeamSearch,
}

impl Default for OrtSummarizerBuilder {
    fn default() -> Self {
        Self {
            directory: None,
            encoder_path: None,
            decoder_path: None,
            tokenizer_path: None,
            prefix: DEFAULT_PREFIX.to_string(),
            max_input_tokens: DEFAULT_MAX_INPUT_TOKENS,
            search: BeamSearch::default(),
        }
    }
}

impl OrtSummarizerBuilder {
    /// Directory holding the exported files. Explicit paths take precedence.
    #[must_use]
    pub fn directory(mut self, path: impl AsRef<Path>) -> Self {
        self.directory = Some(path.as_ref().to_path_buf());
        self
    }

    /// Path to the encoder ONNX file.
    #[must_use]
    pub fn encoder_path(mut self, path: impl AsRef<Path>) -> Self {
        self.encoder_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Path to the decoder ONNX file.
    #[must_use]
    pub fn decoder_path(mut self, path: impl AsRef<Path>) -> Self {
        self.decoder_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Path to tokenizer.json.
    #[must_use]
    pub fn tokenizer_path(mut self, path: impl AsRef<Path>) -> Self {
        self.tokenizer_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Text prepended to every input. Default: [`DEFAULT_PREFIX`].
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Inputs tokenizing to more than this fail with [`OrtError::InputTooLong`].
    #[must_use]
    pub const fn max_input_tokens(mut self, tokens: usize) -> Self {
        self.max_input_tokens = tokens;
        self
    }

    /// Beam search settings. The lengths are overridden on every call.
    #[must_use]
    pub const fn beam_search(mut self, search: BeamSearch) -> Self {
        self.search = search;
        self
    }

    /// Build the [`OrtSummarizer`] instance.
    ///
    /// # Errors
    /// Returns an error if no location was given, or a file cannot be found or loaded.
    pub fn build(self) -> Result<OrtSummarizer, OrtError> {
        let directory = self.directory.as_deref();
        let resolve = |explicit: Option<PathBuf>, name: &str| -> Result<PathBuf, OrtError> {
            if let Some(path) = explicit {
                return Ok(path);
            }
            let dir = directory.ok_or(OrtError::MissingModelPath)?;
            locate(dir, &[name]).ok_or_else(|| OrtError::ModelNotFound(dir.join(name)))
        };
        let encoder_path = resolve(self.encoder_path, "encoder_model.onnx")?;
        let decoder_path = resolve(self.decoder_path, "decoder_model.onnx")?;
        let tokenizer_path = match (self.tokenizer_path, directory) {
            (Some(path), _) => path,
            (None, Some(dir)) => locate_tokenizer(dir)?,
            (None, None) => {
                locate_tokenizer(encoder_path.parent().unwrap_or(&encoder_path))?
            }
        };

        let mut tokenizer = load_tokenizer(&tokenizer_path)?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(None)
            .map_err(|e| OrtError::tokenizer(&tokenizer_path, e))?;

        let encoder = load_session(&encoder_path)?;
        let decoder = load_session(&decoder_path)?;
        tracing::info!(
            encoder = %encoder_path.display(),
            decoder = %decoder_path.display(),
            num_beams = self.search.num_beams,
            "loaded summarization model"
        );

        Ok(OrtSummarizer {
            model: Arc::new(Seq2Seq {
                encoder: Mutex::new(encoder),
                decoder: Mutex::new(decoder),
                tokenizer,
                prefix: self.prefix,
                max_input_tokens: self.max_input_tokens,
                search: self.search,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_needs_a_location() {
        let result = OrtSummarizer::builder().build();
        assert!(matches!(result, Err(OrtError::MissingModelPath)));
    }

    #[test]
    fn missing_encoder_is_reported() {
        let result = OrtSummarizer::from_directory("/nonexistent/t5-small");
        match result {
            Err(OrtError::ModelNotFound(path)) => assert!(path.ends_with("encoder_model.onnx")),
            other => panic!("expected ModelNotFound, got {other:?}"),
        }
    }

    #[test]
    fn builder_defaults_match_t5() {
        let builder = OrtSummarizerBuilder::default();
        assert_eq!(builder.prefix, "summarize: ");
        assert_eq!(builder.max_input_tokens, 512);
        assert_eq!(builder.search.num_beams, 4);
        assert!(builder.search.early_stopping);
    }
}
