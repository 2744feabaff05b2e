//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use casebrief_core::SummaryLength;
use casebrief_rag::{FailurePolicy, PipelineConfig};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};

/// Search a case corpus and summarize the closest matches.
#[derive(Parser, Debug)]
#[command(name = "casebrief", version, about)]
pub struct Args {
    /// Corpus file: `.json` array, `.jsonl`, or plain text with one document per line.
    #[arg(short, long, env = "CASEBRIEF_CORPUS")]
    pub corpus: PathBuf,

    /// Directory holding the sentence embedding model (`model.onnx`, `tokenizer.json`).
    #[arg(long, env = "CASEBRIEF_EMBEDDING_MODEL")]
    pub embedding_model: PathBuf,

    /// Directory holding the T5 export (`encoder_model.onnx`, `decoder_model.onnx`,
    /// `tokenizer.json`).
    #[arg(long, env = "CASEBRIEF_SUMMARIZER_MODEL")]
    pub summarizer_model: PathBuf,

    /// Run a single query and exit instead of starting the prompt.
    #[arg(short, long)]
    pub query: Option<String>,

    /// Number of similar cases to retrieve.
    #[arg(short = 'k', long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub top_k: u8,

    /// Maximum number of documents loaded from the corpus.
    #[arg(long, default_value_t = 100, value_parser = positive)]
    pub limit: usize,

    /// Object field holding the document text in JSON corpora.
    #[arg(long, default_value = "text")]
    pub text_field: String,

    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,

    /// Cut documents to this many words before summarizing.
    #[arg(long, value_name = "WORDS", value_parser = positive)]
    pub truncate_words: Option<usize>,

    /// Maximum summary length in tokens.
    #[arg(long, default_value_t = 150)]
    pub max_length: usize,

    /// Minimum summary length in tokens.
    #[arg(long, default_value_t = 40)]
    pub min_length: usize,

    /// Deadline for each embedding call, in seconds.
    #[arg(long, value_name = "SECS", value_parser = seconds)]
    pub embed_timeout: Option<Duration>,

    /// Deadline for each summarization call, in seconds.
    #[arg(long, value_name = "SECS", value_parser = seconds)]
    pub summarize_timeout: Option<Duration>,

    /// Summaries generated at once per query.
    #[arg(long, default_value_t = 1, value_parser = positive)]
    pub concurrency: usize,

    /// Fail the whole query when one summary fails.
    #[arg(long)]
    pub abort_on_error: bool,
}

impl Args {
    /// Checks the constraints that span several flags.
    ///
    /// # Errors
    /// Returns a usage error when `--min-length` exceeds `--max-length`.
    pub fn validate(&self) -> Result<(), clap::Error> {
        if self.min_length > self.max_length {
            return Err(Self::command().error(
                ErrorKind::ArgumentConflict,
                format!(
                    "--min-length {} is greater than --max-length {}",
                    self.min_length, self.max_length
                ),
            ));
        }
        Ok(())
    }

    /// Pipeline settings derived from the flags.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut builder = PipelineConfig::builder()
            .default_top_k(usize::from(self.top_k))
            .summary_length(SummaryLength::new(self.max_length, self.min_length))
            .summary_concurrency(self.concurrency);
        if let Some(timeout) = self.embed_timeout {
            builder = builder.embed_timeout(timeout);
        }
        if let Some(timeout) = self.summarize_timeout {
            builder = builder.summarize_timeout(timeout);
        }
        if let Some(words) = self.truncate_words {
            builder = builder.truncate_input_words(words);
        }
        if self.abort_on_error {
            builder = builder.failure_policy(FailurePolicy::AbortBatch);
        }
        builder.build()
    }
}

fn positive(value: &str) -> Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(err) => Err(err.to_string()),
    }
}

fn seconds(value: &str) -> Result<Duration, String> {
    let secs: f64 = value.parse().map_err(|err: std::num::ParseFloatError| err.to_string())?;
    if secs <= 0.0 {
        return Err("must be greater than zero".to_string());
    }
    Duration::try_from_secs_f64(secs).map_err(|err| err.to_string())
}
