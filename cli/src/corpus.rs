//! Loading documents from disk.
//!
//! Three layouts are understood, chosen by file extension:
//!
//! - `.json`: an array whose items are strings or objects carrying the text field
//! - `.jsonl`: one string or object per line
//! - anything else: plain text, one document per non-empty line

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value;

/// Layout of a corpus file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusFormat {
    /// A JSON array.
    Json,
    /// Newline-delimited JSON.
    JsonLines,
    /// One document per line.
    Lines,
}

impl CorpusFormat {
    /// Picks the format from the file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") => {
                Self::JsonLines
            }
            _ => Self::Lines,
        }
    }
}

/// Documents read from a corpus file.
#[derive(Debug)]
pub struct LoadedCorpus {
    /// Kept document texts, in file order.
    pub texts: Vec<String>,
    /// Non-blank documents found in the file, before the limit was applied.
    pub available: usize,
}

/// Reads at most `limit` documents from `path`.
///
/// # Errors
/// Fails if the file cannot be read or is not valid for its format.
pub async fn load(path: &Path, limit: usize, text_field: &str) -> Result<LoadedCorpus> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read corpus from {}", path.display()))?;
    let texts = parse(&contents, CorpusFormat::from_path(path), text_field)
        .with_context(|| format!("failed to parse corpus {}", path.display()))?;

    let available = texts.len();
    if available > limit {
        tracing::warn!(available, limit, "corpus holds more documents than the limit, keeping the first ones");
    }
    let texts = texts.into_iter().take(limit).collect();
    Ok(LoadedCorpus { texts, available })
}

/// Extracts document texts from `contents`, skipping blank ones.
///
/// # Errors
/// Fails on malformed JSON or items without a string `text_field`.
pub fn parse(contents: &str, format: CorpusFormat, text_field: &str) -> Result<Vec<String>> {
    let texts = match format {
        CorpusFormat::Lines => contents.lines().map(str::to_string).collect(),
        CorpusFormat::Json => {
            let Value::Array(items) = serde_json::from_str::<Value>(contents)? else {
                bail!("expected a JSON array of documents");
            };
            items
                .into_iter()
                .enumerate()
                .map(|(position, item)| text_of(item, text_field, position))
                .collect::<Result<Vec<_>>>()?
        }
        CorpusFormat::JsonLines => contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(line, raw)| {
                let item = serde_json::from_str(raw)
                    .with_context(|| format!("invalid JSON on line {}", line + 1))?;
                text_of(item, text_field, line)
            })
            .collect::<Result<Vec<_>>>()?,
    };

    Ok(texts
        .into_iter()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect())
}

fn text_of(item: Value, text_field: &str, position: usize) -> Result<String> {
    match item {
        Value::String(text) => Ok(text),
        Value::Object(mut fields) => match fields.remove(text_field) {
            Some(Value::String(text)) => Ok(text),
            _ => bail!("item {position} has no string field `{text_field}`"),
        },
        _ => bail!("item {position} is neither a string nor an object"),
    }
}
