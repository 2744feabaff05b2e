//! Presentation of query results.

use std::fmt::Write;

use casebrief_rag::{SummaryRecord, SummaryResult};

/// Human-readable blocks, one per retrieved case.
#[must_use]
pub fn text(results: &[SummaryResult]) -> String {
    let mut out = String::new();
    for entry in results {
        let _ = writeln!(
            out,
            "Case {} (document {}, distance {:.4})",
            entry.rank, entry.document.id, entry.distance
        );
        let _ = writeln!(out, "Original text: {}", entry.document.text);
        match &entry.summary {
            Ok(summary) if summary.input_truncated => {
                let _ = writeln!(out, "Summary (of truncated text): {}", summary.text);
            }
            Ok(summary) => {
                let _ = writeln!(out, "Summary: {}", summary.text);
            }
            Err(err) => {
                let _ = writeln!(out, "Summary unavailable: {err}");
            }
        }
        out.push('\n');
    }
    out
}

/// A pretty-printed JSON array of [`SummaryRecord`]s.
///
/// # Errors
/// Only if serialization fails.
pub fn json(results: &[SummaryResult]) -> serde_json::Result<String> {
    let records: Vec<SummaryRecord> = results.iter().map(SummaryResult::to_record).collect();
    serde_json::to_string_pretty(&records)
}
