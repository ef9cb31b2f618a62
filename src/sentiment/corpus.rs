//! Labeled training corpus loading
//!
//! Accepts either a JSON array of `{"text": ..., "label": ...}` objects or
//! the same objects one per line (JSON lines). Blank lines are skipped.

use crate::error::{EvalSenseError, Result};
use crate::types::SentimentLabel;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One training example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledText {
    pub text: String,
    pub label: SentimentLabel,
}

impl LabeledText {
    pub fn new(text: impl Into<String>, label: SentimentLabel) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// Parse a corpus from JSON or JSON-lines text
pub fn parse_corpus(content: &str) -> Result<Vec<LabeledText>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| {
                EvalSenseError::TrainingData(format!("corpus line {}: {}", n + 1, e))
            })
        })
        .collect()
}

/// Read and parse a corpus file
pub fn load_corpus(path: &Path) -> Result<Vec<LabeledText>> {
    let content = std::fs::read_to_string(path)?;
    let corpus = parse_corpus(&content)?;
    info!("Loaded {} labeled examples from {:?}", corpus.len(), path);
    Ok(corpus)
}
