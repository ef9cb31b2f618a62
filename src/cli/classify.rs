//! `evalsense classify`: label feedback text with a trained model

use super::helpers::{print_json, read_input, sentiment_model_path};
use anyhow::Context;
use evalsense_core::{ScoringConfig, SentimentAnalyzer};
use std::path::PathBuf;

/// Classify the given texts, or one text per stdin line when none are given
pub fn handle(texts: Vec<String>, model: Option<PathBuf>, config: &ScoringConfig) -> anyhow::Result<()> {
    let path = sentiment_model_path(model, config);
    let analyzer =
        SentimentAnalyzer::load(&path).with_context(|| format!("Failed to load model {}", path.display()))?;

    let texts = if texts.is_empty() {
        read_input(None)?.lines().map(str::to_string).collect()
    } else {
        texts
    };

    let results = analyzer.classify_batch(&texts)?;
    print_json(&results)
}
