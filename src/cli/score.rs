//! `evalsense score`: full enrichment of submitted evaluations

use super::helpers::{parse_items, print_json, read_input, sentiment_model_path};
use evalsense_core::{AnomalyDetector, EvaluationScorer, ScoringConfig, SentimentAnalyzer, Submission};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Scores every submission; a missing sentiment model only drops the
/// sentiment fields
pub fn handle(input: Option<PathBuf>, model: Option<PathBuf>, config: &ScoringConfig) -> anyhow::Result<()> {
    let submissions: Vec<Submission> = parse_items(&read_input(input.as_deref())?)?;

    let path = sentiment_model_path(model, config);
    let analyzer = match SentimentAnalyzer::load(&path) {
        Ok(analyzer) => Some(Arc::new(analyzer)),
        Err(e) => {
            warn!("Scoring without sentiment: {}", e);
            None
        }
    };

    let scorer = EvaluationScorer::new(analyzer, AnomalyDetector::from_config(config));
    print_json(&scorer.score_batch(&submissions))
}
