//! `evalsense train`: fit a sentiment model from a labeled corpus

use super::helpers::{print_json, sentiment_model_path};
use anyhow::Context;
use evalsense_core::{load_corpus, ScoringConfig, SentimentAnalyzer};
use std::path::PathBuf;
use tracing::info;

pub fn handle(corpus: PathBuf, output: Option<PathBuf>, json: bool, config: &ScoringConfig) -> anyhow::Result<()> {
    let examples = load_corpus(&corpus).with_context(|| format!("Failed to load corpus {}", corpus.display()))?;

    let (analyzer, metrics) =
        SentimentAnalyzer::train(&examples, &config.sentiment).context("Failed to train sentiment model")?;

    let path = sentiment_model_path(output, config);
    analyzer
        .save(&path)
        .with_context(|| format!("Failed to save model to {}", path.display()))?;
    info!("Model written to {}", path.display());

    if json {
        return print_json(&metrics);
    }

    println!("Trained on {} examples, evaluated on {}", metrics.train_samples, metrics.test_samples);
    println!("Accuracy: {:.3}", metrics.accuracy);
    println!();
    println!("{}", metrics.report);
    println!();
    println!("Model saved to {}", path.display());
    Ok(())
}
