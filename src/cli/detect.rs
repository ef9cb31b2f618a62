//! `evalsense detect`: scan one rating map for suspicious patterns

use super::helpers::{print_json, read_input};
use anyhow::Context;
use evalsense_core::{AnomalyDetector, RawRatings, ScoringConfig};
use std::path::PathBuf;

pub fn handle(ratings: Option<String>, input: Option<PathBuf>, config: &ScoringConfig) -> anyhow::Result<()> {
    let content = match ratings {
        Some(inline) => inline,
        None => read_input(input.as_deref())?,
    };
    let raw: RawRatings = serde_json::from_str(&content).context("Ratings must be a JSON object of id to score")?;

    let detector = AnomalyDetector::from_config(config);
    let result = detector.detect_raw(&raw)?;
    print_json(&result)
}
