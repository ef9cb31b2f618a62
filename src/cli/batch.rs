//! `evalsense batch`: rule scan plus cohort clustering over many rating maps

use super::helpers::{anomaly_model_path, parse_items, print_json, read_input};
use anyhow::Context;
use evalsense_core::{AnomalyDetector, AnomalyResult, BatchReport, RatingMap, RawRatings, ScoringConfig};
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

#[derive(Serialize)]
struct BatchOutput {
    results: Vec<AnomalyResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    clustering: Option<BatchReport>,
}

pub fn handle(
    input: Option<PathBuf>,
    cluster: bool,
    save_model: Option<Option<PathBuf>>,
    config: &ScoringConfig,
) -> anyhow::Result<()> {
    let items: Vec<RawRatings> = parse_items(&read_input(input.as_deref())?)?;
    let detector = AnomalyDetector::from_config(config);
    let results = detector.detect_batch(&items);

    let clustering = if cluster || save_model.is_some() {
        let scale = detector.scale();
        let maps: Vec<RatingMap> = items
            .iter()
            .enumerate()
            .filter_map(|(i, raw)| match RatingMap::from_raw(raw, &scale) {
                Ok(map) => Some(map),
                Err(e) => {
                    warn!("Excluding item {} from clustering: {}", i, e);
                    None
                }
            })
            .collect();

        let (model, report) = detector.fit_batch(&maps).context("Batch clustering failed")?;
        if let Some(requested) = save_model {
            let path = anomaly_model_path(requested, config);
            model
                .save(&path)
                .with_context(|| format!("Failed to save batch model to {}", path.display()))?;
        }
        Some(report)
    } else {
        None
    };

    print_json(&BatchOutput { results, clustering })
}
