//! Rating-pattern anomaly detection.
//!
//! [`AnomalyDetector::detect_anomaly`] is the stateless per-evaluation path
//! driven by the rule table in [`super::rules`]. [`AnomalyDetector::fit_batch`]
//! clusters a cohort of evaluations with DBSCAN and returns a
//! [`BatchAnomalyModel`] that can later test a single evaluation against
//! the cohort.
//!
//! # Batch feature layout
//!
//! Each row is the fixed summary block of [`RatingFeatures`] followed by
//! one raw-value column per question id in the sorted union of ids across
//! the batch. An evaluation that did not answer a question gets its own
//! mean rating in that column.

use super::dbscan::{dbscan, euclidean};
use super::rules::{evaluate, RuleContext};
use crate::artifact::{fingerprint_bytes, read_artifact, verify_fingerprint, write_artifact, ArtifactKind};
use crate::config::{AnomalyConfig, BatchConfig, ScoringConfig};
use crate::error::{EvalSenseError, Result};
use crate::features::ratings::category_means;
use crate::features::{RatingFeatures, StandardScaler};
use crate::types::{AnomalyResult, RatingMap, RatingScale, RawRatings};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Summary of one batch clustering run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub n_clusters: usize,
    pub n_outliers: usize,
    pub outlier_rate: f64,
    /// Cluster id per non-empty input evaluation in input order, `-1` for outliers
    pub labels: Vec<i32>,
}

/// Fitted cohort model.
///
/// Holds everything needed to place a new evaluation in the cohort's
/// standardized feature space. Immutable once fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAnomalyModel {
    scaler: StandardScaler,
    question_layout: Vec<String>,
    scale: RatingScale,
    eps: f64,
    min_samples: usize,
    core_samples: Array2<f64>,
}

impl BatchAnomalyModel {
    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn question_layout(&self) -> &[String] {
        &self.question_layout
    }

    pub fn n_core_samples(&self) -> usize {
        self.core_samples.nrows()
    }

    /// SHA-256 over the question layout and feature dimension
    pub fn fingerprint(&self) -> String {
        let mut bytes = format!("dim={};scale={}-{};", self.scaler.n_features(), self.scale.min, self.scale.max)
            .into_bytes();
        for id in &self.question_layout {
            bytes.extend_from_slice(id.as_bytes());
            bytes.push(0);
        }
        fingerprint_bytes(&bytes)
    }

    /// True when the evaluation lies farther than `eps` from every core sample.
    ///
    /// Question ids outside the fitted layout are ignored; an empty map is
    /// always an outlier.
    pub fn is_outlier(&self, ratings: &RatingMap) -> bool {
        let Some(row) = feature_row(ratings, &self.scale, &self.question_layout) else {
            return true;
        };
        let scaled = self.scaler.transform_row(row.view());
        let outlier = !self
            .core_samples
            .axis_iter(Axis(0))
            .any(|core| euclidean(core, scaled.view()) <= self.eps);
        debug!("Batch outlier check: {}", outlier);
        outlier
    }

    /// Persist, atomically replacing anything at `path`
    pub fn save(&self, path: &Path) -> Result<PathBuf> {
        write_artifact(path, ArtifactKind::BatchAnomaly, &self.fingerprint(), self)?;
        Ok(path.to_path_buf())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let (header, model): (_, BatchAnomalyModel) = read_artifact(path, ArtifactKind::BatchAnomaly)?;
        verify_fingerprint(&header, &model.fingerprint())?;
        info!(
            "Loaded batch anomaly model: {} features, {} core samples",
            model.scaler.n_features(),
            model.n_core_samples()
        );
        Ok(model)
    }
}

/// One batch row: summary features, then raw values aligned to `layout`
fn feature_row(ratings: &RatingMap, scale: &RatingScale, layout: &[String]) -> Option<Array1<f64>> {
    let features = RatingFeatures::extract(ratings, scale)?;
    let mut row = features.summary_vector();
    row.extend(layout.iter().map(|id| match ratings.get(id) {
        Some(v) => v as f64,
        None => features.mean,
    }));
    Some(Array1::from(row))
}

/// Stateless rule path plus batch fitting
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    rules: AnomalyConfig,
    batch: BatchConfig,
}

impl AnomalyDetector {
    pub fn new(rules: AnomalyConfig, batch: BatchConfig) -> Self {
        Self { rules, batch }
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self::new(config.anomaly.clone(), config.batch.clone())
    }

    pub fn scale(&self) -> RatingScale {
        self.rules.scale()
    }

    /// Scan one evaluation. Never fails: an empty map reports
    /// "No features to analyze".
    pub fn detect_anomaly(&self, ratings: &RatingMap) -> AnomalyResult {
        let scale = self.scale();
        let Some(features) = RatingFeatures::extract(ratings, &scale) else {
            return AnomalyResult::no_features();
        };
        let means = category_means(ratings);
        let result = evaluate(&RuleContext {
            features: &features,
            category_means: &means,
            config: &self.rules,
        });
        debug!(
            "Anomaly scan of {} ratings: anomaly={} score={}",
            ratings.len(),
            result.is_anomaly,
            result.anomaly_score
        );
        result
    }

    /// Validate then scan unvalidated input
    pub fn detect_raw(&self, raw: &RawRatings) -> Result<AnomalyResult> {
        let ratings = RatingMap::from_raw(raw, &self.scale())?;
        Ok(self.detect_anomaly(&ratings))
    }

    /// Scan many evaluations, order preserved. A record that fails
    /// validation becomes an `"Error: ..."` result; the batch continues.
    pub fn detect_batch(&self, items: &[RawRatings]) -> Vec<AnomalyResult> {
        items
            .iter()
            .enumerate()
            .map(|(i, raw)| match self.detect_raw(raw) {
                Ok(result) => result,
                Err(e) => {
                    warn!("Anomaly scan failed for item {}: {}", i, e);
                    AnomalyResult::error(e)
                }
            })
            .collect()
    }

    /// Standardize the cohort's features and cluster them
    pub fn fit_batch(&self, items: &[RatingMap]) -> Result<(BatchAnomalyModel, BatchReport)> {
        let scale = self.scale();
        let usable: Vec<&RatingMap> = items.iter().filter(|r| !r.is_empty()).collect();
        if usable.is_empty() {
            return Err(EvalSenseError::EmptyBatch(
                "batch clustering needs at least one non-empty evaluation".to_string(),
            ));
        }
        if usable.len() < items.len() {
            warn!("Skipping {} empty evaluations in batch", items.len() - usable.len());
        }

        let question_layout: Vec<String> = usable
            .iter()
            .flat_map(|r| r.iter().map(|rating| rating.question_id.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let rows: Vec<Array1<f64>> = usable
            .iter()
            .filter_map(|r| feature_row(r, &scale, &question_layout))
            .collect();
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Array2::zeros((rows.len(), dim));
        for (mut target, row) in data.axis_iter_mut(Axis(0)).zip(&rows) {
            target.assign(row);
        }

        let scaler = StandardScaler::fit(&data)?;
        let scaled = scaler.transform(&data);
        let clustering = dbscan(&scaled, self.batch.eps, self.batch.min_samples);
        let core_samples = scaled.select(Axis(0), &clustering.core_indices);

        let n_outliers = clustering.n_noise();
        let report = BatchReport {
            n_clusters: clustering.n_clusters,
            n_outliers,
            outlier_rate: n_outliers as f64 / rows.len() as f64,
            labels: clustering.labels,
        };
        info!(
            "Batch clustering: {} evaluations, {} clusters, {} outliers ({:.1}%)",
            rows.len(),
            report.n_clusters,
            report.n_outliers,
            report.outlier_rate * 100.0
        );

        let model = BatchAnomalyModel {
            scaler,
            question_layout,
            scale,
            eps: self.batch.eps,
            min_samples: self.batch.min_samples,
            core_samples,
        };
        Ok((model, report))
    }
}
