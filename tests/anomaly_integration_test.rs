//! Integration tests for the anomaly detector
//!
//! Tests the rule-based single-evaluation path and the batch clustering
//! path, including model persistence.

mod common;

use common::{full_evaluation, ratings};
use evalsense_core::config::{AnomalyConfig, BatchConfig};
use evalsense_core::{AnomalyDetector, AnomalyResult, BatchAnomalyModel, EvalSenseError, RatingMap, RawRatings};
use tempfile::TempDir;

#[test]
fn test_all_maximum_ratings() {
    let detector = AnomalyDetector::default();
    let result = detector.detect_anomaly(&ratings(&[
        ("q1", 4),
        ("q2", 4),
        ("q3", 4),
        ("q4", 4),
        ("q5", 4),
        ("q6", 4),
    ]));

    assert!(result.is_anomaly);
    assert_eq!(result.anomaly_score, 0.95);
    assert!(result.reason.contains("maximum"));
    assert!(result.reason.contains('4'));
}

#[test]
fn test_alternating_ratings() {
    let detector = AnomalyDetector::default();
    let result = detector.detect_anomaly(&ratings(&[
        ("q1", 4),
        ("q2", 1),
        ("q3", 4),
        ("q4", 1),
        ("q5", 4),
        ("q6", 1),
    ]));

    assert!(result.is_anomaly);
    assert!((result.anomaly_score - 0.85).abs() < 1e-9);
    assert!(result.reason.to_lowercase().contains("alternating"));
}

#[test]
fn test_category_inconsistency_with_tuned_threshold() {
    let config = AnomalyConfig {
        category_variance_threshold: 0.5,
        ..AnomalyConfig::default()
    };
    let detector = AnomalyDetector::new(config, BatchConfig::default());
    let result = detector.detect_anomaly(&ratings(&[
        ("relevance_a", 4),
        ("relevance_b", 3),
        ("teaching_a", 2),
        ("teaching_b", 2),
        ("assessment_a", 4),
    ]));

    assert!(result.is_anomaly);
    assert!((result.anomaly_score - 0.75).abs() < 1e-9);
    assert!(result.reason.contains("categories"));
}

#[test]
fn test_same_ratings_under_default_threshold_are_normal() {
    // Category means 3.5 / 2.0 / 4.0 have variance of about 0.72
    let result = AnomalyDetector::default().detect_anomaly(&ratings(&[
        ("relevance_a", 4),
        ("relevance_b", 3),
        ("teaching_a", 2),
        ("teaching_b", 2),
        ("assessment_a", 4),
    ]));
    assert_eq!(result, AnomalyResult::normal());
}

#[test]
fn test_category_inconsistency_default_threshold() {
    let result = AnomalyDetector::default().detect_anomaly(&ratings(&[
        ("relevance_a", 1),
        ("relevance_b", 1),
        ("teaching_a", 4),
        ("teaching_b", 4),
    ]));

    assert!(result.is_anomaly);
    assert_eq!(result.anomaly_score, 0.75);
    assert!(result.reason.contains("2.25"));
}

#[test]
fn test_question_bank_evaluation() {
    let detector = AnomalyDetector::default();
    let varied = full_evaluation(|i| [3, 3, 4, 4, 3, 3, 2, 3][i % 8]);
    assert!(!detector.detect_anomaly(&varied).is_anomaly);

    let straight = full_evaluation(|_| 3);
    let result = detector.detect_anomaly(&straight);
    assert_eq!(result.anomaly_score, 1.0);
    assert!(result.reason.contains("straight-lining"));
}

#[test]
fn test_empty_map() {
    let result = AnomalyDetector::default().detect_anomaly(&RatingMap::default());
    assert!(!result.is_anomaly);
    assert_eq!(result.anomaly_score, 0.0);
    assert_eq!(result.reason, "No features to analyze");
}

#[test]
fn test_detect_batch_isolates_failures() {
    let items = vec![
        RawRatings::from_iter([("q1", 4), ("q2", 1), ("q3", 4), ("q4", 1)]),
        RawRatings::from_iter([("q1", 7)]),
        RawRatings::from_iter([("q1", 2), ("q1", 3)]),
        RawRatings::from_iter([("q1", 2), ("q2", 2), ("q3", 3)]),
    ];
    let results = AnomalyDetector::default().detect_batch(&items);

    assert_eq!(results.len(), 4);
    assert!(results[0].is_anomaly);
    assert!(results[1].reason.starts_with("Error: "));
    assert!(results[2].reason.starts_with("Error: "));
    assert_eq!(results[3], AnomalyResult::normal());
}

fn cohort() -> Vec<RatingMap> {
    let mut items = Vec::new();
    for _ in 0..10 {
        items.push(full_evaluation(|i| [3, 4, 3, 2][i % 4]));
    }
    for _ in 0..10 {
        items.push(full_evaluation(|i| [2, 3, 3, 2][i % 4]));
    }
    items.push(full_evaluation(|i| if i % 2 == 0 { 1 } else { 4 }));
    items
}

#[test]
fn test_fit_batch_finds_clusters_and_outlier() {
    let detector = AnomalyDetector::default();
    let (model, report) = detector.fit_batch(&cohort()).unwrap();

    assert_eq!(report.n_clusters, 2);
    assert_eq!(report.n_outliers, 1);
    assert!((report.outlier_rate - 1.0 / 21.0).abs() < 1e-12);
    assert_eq!(report.labels[20], -1);
    assert_eq!(model.n_core_samples(), 20);
}

#[test]
fn test_batch_model_outlier_check() {
    let (model, _) = AnomalyDetector::default().fit_batch(&cohort()).unwrap();

    assert!(!model.is_outlier(&full_evaluation(|i| [3, 4, 3, 2][i % 4])));
    assert!(model.is_outlier(&full_evaluation(|i| if i % 2 == 0 { 1 } else { 4 })));
    assert!(model.is_outlier(&RatingMap::default()));
}

#[test]
fn test_fit_empty_batch_fails() {
    let err = AnomalyDetector::default().fit_batch(&[]).unwrap_err();
    assert!(matches!(err, EvalSenseError::EmptyBatch(_)));
}

#[test]
fn test_batch_model_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("anomaly.evs");

    let (model, _) = AnomalyDetector::default().fit_batch(&cohort()).unwrap();
    model.save(&path).expect("Failed to save batch model");
    let loaded = BatchAnomalyModel::load(&path).expect("Failed to load batch model");

    assert_eq!(loaded, model);
    assert_eq!(loaded.eps(), 0.5);
    assert_eq!(loaded.min_samples(), 5);
    assert_eq!(loaded.scaler().mean, model.scaler().mean);
    assert_eq!(loaded.scaler().scale, model.scaler().scale);
}

#[test]
fn test_batch_model_wrong_kind() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("sentiment.evs");
    common::trained_analyzer().save(&path).unwrap();

    let err = BatchAnomalyModel::load(&path).unwrap_err();
    assert!(matches!(err, EvalSenseError::IncompatibleArtifact(_)));
}
