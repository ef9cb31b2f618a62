//! Property tests for input handling and determinism

mod common;

use common::trained_analyzer;
use evalsense_core::{AnomalyDetector, RatingMap, RatingScale, SentimentAnalyzer, SentimentResult};
use once_cell::sync::Lazy;
use proptest::prelude::*;

static ANALYZER: Lazy<SentimentAnalyzer> = Lazy::new(trained_analyzer);

fn map_of(values: &[i64]) -> RatingMap {
    RatingMap::new(
        values.iter().enumerate().map(|(i, v)| (format!("q{}", i), *v)),
        &RatingScale::default(),
    )
    .unwrap()
}

proptest! {
    #[test]
    fn prop_whitespace_text_is_neutral(text in "[ \t\n\r]{0,20}") {
        prop_assert_eq!(ANALYZER.classify_sentiment(&text).unwrap(), SentimentResult::neutral_default());
    }

    #[test]
    fn prop_classification_is_deterministic(text in "[a-z ,.!]{1,60}") {
        let first = ANALYZER.classify_sentiment(&text).unwrap();
        let second = ANALYZER.classify_sentiment(&text).unwrap();
        prop_assert!(first.score >= 0.0 && first.score <= 1.0);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_interior_straight_lining(value in 2i64..=3, count in 2usize..32) {
        let result = AnomalyDetector::default().detect_anomaly(&map_of(&vec![value; count]));
        prop_assert!(result.is_anomaly);
        prop_assert_eq!(result.anomaly_score, 1.0);
    }

    #[test]
    fn prop_extreme_ratings(extreme in prop::sample::select(vec![1i64, 4]), count in 2usize..32) {
        let result = AnomalyDetector::default().detect_anomaly(&map_of(&vec![extreme; count]));
        prop_assert!(result.is_anomaly);
        prop_assert_eq!(result.anomaly_score, 0.95);
    }

    #[test]
    fn prop_detection_is_deterministic(values in prop::collection::vec(1i64..=4, 0..32)) {
        let detector = AnomalyDetector::default();
        let ratings = map_of(&values);
        let first = detector.detect_anomaly(&ratings);
        prop_assert_eq!(&first, &detector.detect_anomaly(&ratings));
        prop_assert!(first.anomaly_score >= 0.0 && first.anomaly_score <= 1.0);
        prop_assert_eq!(first.is_anomaly, first.anomaly_score > 0.0);
    }
}
