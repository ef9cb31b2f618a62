//! Shared read-only models used from many threads

mod common;

use common::{ratings, trained_analyzer};
use evalsense_core::{AnomalyDetector, EvaluationScorer, RawRatings, SentimentLabel, Submission};
use std::sync::Arc;
use std::thread;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_models_are_send_and_sync() {
    assert_send_sync::<evalsense_core::SentimentAnalyzer>();
    assert_send_sync::<AnomalyDetector>();
    assert_send_sync::<evalsense_core::BatchAnomalyModel>();
    assert_send_sync::<EvaluationScorer>();
}

#[test]
fn test_concurrent_classification_matches_sequential() {
    let analyzer = Arc::new(trained_analyzer());
    let texts = [
        "Excellent course! Clear explanations.",
        "Terrible, confusing, disorganized lectures.",
        "average workload",
        "",
    ];
    let expected: Vec<_> = texts.iter().map(|t| analyzer.classify_sentiment(t).unwrap()).collect();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let analyzer = Arc::clone(&analyzer);
            thread::spawn(move || {
                texts
                    .iter()
                    .map(|t| analyzer.classify_sentiment(t).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_concurrent_detection() {
    let detector = Arc::new(AnomalyDetector::default());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let detector = Arc::clone(&detector);
            thread::spawn(move || detector.detect_anomaly(&ratings(&[("q1", 4), ("q2", 4), ("q3", 4)])))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().anomaly_score, 0.95);
    }
}

#[test]
fn test_scorer_shared_across_workers() {
    let scorer = EvaluationScorer::new(Some(Arc::new(trained_analyzer())), AnomalyDetector::default());
    let submission = Submission {
        ratings: RawRatings::from_iter([("teaching_1", 3), ("teaching_2", 4), ("teaching_3", 4)]),
        feedback: Some("great instructor, helpful feedback".to_string()),
    };

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let scorer = scorer.clone();
            let submission = submission.clone();
            thread::spawn(move || scorer.score(&submission))
        })
        .collect();

    for handle in handles {
        let scored = handle.join().unwrap();
        assert_eq!(scored.sentiment, Some(SentimentLabel::Positive));
        assert_eq!(scored.sentiment_confidence, scored.sentiment_score);
        assert!(!scored.is_anomaly);
    }
}
