//! evalsense - sentiment and rating-anomaly scoring for course evaluations
//!
//! Turns a submitted evaluation (Likert ratings plus free-text feedback)
//! into a sentiment label with a calibrated confidence and an anomaly flag
//! with a severity score and a human-readable reason.
//!
//! # Architecture
//!
//! - **features**: TF-IDF text vectors, rating statistics, standardization
//! - **sentiment**: RBF-kernel SVM classifier with Platt calibration
//! - **anomaly**: ordered rule table plus DBSCAN cohort clustering
//! - **artifact**: versioned, fingerprinted model files with atomic replace
//! - **scoring**: merges both components into one stored record
//!
//! Trained models are read-only after loading; share one behind an `Arc`
//! across worker threads.
//!
//! # Example
//!
//! ```ignore
//! use evalsense_core::{AnomalyDetector, RatingMap, RatingScale, SentimentAnalyzer};
//!
//! let analyzer = SentimentAnalyzer::load(&config.paths.sentiment_model())?;
//! let sentiment = analyzer.classify_sentiment("Clear explanations, great lecturer")?;
//!
//! let ratings = RatingMap::new([("teaching_1", 4), ("teaching_2", 3)], &RatingScale::default())?;
//! let anomaly = AnomalyDetector::default().detect_anomaly(&ratings);
//! ```

pub mod anomaly;
pub mod artifact;
pub mod config;
pub mod error;
pub mod features;
pub mod scoring;
pub mod sentiment;
pub mod types;

// Re-export commonly used types
pub use anomaly::{AnomalyDetector, BatchAnomalyModel, BatchReport};
pub use config::ScoringConfig;
pub use error::{EvalSenseError, Result};
pub use scoring::{EvaluationScorer, ScoredEvaluation, Submission};
pub use sentiment::{load_corpus, parse_corpus, LabeledText, SentimentAnalyzer, TrainingMetrics};
pub use types::{
    AnomalyResult, Category, ClassProbabilities, RatingMap, RatingScale, RawRatings, SentimentLabel,
    SentimentResult,
};
