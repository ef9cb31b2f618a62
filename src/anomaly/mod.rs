//! Suspicious rating-pattern detection: an ordered rule table for single
//! evaluations and DBSCAN clustering for cohort-level outliers.

pub mod dbscan;
pub mod detector;
pub mod rules;

pub use detector::{AnomalyDetector, BatchAnomalyModel, BatchReport};
