//! Free-text sentiment classification.
//!
//! Training: stratified split, TF-IDF vectorization, one-vs-rest RBF SVM
//! with Platt-calibrated probabilities, held-out evaluation. Prediction is
//! a pure function of the loaded model and the input text.

pub mod analyzer;
pub mod corpus;
pub mod metrics;
pub mod split;
pub mod svm;

pub use analyzer::SentimentAnalyzer;
pub use corpus::{load_corpus, parse_corpus, LabeledText};
pub use metrics::{ClassificationReport, TrainingMetrics};
