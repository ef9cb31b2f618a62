//! Submission-time scoring: merges sentiment and anomaly results into the
//! record a caller persists alongside the evaluation.
//!
//! Enrichment never blocks a submission. Without a ready sentiment model the
//! sentiment fields stay `None`; invalid ratings produce an in-band
//! `"Error: ..."` anomaly reason.

use crate::anomaly::AnomalyDetector;
use crate::sentiment::SentimentAnalyzer;
use crate::types::{AnomalyResult, RawRatings, SentimentLabel, SentimentResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// One submitted evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub ratings: RawRatings,
    #[serde(default)]
    pub feedback: Option<String>,
}

/// Fields a caller stores for a scored evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEvaluation {
    pub sentiment: Option<SentimentLabel>,
    pub sentiment_score: Option<f64>,
    /// Calibrated probability of `sentiment`
    pub sentiment_confidence: Option<f64>,
    pub is_anomaly: bool,
    pub anomaly_score: f64,
    pub anomaly_reason: String,
}

impl ScoredEvaluation {
    fn from_parts(sentiment: Option<SentimentResult>, anomaly: AnomalyResult) -> Self {
        Self {
            sentiment: sentiment.as_ref().map(|s| s.label),
            sentiment_score: sentiment.as_ref().map(|s| s.score),
            sentiment_confidence: sentiment.as_ref().map(|s| {
                s.probabilities
                    .map(|p| p.get(s.label))
                    .unwrap_or(s.score)
            }),
            is_anomaly: anomaly.is_anomaly,
            anomaly_score: anomaly.anomaly_score,
            anomaly_reason: anomaly.reason,
        }
    }
}

/// Holds the shared read-only models; cheap to clone into worker threads
#[derive(Debug, Clone, Default)]
pub struct EvaluationScorer {
    sentiment: Option<Arc<SentimentAnalyzer>>,
    detector: AnomalyDetector,
}

impl EvaluationScorer {
    pub fn new(sentiment: Option<Arc<SentimentAnalyzer>>, detector: AnomalyDetector) -> Self {
        Self { sentiment, detector }
    }

    pub fn score(&self, submission: &Submission) -> ScoredEvaluation {
        let text = submission.feedback.as_deref().unwrap_or("");
        let sentiment = match &self.sentiment {
            Some(analyzer) => match analyzer.classify_sentiment(text) {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!("Skipping sentiment enrichment: {}", e);
                    None
                }
            },
            None => {
                warn!("Skipping sentiment enrichment: no sentiment model configured");
                None
            }
        };

        let anomaly = self
            .detector
            .detect_raw(&submission.ratings)
            .unwrap_or_else(|e| {
                warn!("Anomaly scan failed: {}", e);
                AnomalyResult::error(e)
            });

        ScoredEvaluation::from_parts(sentiment, anomaly)
    }

    pub fn score_batch(&self, submissions: &[Submission]) -> Vec<ScoredEvaluation> {
        submissions.iter().map(|s| self.score(s)).collect()
    }
}
