//! Core data types for the evalsense scoring pipeline
//!
//! This module defines the values that flow into and out of the two scoring
//! components: sentiment labels and results, anomaly results, and the rating
//! map with its question vocabulary.

use crate::error::{EvalSenseError, Result};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Sentiment of a piece of free-text feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    /// All labels in class-index order
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
    ];

    /// Stable class index used by the classifier
    pub fn index(self) -> usize {
        match self {
            SentimentLabel::Positive => 0,
            SentimentLabel::Neutral => 1,
            SentimentLabel::Negative => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = EvalSenseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Ok(SentimentLabel::Positive),
            "neutral" => Ok(SentimentLabel::Neutral),
            "negative" => Ok(SentimentLabel::Negative),
            other => Err(EvalSenseError::TrainingData(format!(
                "Unknown sentiment label: {}",
                other
            ))),
        }
    }
}

/// Calibrated probability for each sentiment label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl ClassProbabilities {
    /// Build from a probability slice in `SentimentLabel::ALL` order
    pub fn from_slice(probs: &[f64]) -> Self {
        let get = |i: usize| probs.get(i).copied().unwrap_or(0.0);
        Self {
            positive: get(0),
            neutral: get(1),
            negative: get(2),
        }
    }

    pub fn get(&self, label: SentimentLabel) -> f64 {
        match label {
            SentimentLabel::Positive => self.positive,
            SentimentLabel::Neutral => self.neutral,
            SentimentLabel::Negative => self.negative,
        }
    }
}

/// Result of classifying one piece of feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    /// Calibrated probability of `label`, in [0, 1]
    pub score: f64,
    /// Full distribution; absent when the model was not consulted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<ClassProbabilities>,
}

impl SentimentResult {
    /// Result used for empty text and for recovered batch failures
    pub fn neutral_default() -> Self {
        Self {
            label: SentimentLabel::Neutral,
            score: 0.5,
            probabilities: None,
        }
    }
}

/// Result of scanning one rating map for suspicious patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyResult {
    pub is_anomaly: bool,
    /// Severity in [0, 1]; higher is more suspicious
    pub anomaly_score: f64,
    pub reason: String,
}

impl AnomalyResult {
    pub fn anomalous(score: f64, reason: impl Into<String>) -> Self {
        Self {
            is_anomaly: true,
            anomaly_score: score,
            reason: reason.into(),
        }
    }

    pub fn normal() -> Self {
        Self {
            is_anomaly: false,
            anomaly_score: 0.0,
            reason: "normal pattern".to_string(),
        }
    }

    pub fn no_features() -> Self {
        Self {
            is_anomaly: false,
            anomaly_score: 0.0,
            reason: "No features to analyze".to_string(),
        }
    }

    /// In-band substitute for a record that failed inside a batch
    pub fn error(message: impl fmt::Display) -> Self {
        Self {
            is_anomaly: false,
            anomaly_score: 0.0,
            reason: format!("Error: {}", message),
        }
    }
}

/// Semantic grouping of evaluation questions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Relevance,
    Organization,
    Teaching,
    Assessment,
    Environment,
    Counseling,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Relevance,
        Category::Organization,
        Category::Teaching,
        Category::Assessment,
        Category::Environment,
        Category::Counseling,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Relevance => "relevance",
            Category::Organization => "organization",
            Category::Teaching => "teaching",
            Category::Assessment => "assessment",
            Category::Environment => "environment",
            Category::Counseling => "counseling",
        }
    }

    /// Resolve the category of a question id.
    ///
    /// Ids in [`QUESTION_BANK`] map through the table. Any other id resolves
    /// only when its leading `_`-separated segment equals a category name
    /// exactly, so `teaching_extra` is Teaching but `teachingassistant_1` is
    /// uncategorized.
    pub fn from_question_id(question_id: &str) -> Option<Self> {
        if let Some((_, category)) = QUESTION_BANK.iter().find(|(id, _)| *id == question_id) {
            return Some(*category);
        }

        let head = question_id.split('_').next()?;
        Category::ALL.iter().copied().find(|c| c.as_str() == head)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The standard 31-question course evaluation form
pub const QUESTION_BANK: &[(&str, Category)] = &[
    ("relevance_1", Category::Relevance),
    ("relevance_2", Category::Relevance),
    ("relevance_3", Category::Relevance),
    ("relevance_4", Category::Relevance),
    ("relevance_5", Category::Relevance),
    ("relevance_6", Category::Relevance),
    ("organization_1", Category::Organization),
    ("organization_2", Category::Organization),
    ("organization_3", Category::Organization),
    ("organization_4", Category::Organization),
    ("organization_5", Category::Organization),
    ("teaching_1", Category::Teaching),
    ("teaching_2", Category::Teaching),
    ("teaching_3", Category::Teaching),
    ("teaching_4", Category::Teaching),
    ("teaching_5", Category::Teaching),
    ("teaching_6", Category::Teaching),
    ("teaching_7", Category::Teaching),
    ("assessment_1", Category::Assessment),
    ("assessment_2", Category::Assessment),
    ("assessment_3", Category::Assessment),
    ("assessment_4", Category::Assessment),
    ("assessment_5", Category::Assessment),
    ("assessment_6", Category::Assessment),
    ("environment_1", Category::Environment),
    ("environment_2", Category::Environment),
    ("environment_3", Category::Environment),
    ("environment_4", Category::Environment),
    ("counseling_1", Category::Counseling),
    ("counseling_2", Category::Counseling),
    ("counseling_3", Category::Counseling),
];

/// Closed Likert range ratings must fall in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingScale {
    pub min: u8,
    pub max: u8,
}

impl RatingScale {
    pub fn contains(&self, value: i64) -> bool {
        value >= self.min as i64 && value <= self.max as i64
    }

    pub fn midpoint(&self) -> f64 {
        (self.min as f64 + self.max as f64) / 2.0
    }
}

impl Default for RatingScale {
    fn default() -> Self {
        Self { min: 1, max: 4 }
    }
}

/// Unvalidated ratings exactly as submitted, in submission order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRatings(pub Vec<(String, i64)>);

impl RawRatings {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for RawRatings {
    fn from_iter<I: IntoIterator<Item = (K, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl Serialize for RawRatings {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (question, value) in &self.0 {
            map.serialize_entry(question, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RawRatings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = RawRatings;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of question id to integer rating")
            }

            fn visit_map<M: MapAccess<'de>>(
                self,
                mut access: M,
            ) -> std::result::Result<Self::Value, M::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((question, value)) = access.next_entry::<String, i64>()? {
                    entries.push((question, value));
                }
                Ok(RawRatings(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// One validated answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rating {
    pub question_id: String,
    pub value: u8,
    pub category: Option<Category>,
}

/// Validated question id → score map, kept in submission order.
///
/// Order matters: the alternation feature compares adjacent answers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingMap {
    ratings: Vec<Rating>,
}

impl RatingMap {
    /// Validate raw answers against `scale`.
    ///
    /// Fails on an out-of-range value or a repeated question id. An empty
    /// input produces an empty map, which the detector treats as "no
    /// features" rather than an error.
    pub fn new<I, K>(entries: I, scale: &RatingScale) -> Result<Self>
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut ratings = Vec::new();

        for (question, value) in entries {
            let question_id: String = question.into();
            if !scale.contains(value) {
                return Err(EvalSenseError::InvalidRating(format!(
                    "{} = {} is outside [{}, {}]",
                    question_id, value, scale.min, scale.max
                )));
            }
            if !seen.insert(question_id.clone()) {
                return Err(EvalSenseError::InvalidRating(format!(
                    "duplicate question id {}",
                    question_id
                )));
            }
            let category = Category::from_question_id(&question_id);
            ratings.push(Rating {
                question_id,
                value: value as u8,
                category,
            });
        }

        Ok(Self { ratings })
    }

    pub fn from_raw(raw: &RawRatings, scale: &RatingScale) -> Result<Self> {
        Self::new(raw.0.iter().map(|(k, v)| (k.clone(), *v)), scale)
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rating> {
        self.ratings.iter()
    }

    /// Rating values as floats, in submission order
    pub fn values(&self) -> Vec<f64> {
        self.ratings.iter().map(|r| r.value as f64).collect()
    }

    pub fn get(&self, question_id: &str) -> Option<u8> {
        self.ratings
            .iter()
            .find(|r| r.question_id == question_id)
            .map(|r| r.value)
    }
}

impl Serialize for RatingMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.ratings.len()))?;
        for rating in &self.ratings {
            map.serialize_entry(&rating.question_id, &rating.value)?;
        }
        map.end()
    }
}
