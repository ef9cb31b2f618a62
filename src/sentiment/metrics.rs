//! Held-out evaluation metrics for the sentiment classifier

use crate::types::SentimentLabel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Precision / recall / F1 for one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: SentimentLabel,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Number of true instances in the evaluated set
    pub support: usize,
}

/// Per-class report plus macro averages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
}

/// Outcome of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub accuracy: f64,
    pub report: ClassificationReport,
    pub train_samples: usize,
    pub test_samples: usize,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn accuracy(truth: &[SentimentLabel], predicted: &[SentimentLabel]) -> f64 {
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    ratio(correct, truth.len())
}

impl ClassificationReport {
    /// Build a report over every label; undefined ratios count as 0
    pub fn compute(truth: &[SentimentLabel], predicted: &[SentimentLabel]) -> Self {
        let classes: Vec<ClassMetrics> = SentimentLabel::ALL
            .iter()
            .map(|&label| {
                let pairs = truth.iter().zip(predicted);
                let tp = pairs.clone().filter(|(t, p)| **t == label && **p == label).count();
                let predicted_pos = predicted.iter().filter(|p| **p == label).count();
                let support = truth.iter().filter(|t| **t == label).count();

                let precision = ratio(tp, predicted_pos);
                let recall = ratio(tp, support);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1_score,
                    support,
                }
            })
            .collect();

        let n = classes.len() as f64;
        let macro_precision = classes.iter().map(|c| c.precision).sum::<f64>() / n;
        let macro_recall = classes.iter().map(|c| c.recall).sum::<f64>() / n;
        let macro_f1 = classes.iter().map(|c| c.f1_score).sum::<f64>() / n;

        Self {
            classes,
            macro_precision,
            macro_recall,
            macro_f1,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>12} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label.as_str(),
                c.precision,
                c.recall,
                c.f1_score,
                c.support
            )?;
        }
        let total: usize = self.classes.iter().map(|c| c.support).sum();
        write!(
            f,
            "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
            "macro avg", self.macro_precision, self.macro_recall, self.macro_f1, total
        )
    }
}
