//! Ordered single-evaluation rules, first match wins.
//!
//! Each rule is a `(predicate, severity, reason)` triple evaluated against
//! the extracted features of one rating map. Evaluation stops at the first
//! rule whose predicate holds; rule scores are never combined.
//!
//! | # | Rule                   | Default severity |
//! |---|------------------------|------------------|
//! | 1 | all at scale minimum   | 0.95             |
//! | 2 | all at scale maximum   | 0.95             |
//! | 3 | all identical          | 1.0              |
//! | 4 | std below threshold    | 0.8              |
//! | 5 | alternation above      | 0.85             |
//! | 6 | category-mean variance | 0.75             |
//!
//! Rules 1 to 4 need at least two ratings: one answer is not a pattern.
//! Rule 6 needs at least two categories present.

use crate::config::{AnomalyConfig, SeverityConfig};
use crate::features::ratings::variance;
use crate::features::RatingFeatures;
use crate::types::{AnomalyResult, Category};
use std::collections::BTreeMap;

/// Everything a rule may look at
pub struct RuleContext<'a> {
    pub features: &'a RatingFeatures,
    pub category_means: &'a BTreeMap<Category, f64>,
    pub config: &'a AnomalyConfig,
}

impl RuleContext<'_> {
    fn repeated(&self) -> bool {
        self.features.values.len() >= 2 && self.features.all_identical
    }

    /// Variance across category means, when two or more categories are present
    pub fn category_variance(&self) -> Option<f64> {
        if self.category_means.len() < 2 {
            return None;
        }
        let means: Vec<f64> = self.category_means.values().copied().collect();
        Some(variance(&means))
    }
}

pub struct Rule {
    pub name: &'static str,
    pub applies: fn(&RuleContext) -> bool,
    pub severity: fn(&SeverityConfig) -> f64,
    pub reason: fn(&RuleContext) -> String,
}

pub const RULES: &[Rule] = &[
    Rule {
        name: "all_minimum",
        applies: |ctx| ctx.repeated() && ctx.features.min == ctx.config.scale_min as f64,
        severity: |s| s.extreme,
        reason: |ctx| format!("All ratings are at the minimum ({})", ctx.config.scale_min),
    },
    Rule {
        name: "all_maximum",
        applies: |ctx| ctx.repeated() && ctx.features.max == ctx.config.scale_max as f64,
        severity: |s| s.extreme,
        reason: |ctx| format!("All ratings are at the maximum ({})", ctx.config.scale_max),
    },
    Rule {
        name: "straight_lining",
        applies: |ctx| ctx.repeated(),
        severity: |s| s.straight_lining,
        reason: |ctx| {
            format!(
                "All ratings identical ({}): straight-lining",
                ctx.features.values[0]
            )
        },
    },
    Rule {
        name: "low_variance",
        applies: |ctx| ctx.features.values.len() >= 2 && ctx.features.std < ctx.config.low_std_threshold,
        severity: |s| s.low_variance,
        reason: |ctx| format!("Very low rating variance (std={:.3})", ctx.features.std),
    },
    Rule {
        name: "alternating",
        applies: |ctx| ctx.features.alternation > ctx.config.alternation_threshold,
        severity: |s| s.alternating,
        reason: |ctx| {
            format!(
                "Alternating rating pattern (alternation score={:.2})",
                ctx.features.alternation
            )
        },
    },
    Rule {
        name: "category_inconsistency",
        applies: |ctx| {
            ctx.category_variance()
                .is_some_and(|v| v > ctx.config.category_variance_threshold)
        },
        severity: |s| s.category_inconsistency,
        reason: |ctx| {
            format!(
                "Inconsistent ratings across categories (variance of category means={:.2})",
                ctx.category_variance().unwrap_or(0.0)
            )
        },
    },
];

/// Run the rule table; the first rule that applies decides the result
pub fn evaluate(ctx: &RuleContext) -> AnomalyResult {
    RULES
        .iter()
        .find(|rule| (rule.applies)(ctx))
        .map(|rule| {
            tracing::debug!("Anomaly rule '{}' fired", rule.name);
            AnomalyResult::anomalous((rule.severity)(&ctx.config.severity), (rule.reason)(ctx))
        })
        .unwrap_or_else(AnomalyResult::normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::ratings::category_means;
    use crate::types::RatingMap;

    fn run(pairs: &[(&str, i64)], config: &AnomalyConfig) -> AnomalyResult {
        let ratings = RatingMap::new(pairs.iter().map(|(k, v)| (*k, *v)), &config.scale()).unwrap();
        let features = RatingFeatures::extract(&ratings, &config.scale()).unwrap();
        let means = category_means(&ratings);
        evaluate(&RuleContext {
            features: &features,
            category_means: &means,
            config,
        })
    }

    #[test]
    fn test_rule_order_is_fixed() {
        let names: Vec<&str> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "all_minimum",
                "all_maximum",
                "straight_lining",
                "low_variance",
                "alternating",
                "category_inconsistency"
            ]
        );
    }

    #[test]
    fn test_all_minimum() {
        let result = run(&[("q1", 1), ("q2", 1), ("q3", 1)], &AnomalyConfig::default());
        assert!(result.is_anomaly);
        assert_eq!(result.anomaly_score, 0.95);
        assert!(result.reason.contains("minimum (1)"));
    }

    #[test]
    fn test_interior_straight_lining() {
        let result = run(&[("q1", 3), ("q2", 3), ("q3", 3)], &AnomalyConfig::default());
        assert_eq!(result.anomaly_score, 1.0);
        assert!(result.reason.contains("straight-lining"));
        assert!(result.reason.contains('3'));
    }

    #[test]
    fn test_single_rating_is_normal() {
        let result = run(&[("q1", 4)], &AnomalyConfig::default());
        assert_eq!(result, AnomalyResult::normal());
    }

    #[test]
    fn test_low_variance() {
        let mut pairs: Vec<(String, i64)> = (0..19).map(|i| (format!("q{}", i), 3)).collect();
        pairs.push(("q19".to_string(), 2));
        let borrowed: Vec<(&str, i64)> = pairs.iter().map(|(k, v)| (k.as_str(), *v)).collect();

        let result = run(&borrowed, &AnomalyConfig::default());
        assert_eq!(result.anomaly_score, 0.8);
        assert!(result.reason.contains("std="));
    }

    #[test]
    fn test_category_variance_needs_two_categories() {
        let config = AnomalyConfig {
            category_variance_threshold: 0.0,
            alternation_threshold: 1.0,
            ..AnomalyConfig::default()
        };
        let result = run(&[("teaching_1", 1), ("teaching_2", 4), ("teaching_3", 2)], &config);
        assert!(!result.is_anomaly);
    }

    #[test]
    fn test_configured_severity_is_used() {
        let mut config = AnomalyConfig::default();
        config.severity.alternating = 0.5;
        let result = run(&[("q1", 4), ("q2", 1), ("q3", 4), ("q4", 1)], &config);
        assert_eq!(result.anomaly_score, 0.5);
    }
}
