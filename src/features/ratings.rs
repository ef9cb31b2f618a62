//! Statistical features of a single rating map
//!
//! Pure functions: nothing here owns state. The feature vector layout is
//! `[mean, std, min, max, median, variance, range, count(scale_min) ..
//! count(scale_max), all_identical, alternation, raw values...]`.

use crate::types::{Category, RatingMap, RatingScale};
use std::collections::BTreeMap;

/// Number of fixed (non-raw) dimensions for a given scale
pub fn summary_len(scale: &RatingScale) -> usize {
    7 + (scale.max - scale.min + 1) as usize + 2
}

/// Summary statistics of one evaluation's ratings
#[derive(Debug, Clone, PartialEq)]
pub struct RatingFeatures {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub variance: f64,
    pub range: f64,
    /// Occurrences of each scale value, `scale.min` first
    pub value_counts: Vec<usize>,
    pub all_identical: bool,
    /// Fraction of adjacent pairs that differ; 0 for fewer than three ratings
    pub alternation: f64,
    /// Raw values in submission order
    pub values: Vec<f64>,
}

impl RatingFeatures {
    /// Extract features, or `None` for an empty map
    pub fn extract(ratings: &RatingMap, scale: &RatingScale) -> Option<Self> {
        if ratings.is_empty() {
            return None;
        }

        let values = ratings.values();
        let mean = mean(&values);
        let variance = variance(&values);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        // Values outside `scale` (a map validated against another scale) are not counted
        let mut value_counts = vec![0usize; scale.max.saturating_sub(scale.min) as usize + 1];
        for rating in ratings.iter() {
            let Some(slot) = rating.value.checked_sub(scale.min) else {
                continue;
            };
            if let Some(count) = value_counts.get_mut(slot as usize) {
                *count += 1;
            }
        }

        Some(Self {
            mean,
            std: variance.sqrt(),
            min,
            max,
            median: median(&values),
            variance,
            range: max - min,
            value_counts,
            all_identical: values.iter().all(|v| *v == values[0]),
            alternation: alternation_score(&values),
            values,
        })
    }

    /// Fixed summary dimensions, without the raw values
    pub fn summary_vector(&self) -> Vec<f64> {
        let mut out = vec![
            self.mean,
            self.std,
            self.min,
            self.max,
            self.median,
            self.variance,
            self.range,
        ];
        out.extend(self.value_counts.iter().map(|c| *c as f64));
        out.push(if self.all_identical { 1.0 } else { 0.0 });
        out.push(self.alternation);
        out
    }

    /// Full feature vector: summary followed by raw values
    pub fn to_vector(&self) -> Vec<f64> {
        let mut out = self.summary_vector();
        out.extend_from_slice(&self.values);
        out
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by n)
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Fraction of adjacent pairs whose values differ
pub fn alternation_score(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let changes = values.windows(2).filter(|w| w[0] != w[1]).count();
    changes as f64 / (values.len() - 1) as f64
}

/// Mean rating per category, for categorized questions only
pub fn category_means(ratings: &RatingMap) -> BTreeMap<Category, f64> {
    let mut grouped: BTreeMap<Category, Vec<f64>> = BTreeMap::new();
    for rating in ratings.iter() {
        if let Some(category) = rating.category {
            grouped.entry(category).or_default().push(rating.value as f64);
        }
    }
    grouped
        .into_iter()
        .map(|(category, values)| (category, mean(&values)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, i64)]) -> RatingMap {
        RatingMap::new(pairs.iter().map(|(k, v)| (*k, *v)), &RatingScale::default()).unwrap()
    }

    #[test]
    fn test_extract_statistics() {
        let ratings = map(&[("q1", 4), ("q2", 3), ("q3", 2), ("q4", 2), ("q5", 4)]);
        let features = RatingFeatures::extract(&ratings, &RatingScale::default()).unwrap();

        assert!((features.mean - 3.0).abs() < 1e-12);
        assert!((features.variance - 0.8).abs() < 1e-12);
        assert!((features.std - 0.8f64.sqrt()).abs() < 1e-12);
        assert_eq!(features.min, 2.0);
        assert_eq!(features.max, 4.0);
        assert_eq!(features.median, 3.0);
        assert_eq!(features.range, 2.0);
        assert_eq!(features.value_counts, vec![0, 2, 1, 2]);
        assert!(!features.all_identical);
        assert!((features.alternation - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_values_below_scale_are_not_counted() {
        let wide = RatingScale { min: 0, max: 4 };
        let ratings = RatingMap::new([("q1", 0), ("q2", 3)], &wide).unwrap();
        let features = RatingFeatures::extract(&ratings, &RatingScale::default()).unwrap();

        assert_eq!(features.value_counts, vec![0, 0, 1, 0]);
        assert_eq!(features.min, 0.0);
        assert!((features.mean - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_vector_layout() {
        let scale = RatingScale::default();
        let ratings = map(&[("q1", 1), ("q2", 2)]);
        let features = RatingFeatures::extract(&ratings, &scale).unwrap();

        assert_eq!(features.summary_vector().len(), summary_len(&scale));
        let full = features.to_vector();
        assert_eq!(full.len(), summary_len(&scale) + 2);
        assert_eq!(&full[full.len() - 2..], &[1.0, 2.0]);
    }

    #[test]
    fn test_empty_map_has_no_features() {
        let ratings = map(&[]);
        assert!(RatingFeatures::extract(&ratings, &RatingScale::default()).is_none());
    }

    #[test]
    fn test_alternation_needs_three_ratings() {
        assert_eq!(alternation_score(&[1.0, 4.0]), 0.0);
        assert_eq!(alternation_score(&[1.0, 4.0, 1.0]), 1.0);
        assert_eq!(alternation_score(&[2.0, 2.0, 2.0]), 0.0);
    }

    #[test]
    fn test_median_even_count() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn test_category_means_skip_uncategorized() {
        let ratings = map(&[
            ("relevance_a", 4),
            ("relevance_b", 3),
            ("teaching_a", 2),
            ("q9", 1),
        ]);
        let means = category_means(&ratings);
        assert_eq!(means.len(), 2);
        assert_eq!(means[&Category::Relevance], 3.5);
        assert_eq!(means[&Category::Teaching], 2.0);
    }
}
