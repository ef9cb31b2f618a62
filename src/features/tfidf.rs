//! TF-IDF vectorizer over unigram and bigram terms
//!
//! Fitting keeps terms whose document frequency lies in
//! `[min_df, max_df * n_docs]`, caps the vocabulary at `max_features` by
//! corpus term frequency and assigns indices in lexical order. Transform
//! weights raw counts by the smoothed idf `ln((1 + n) / (1 + df)) + 1` and
//! L2-normalizes the row. Out-of-vocabulary terms contribute nothing.

use crate::config::SentimentConfig;
use crate::error::{EvalSenseError, Result};
use crate::features::text;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Fitted (or unfitted) TF-IDF vectorizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Term → column index
    vocabulary: HashMap<String, usize>,
    /// Terms in column order
    terms: Vec<String>,
    /// Inverse document frequency per column
    idf: Vec<f64>,
    max_features: usize,
    min_df: usize,
    max_df: f64,
    ngram_max: usize,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize, min_df: usize, max_df: f64, ngram_max: usize) -> Self {
        Self {
            vocabulary: HashMap::new(),
            terms: Vec::new(),
            idf: Vec::new(),
            max_features,
            min_df,
            max_df,
            ngram_max,
        }
    }

    pub fn from_config(config: &SentimentConfig) -> Self {
        Self::new(
            config.max_features,
            config.min_df,
            config.max_df,
            config.ngram_max,
        )
    }

    pub fn is_fitted(&self) -> bool {
        !self.terms.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.terms.len()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    /// Learn the vocabulary and idf weights from `documents`
    pub fn fit(&mut self, documents: &[String]) -> Result<()> {
        if documents.is_empty() {
            return Err(EvalSenseError::TrainingData(
                "cannot fit vectorizer on an empty corpus".to_string(),
            ));
        }

        let n_docs = documents.len();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut term_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let terms = text::analyze(doc, self.ngram_max);
            let unique: HashSet<&String> = terms.iter().collect();
            for term in unique {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            for term in terms {
                *term_freq.entry(term).or_insert(0) += 1;
            }
        }

        let max_count = (self.max_df * n_docs as f64).floor() as usize;
        let mut kept: Vec<(String, usize)> = doc_freq
            .into_iter()
            .filter(|(_, df)| *df >= self.min_df && *df <= max_count)
            .map(|(term, _)| {
                let tf = term_freq.get(&term).copied().unwrap_or(0);
                (term, tf)
            })
            .collect();

        if kept.is_empty() {
            return Err(EvalSenseError::TrainingData(format!(
                "no terms left after pruning (min_df={}, max_df={}) over {} documents",
                self.min_df, self.max_df, n_docs
            )));
        }

        // Highest corpus frequency first; ties broken lexically for determinism
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        kept.truncate(self.max_features);

        let mut terms: Vec<String> = kept.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        self.vocabulary = terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.clone(), idx))
            .collect();
        self.terms = terms;

        let mut df = vec![0usize; self.terms.len()];
        for doc in documents {
            let unique: HashSet<String> = text::analyze(doc, self.ngram_max).into_iter().collect();
            for term in unique {
                if let Some(&idx) = self.vocabulary.get(&term) {
                    df[idx] += 1;
                }
            }
        }

        let n = n_docs as f64;
        self.idf = df
            .into_iter()
            .map(|d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        debug!(
            "Fitted TF-IDF vocabulary: {} terms from {} documents",
            self.terms.len(),
            n_docs
        );
        Ok(())
    }

    /// Vectorize a single document against the fitted vocabulary
    pub fn transform_one(&self, document: &str) -> Array1<f64> {
        let mut row = Array1::<f64>::zeros(self.terms.len());
        for term in text::analyze(document, self.ngram_max) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                row[idx] += 1.0;
            }
        }

        for (value, idf) in row.iter_mut().zip(&self.idf) {
            *value *= idf;
        }

        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row /= norm;
        }
        row
    }

    /// Vectorize many documents into a dense `n_docs x n_features` matrix
    pub fn transform(&self, documents: &[String]) -> Array2<f64> {
        let mut matrix = Array2::<f64>::zeros((documents.len(), self.terms.len()));
        for (i, doc) in documents.iter().enumerate() {
            matrix.row_mut(i).assign(&self.transform_one(doc));
        }
        matrix
    }

    pub fn fit_transform(&mut self, documents: &[String]) -> Result<Array2<f64>> {
        self.fit(documents)?;
        Ok(self.transform(documents))
    }

    /// SHA-256 over the vocabulary in column order
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("ngram_max={};", self.ngram_max).as_bytes());
        for term in &self.terms {
            hasher.update(term.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }
}
