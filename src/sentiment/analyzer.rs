//! Sentiment classifier: TF-IDF features fed to a calibrated kernel SVM

use super::corpus::LabeledText;
use super::metrics::{accuracy, ClassificationReport, TrainingMetrics};
use super::split::stratified_split;
use super::svm::{OneVsRestSvm, SvmParams};
use crate::artifact::{read_artifact, verify_fingerprint, write_artifact, ArtifactKind};
use crate::config::SentimentConfig;
use crate::error::{EvalSenseError, Result};
use crate::features::TfidfVectorizer;
use crate::types::{ClassProbabilities, SentimentLabel, SentimentResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Vectorizer and classifier persisted together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SentimentModel {
    vectorizer: TfidfVectorizer,
    classifier: OneVsRestSvm,
}

/// Read-only after construction; share across threads behind an `Arc`.
///
/// An analyzer built with [`SentimentAnalyzer::new`] holds no model and
/// rejects every prediction with [`EvalSenseError::ModelNotReady`].
#[derive(Debug, Clone, Default)]
pub struct SentimentAnalyzer {
    model: Option<SentimentModel>,
}

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }

    /// Vocabulary fingerprint of the loaded model
    pub fn fingerprint(&self) -> Option<String> {
        self.model.as_ref().map(|m| m.vectorizer.fingerprint())
    }

    /// Train a fresh model and evaluate it on a held-out stratified split
    pub fn train(corpus: &[LabeledText], config: &SentimentConfig) -> Result<(Self, TrainingMetrics)> {
        if corpus.is_empty() {
            return Err(EvalSenseError::TrainingData("corpus is empty".to_string()));
        }
        let distinct: BTreeSet<SentimentLabel> = corpus.iter().map(|e| e.label).collect();
        if distinct.len() < 2 {
            return Err(EvalSenseError::TrainingData(format!(
                "corpus needs at least two labels, found only {:?}",
                distinct
            )));
        }

        let labels: Vec<SentimentLabel> = corpus.iter().map(|e| e.label).collect();
        let (train_idx, test_idx) = stratified_split(&labels, config.test_fraction, config.seed);
        info!(
            "Training sentiment model on {} examples ({} held out)",
            train_idx.len(),
            test_idx.len()
        );

        let train_text: Vec<String> = train_idx.iter().map(|&i| corpus[i].text.clone()).collect();
        let train_labels: Vec<usize> = train_idx.iter().map(|&i| labels[i].index()).collect();

        let mut vectorizer = TfidfVectorizer::from_config(config);
        let x_train = vectorizer.fit_transform(&train_text)?;
        debug!("Vocabulary size: {}", vectorizer.n_features());

        let params = SvmParams {
            c: config.c,
            gamma: config.gamma,
            tolerance: config.tolerance,
            max_iterations: config.max_iterations,
            calibration_folds: config.calibration_folds,
            seed: config.seed,
        };
        let classifier = OneVsRestSvm::fit(&x_train, &train_labels, SentimentLabel::ALL.len(), &params)?;

        let analyzer = Self {
            model: Some(SentimentModel { vectorizer, classifier }),
        };

        let truth: Vec<SentimentLabel> = test_idx.iter().map(|&i| labels[i]).collect();
        let mut predicted = Vec::with_capacity(test_idx.len());
        for &i in &test_idx {
            predicted.push(analyzer.classify_sentiment(&corpus[i].text)?.label);
        }

        let metrics = TrainingMetrics {
            accuracy: accuracy(&truth, &predicted),
            report: ClassificationReport::compute(&truth, &predicted),
            train_samples: train_idx.len(),
            test_samples: test_idx.len(),
        };
        info!("Held-out accuracy: {:.3}", metrics.accuracy);
        debug!("Classification report:\n{}", metrics.report);

        Ok((analyzer, metrics))
    }

    /// Classify one piece of feedback.
    ///
    /// Empty or whitespace-only text short-circuits to a neutral result
    /// with score 0.5. Text whose terms are all unknown still goes through
    /// the classifier as a zero vector.
    pub fn classify_sentiment(&self, text: &str) -> Result<SentimentResult> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| EvalSenseError::ModelNotReady("sentiment model is not trained or loaded".to_string()))?;

        if text.trim().is_empty() {
            return Ok(SentimentResult::neutral_default());
        }

        let features = model.vectorizer.transform_one(text);
        let (class, score, probs) = model.classifier.predict(features.view());
        let label = SentimentLabel::from_index(class).ok_or_else(|| {
            EvalSenseError::Other(format!("classifier produced unknown class index {}", class))
        })?;

        Ok(SentimentResult {
            label,
            score: score.clamp(0.0, 1.0),
            probabilities: Some(ClassProbabilities::from_slice(&probs)),
        })
    }

    /// Classify many texts, order preserved.
    ///
    /// An unready model fails the whole call; any per-item failure is logged
    /// and replaced by the neutral default.
    pub fn classify_batch<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<SentimentResult>> {
        if !self.is_ready() {
            return Err(EvalSenseError::ModelNotReady(
                "sentiment model is not trained or loaded".to_string(),
            ));
        }

        Ok(texts
            .iter()
            .enumerate()
            .map(|(i, text)| match self.classify_sentiment(text.as_ref()) {
                Ok(result) => result,
                Err(e) => {
                    warn!("Sentiment classification failed for item {}: {}", i, e);
                    SentimentResult::neutral_default()
                }
            })
            .collect())
    }

    /// Persist the model, atomically replacing anything at `path`
    pub fn save(&self, path: &Path) -> Result<PathBuf> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| EvalSenseError::ModelNotReady("nothing to save".to_string()))?;
        write_artifact(path, ArtifactKind::Sentiment, &model.vectorizer.fingerprint(), model)?;
        Ok(path.to_path_buf())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let (header, model): (_, SentimentModel) = read_artifact(path, ArtifactKind::Sentiment)?;
        verify_fingerprint(&header, &model.vectorizer.fingerprint())?;
        info!(
            "Loaded sentiment model: {} terms, {} classes",
            model.vectorizer.n_features(),
            model.classifier.n_classes()
        );
        Ok(Self { model: Some(model) })
    }
}
