//! Error types for the evalsense scoring pipeline
//!
//! This module provides structured error definitions using thiserror. Errors
//! that a caller must act on (an unready model, a bad artifact) propagate;
//! per-item failures inside batch operations are converted to in-band
//! defaults by the components themselves and never reach this type.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for evalsense operations
#[derive(Error, Debug)]
pub enum EvalSenseError {
    /// Prediction requested before a model was trained or loaded
    #[error("Model not ready: {0}")]
    ModelNotReady(String),

    /// Training corpus cannot produce a model
    #[error("Training data error: {0}")]
    TrainingData(String),

    /// Model artifact does not exist
    #[error("Artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// Artifact exists but was written by a different format or for a different model
    #[error("Incompatible artifact: {0}")]
    IncompatibleArtifact(String),

    /// Rating outside the configured scale or otherwise malformed
    #[error("Invalid rating: {0}")]
    InvalidRating(String),

    /// Batch operation given no items
    #[error("Empty batch: {0}")]
    EmptyBatch(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Binary artifact encoding error
    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for evalsense operations
pub type Result<T> = std::result::Result<T, EvalSenseError>;
