//! Self-learning loop: reviewer feedback in, a refreshed reject classifier out.

pub mod features;
pub mod model;
pub mod store;
pub mod trainer;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

pub use features::{FeatureVector, FEATURE_NAMES};
pub use model::{ClassifierArtifact, Loss, SgdConfig, TrainingMetadata};
pub use store::{label_for, FeedbackMetadata, FeedbackRecord, FeedbackStore};
pub use trainer::{
    auto_train, predict_reject_probability, should_retrain, train_from_feedback,
    train_with_config, AutoTrainOutcome, Prediction, RetrainDecision, SelfLearningCheck,
    TrainingReport, DEFAULT_MIN_NEW_RECORDS, MIN_CLASS_ROWS, MIN_TRAINING_ROWS,
};

#[derive(Debug, thiserror::Error)]
pub enum LearningError {
    #[error("unsupported verdict label: {0:?}")]
    UnknownLabel(String),
    #[error(
        "training needs at least {min_rows} labeled rows and {min_class} per class; \
         got {rows} rows (approve={approve}, reject={reject})",
        min_rows = MIN_TRAINING_ROWS,
        min_class = MIN_CLASS_ROWS
    )]
    InsufficientTrainingData {
        rows: usize,
        approve: usize,
        reject: usize,
    },
    #[error("feedback file not found: {}", .0.display())]
    FeedbackNotFound(PathBuf),
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid feedback record at {}:{line}: {source}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid model artifact {}: {source}", path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize: {0}")]
    Serialize(#[source] serde_json::Error),
}
