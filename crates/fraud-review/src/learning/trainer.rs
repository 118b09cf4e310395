use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::features::FeatureVector;
use super::model::{ClassifierArtifact, FeatureVectorizer, LinearClassifier, SgdConfig, TrainingMetadata};
use super::store::FeedbackStore;
use super::LearningError;
use crate::review::collectors::{CheckOutcome, CheckRequest, ExternalCheck};

pub const MIN_TRAINING_ROWS: usize = 20;
pub const MIN_CLASS_ROWS: usize = 5;
pub const DEFAULT_MIN_NEW_RECORDS: usize = 25;

const HIGH_RISK_PROBABILITY: f64 = 0.8;
const ELEVATED_PROBABILITY: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub model_path: PathBuf,
    pub training_samples: usize,
    /// Share of reject labels, rounded to four decimals.
    pub reject_rate: f64,
    pub approve_samples: usize,
    pub reject_samples: usize,
    pub metadata: TrainingMetadata,
}

pub fn train_from_feedback(store: &FeedbackStore, model_path: &Path) -> Result<TrainingReport, LearningError> {
    train_with_config(store, model_path, &SgdConfig::default(), Utc::now())
}

/// Fit a fresh artifact from every labeled feedback row. The existing
/// artifact is left untouched on any error.
pub fn train_with_config(
    store: &FeedbackStore,
    model_path: &Path,
    config: &SgdConfig,
    trained_at_utc: DateTime<Utc>,
) -> Result<TrainingReport, LearningError> {
    if !store.exists() {
        return Err(LearningError::FeedbackNotFound(store.path().to_path_buf()));
    }

    let records = store.read_all()?;
    let mut rows = Vec::with_capacity(records.len());
    let mut labels = Vec::with_capacity(records.len());
    for record in &records {
        let Some(label) = record.label()? else {
            continue;
        };
        rows.push(FeatureVector::from_raw(&record.account, &record.context));
        labels.push(label);
    }

    let reject_samples = labels.iter().filter(|label| **label == 1).count();
    let approve_samples = labels.len() - reject_samples;
    if labels.len() < MIN_TRAINING_ROWS
        || reject_samples < MIN_CLASS_ROWS
        || approve_samples < MIN_CLASS_ROWS
    {
        return Err(LearningError::InsufficientTrainingData {
            rows: labels.len(),
            approve: approve_samples,
            reject: reject_samples,
        });
    }

    let vectorizer = FeatureVectorizer::fit(&rows);
    let matrix: Vec<Vec<f64>> = rows.iter().map(|row| vectorizer.transform(row)).collect();
    let classifier = LinearClassifier::fit(&matrix, &labels, config);

    let metadata = TrainingMetadata {
        trained_at_utc,
        training_samples: labels.len(),
        approve_samples,
        reject_samples,
        feedback_line_count: records.len(),
        feature_count: vectorizer.feature_count(),
    };
    let artifact = ClassifierArtifact {
        vectorizer,
        classifier,
        metadata: metadata.clone(),
    };
    artifact.save(model_path)?;

    let reject_rate = (reject_samples as f64 / labels.len() as f64 * 10_000.0).round() / 10_000.0;
    tracing::info!(
        model = %model_path.display(),
        samples = labels.len(),
        reject_rate,
        epochs = artifact.classifier.epochs,
        "self-learning model trained"
    );

    Ok(TrainingReport {
        model_path: model_path.to_path_buf(),
        training_samples: labels.len(),
        reject_rate,
        approve_samples,
        reject_samples,
        metadata,
    })
}

/// Structured answer from the retraining gate; a skip is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrainDecision {
    pub should_retrain: bool,
    pub reason: String,
    pub new_records: usize,
    pub feedback_line_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_trained_feedback_count: Option<usize>,
    pub min_new_records: usize,
}

pub fn should_retrain(
    store: &FeedbackStore,
    model_path: &Path,
    min_new_records: usize,
) -> Result<RetrainDecision, LearningError> {
    if !store.exists() {
        return Ok(RetrainDecision {
            should_retrain: false,
            reason: format!("feedback file not found: {}", store.path().display()),
            new_records: 0,
            feedback_line_count: 0,
            last_trained_feedback_count: None,
            min_new_records,
        });
    }

    let line_count = store.count_lines()?;
    if !model_path.exists() {
        let ready = line_count >= MIN_TRAINING_ROWS;
        return Ok(RetrainDecision {
            should_retrain: ready,
            reason: if ready {
                "model not found; initial training threshold met".to_string()
            } else {
                format!("model not found; need {MIN_TRAINING_ROWS} feedback records, have {line_count}")
            },
            new_records: line_count,
            feedback_line_count: line_count,
            last_trained_feedback_count: None,
            min_new_records,
        });
    }

    let artifact = ClassifierArtifact::load(model_path)?;
    let last_seen = artifact.metadata.feedback_line_count;
    let new_records = line_count.saturating_sub(last_seen);
    let due = new_records >= min_new_records;

    Ok(RetrainDecision {
        should_retrain: due,
        reason: if due {
            "threshold met".to_string()
        } else {
            format!("not enough new feedback ({new_records} of {min_new_records})")
        },
        new_records,
        feedback_line_count: line_count,
        last_trained_feedback_count: Some(last_seen),
        min_new_records,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoTrainOutcome {
    pub trained: bool,
    pub decision: RetrainDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TrainingReport>,
}

/// Train only when the gate says new feedback justifies it.
pub fn auto_train(
    store: &FeedbackStore,
    model_path: &Path,
    min_new_records: usize,
) -> Result<AutoTrainOutcome, LearningError> {
    let decision = should_retrain(store, model_path, min_new_records)?;
    if !decision.should_retrain {
        tracing::info!(reason = %decision.reason, "retraining skipped");
        return Ok(AutoTrainOutcome {
            trained: false,
            decision,
            result: None,
        });
    }

    let result = train_from_feedback(store, model_path)?;
    Ok(AutoTrainOutcome {
        trained: true,
        decision,
        result: Some(result),
    })
}

/// Result of querying the artifact. Unavailability is data, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub available: bool,
    pub reject_probability: Option<f64>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_metadata: Option<TrainingMetadata>,
}

impl Prediction {
    fn unavailable(error: String) -> Self {
        Self {
            available: false,
            reject_probability: None,
            error: Some(error),
            model_metadata: None,
        }
    }
}

pub fn predict_reject_probability(model_path: &Path, features: &FeatureVector) -> Prediction {
    if !model_path.exists() {
        return Prediction::unavailable(format!("model not found: {}", model_path.display()));
    }
    match ClassifierArtifact::load(model_path) {
        Ok(artifact) => Prediction {
            available: true,
            reject_probability: Some(artifact.reject_probability(features)),
            error: None,
            model_metadata: Some(artifact.metadata),
        },
        Err(error) => {
            tracing::warn!(model = %model_path.display(), %error, "self-learning model unreadable");
            Prediction::unavailable(error.to_string())
        }
    }
}

/// Queries the trained artifact as one more optional signal.
pub struct SelfLearningCheck {
    model_path: PathBuf,
}

impl SelfLearningCheck {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
        }
    }
}

impl ExternalCheck for SelfLearningCheck {
    fn name(&self) -> &'static str {
        "self_learning"
    }

    fn run(&self, request: &CheckRequest<'_>) -> CheckOutcome {
        let features = FeatureVector::from_account(request.account, request.context);
        let prediction = predict_reject_probability(&self.model_path, &features);
        let detail = serde_json::to_value(&prediction).unwrap_or_default();

        let Some(probability) = prediction.reject_probability else {
            let reason = prediction.error.unwrap_or_else(|| "no prediction".to_string());
            return CheckOutcome::skipped(
                self.name(),
                format!("Self-learning model not applied: {reason}."),
            )
            .with_detail(detail);
        };

        let mut outcome = CheckOutcome::applied(self.name()).with_detail(detail);
        if probability >= HIGH_RISK_PROBABILITY {
            outcome.add_risk(
                20,
                "SELF_LEARNING_HIGH_RISK",
                format!("Self-learning model reject probability is high ({probability:.2})."),
            );
        } else if probability >= ELEVATED_PROBABILITY {
            outcome.add_risk(
                10,
                "SELF_LEARNING_ELEVATED",
                format!("Self-learning model reject probability is elevated ({probability:.2})."),
            );
        } else {
            outcome.note(format!(
                "Self-learning model reject probability is {probability:.2}."
            ));
        }
        outcome
    }
}
