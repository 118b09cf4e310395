//! Linear reject classifier and its on-disk artifact.
//!
//! The vectorizer fixes the feature order and standardizes each column; the
//! classifier is a linear model fitted with seeded stochastic gradient
//! descent, so retraining on the same feedback yields the same weights.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::features::FeatureVector;
use super::LearningError;

/// Distinguishes temp files of concurrent saves within one process.
static SAVE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Column order and scaling learned from the training rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVectorizer {
    pub feature_names: Vec<String>,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

impl FeatureVectorizer {
    pub fn fit(rows: &[FeatureVector]) -> Self {
        let mut feature_names: Vec<String> = rows
            .iter()
            .flat_map(|row| row.iter().map(|(name, _)| name.to_string()))
            .collect();
        feature_names.sort();
        feature_names.dedup();

        let count = rows.len().max(1) as f64;
        let mut means = Vec::with_capacity(feature_names.len());
        let mut scales = Vec::with_capacity(feature_names.len());
        for name in &feature_names {
            let mean = rows.iter().map(|row| row.get(name)).sum::<f64>() / count;
            let variance = rows
                .iter()
                .map(|row| (row.get(name) - mean).powi(2))
                .sum::<f64>()
                / count;
            let deviation = variance.sqrt();
            means.push(mean);
            // Constant columns keep unit scale.
            scales.push(if deviation > f64::EPSILON { deviation } else { 1.0 });
        }

        Self {
            feature_names,
            means,
            scales,
        }
    }

    pub fn transform(&self, row: &FeatureVector) -> Vec<f64> {
        self.feature_names
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(name, (mean, scale))| (row.get(name) - mean) / scale)
            .collect()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Loss {
    /// Logistic loss; exposes a native probability.
    Log,
    /// Hinge loss; probability derived from the margin.
    Hinge,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SgdConfig {
    pub loss: Loss,
    pub alpha: f64,
    pub max_iter: usize,
    pub tol: f64,
    pub n_iter_no_change: usize,
    pub eta0: f64,
    pub seed: u64,
}

impl Default for SgdConfig {
    fn default() -> Self {
        Self {
            loss: Loss::Log,
            alpha: 1e-4,
            max_iter: 2000,
            tol: 1e-3,
            n_iter_no_change: 5,
            eta0: 0.1,
            seed: 42,
        }
    }
}

pub fn logistic(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    pub loss: Loss,
    pub weights: Vec<f64>,
    pub intercept: f64,
    pub epochs: usize,
}

impl LinearClassifier {
    /// Fit on standardized rows with labels in {0, 1}.
    pub fn fit(rows: &[Vec<f64>], labels: &[u8], config: &SgdConfig) -> Self {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        let mut weights = vec![0.0; width];
        let mut intercept = 0.0;
        let mut order: Vec<usize> = (0..rows.len()).collect();
        let mut rng = StdRng::seed_from_u64(config.seed);

        let mut step: f64 = 0.0;
        let mut best_loss = f64::INFINITY;
        let mut stale_epochs = 0;
        let mut epochs = 0;

        for _ in 0..config.max_iter {
            epochs += 1;
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;

            for &index in &order {
                let x = &rows[index];
                let y = f64::from(labels[index]);
                let eta = config.eta0 / (1.0 + config.eta0 * config.alpha * step);
                step += 1.0;

                let margin = dot(&weights, x) + intercept;
                let gradient = match config.loss {
                    Loss::Log => {
                        let p = logistic(margin);
                        epoch_loss += log_loss(p, y);
                        p - y
                    }
                    Loss::Hinge => {
                        let signed = 2.0 * y - 1.0;
                        let slack = 1.0 - signed * margin;
                        epoch_loss += slack.max(0.0);
                        if slack > 0.0 {
                            -signed
                        } else {
                            0.0
                        }
                    }
                };

                for (weight, feature) in weights.iter_mut().zip(x) {
                    *weight -= eta * (gradient * feature + config.alpha * *weight);
                }
                intercept -= eta * gradient;
            }

            let mean_loss = epoch_loss / rows.len().max(1) as f64;
            if mean_loss > best_loss - config.tol {
                stale_epochs += 1;
            } else {
                stale_epochs = 0;
            }
            best_loss = best_loss.min(mean_loss);
            if stale_epochs >= config.n_iter_no_change {
                break;
            }
        }

        Self {
            loss: config.loss,
            weights,
            intercept,
            epochs,
        }
    }

    pub fn decision_function(&self, x: &[f64]) -> f64 {
        dot(&self.weights, x) + self.intercept
    }

    /// Native probability, when the loss provides one.
    pub fn predict_proba(&self, x: &[f64]) -> Option<f64> {
        match self.loss {
            Loss::Log => Some(logistic(self.decision_function(x))),
            Loss::Hinge => None,
        }
    }

    pub fn reject_probability(&self, x: &[f64]) -> f64 {
        self.predict_proba(x)
            .unwrap_or_else(|| logistic(self.decision_function(x)))
    }
}

fn dot(weights: &[f64], x: &[f64]) -> f64 {
    weights.iter().zip(x).map(|(w, v)| w * v).sum()
}

fn log_loss(p: f64, y: f64) -> f64 {
    let p = p.clamp(1e-12, 1.0 - 1e-12);
    -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub trained_at_utc: DateTime<Utc>,
    pub training_samples: usize,
    pub approve_samples: usize,
    pub reject_samples: usize,
    /// Non-blank feedback lines seen at training time.
    pub feedback_line_count: usize,
    pub feature_count: usize,
}

/// Replaced wholesale on every successful retrain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    pub vectorizer: FeatureVectorizer,
    pub classifier: LinearClassifier,
    pub metadata: TrainingMetadata,
}

impl ClassifierArtifact {
    pub fn reject_probability(&self, features: &FeatureVector) -> f64 {
        let x = self.vectorizer.transform(features);
        self.classifier.reject_probability(&x)
    }

    pub fn load(path: &Path) -> Result<Self, LearningError> {
        let raw = fs::read(path).map_err(|source| LearningError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&raw).map_err(|source| LearningError::Artifact {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write to a sibling temp file, fsync, then rename over `path` so readers
    /// never observe a partial artifact.
    pub fn save(&self, path: &Path) -> Result<(), LearningError> {
        let io_error = |source| LearningError::Io {
            path: path.to_path_buf(),
            source,
        };
        let bytes = serde_json::to_vec_pretty(self).map_err(LearningError::Serialize)?;

        let parent = match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            Some(parent) => parent.to_path_buf(),
            None => std::path::PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(io_error)?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        let sequence = SAVE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let temp_path = parent.join(format!(".{file_name}.tmp.{}.{sequence}", std::process::id()));

        let written = fs::File::create(&temp_path).and_then(|mut file| {
            file.write_all(&bytes)?;
            file.sync_all()
        });
        if let Err(source) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(io_error(source));
        }

        fs::rename(&temp_path, path).map_err(io_error)?;
        if let Ok(dir) = fs::File::open(&parent) {
            let _ = dir.sync_all();
        }
        Ok(())
    }
}
