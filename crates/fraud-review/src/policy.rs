//! Named thresholds that drive the auto-gates and the manual-band verdict.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const DEFAULT_ML_AUTO_APPROVE: f64 = 30.0;
const DEFAULT_ML_AUTO_REJECT: f64 = 85.0;
const DEFAULT_CLOCK_MISMATCH_MINUTES: i64 = 60;
const DEFAULT_REJECT_RISK: i32 = 70;
const DEFAULT_APPROVE_RISK: i32 = 25;
const DEFAULT_APPROVE_POSITIVE_SIGNALS: i32 = 4;

/// Review policy. Every field is optional in the JSON file and falls back to
/// the documented default, so the engine also runs without any policy file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub ml_auto_approve_threshold: f64,
    pub ml_auto_reject_threshold: f64,
    pub clock_mismatch_minutes_threshold: i64,
    pub reject_risk_threshold: i32,
    pub approve_risk_threshold: i32,
    pub approve_positive_signals_threshold: i32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            ml_auto_approve_threshold: DEFAULT_ML_AUTO_APPROVE,
            ml_auto_reject_threshold: DEFAULT_ML_AUTO_REJECT,
            clock_mismatch_minutes_threshold: DEFAULT_CLOCK_MISMATCH_MINUTES,
            reject_risk_threshold: DEFAULT_REJECT_RISK,
            approve_risk_threshold: DEFAULT_APPROVE_RISK,
            approve_positive_signals_threshold: DEFAULT_APPROVE_POSITIVE_SIGNALS,
        }
    }
}

impl PolicyConfig {
    /// Parse a policy from JSON text and validate its thresholds.
    pub fn from_json(raw: &str) -> Result<Self, PolicyError> {
        let policy: PolicyConfig = serde_json::from_str(raw).map_err(PolicyError::Malformed)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load a policy file. `None` yields the defaults; a path that does not
    /// exist is an error rather than a silent fallback.
    pub fn load(path: Option<&Path>) -> Result<Self, PolicyError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        for (field, value) in [
            ("ml_auto_approve_threshold", self.ml_auto_approve_threshold),
            ("ml_auto_reject_threshold", self.ml_auto_reject_threshold),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(PolicyError::OutOfRange {
                    field,
                    value: value.to_string(),
                });
            }
        }

        if self.ml_auto_approve_threshold > self.ml_auto_reject_threshold {
            return Err(PolicyError::InvertedMlGates {
                approve: self.ml_auto_approve_threshold,
                reject: self.ml_auto_reject_threshold,
            });
        }

        if self.clock_mismatch_minutes_threshold < 0 {
            return Err(PolicyError::OutOfRange {
                field: "clock_mismatch_minutes_threshold",
                value: self.clock_mismatch_minutes_threshold.to_string(),
            });
        }

        if self.approve_positive_signals_threshold < 0 {
            return Err(PolicyError::OutOfRange {
                field: "approve_positive_signals_threshold",
                value: self.approve_positive_signals_threshold.to_string(),
            });
        }

        Ok(())
    }
}

/// Failure to load or validate a policy file.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read policy config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("policy config must be a JSON object of thresholds: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("policy field {field} has out-of-range value {value}")]
    OutOfRange { field: &'static str, value: String },
    #[error("ml_auto_approve_threshold ({approve}) must not exceed ml_auto_reject_threshold ({reject})")]
    InvertedMlGates { approve: f64, reject: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let policy = PolicyConfig::from_json("{}").expect("empty policy parses");
        assert_eq!(policy, PolicyConfig::default());
        assert_eq!(policy.reject_risk_threshold, 70);
        assert_eq!(policy.approve_positive_signals_threshold, 4);
    }

    #[test]
    fn partial_object_overrides_named_fields_only() {
        let policy = PolicyConfig::from_json(r#"{"reject_risk_threshold": 60, "ml_auto_approve_threshold": 20}"#)
            .expect("partial policy parses");
        assert_eq!(policy.reject_risk_threshold, 60);
        assert_eq!(policy.ml_auto_approve_threshold, 20.0);
        assert_eq!(policy.ml_auto_reject_threshold, 85.0);
    }

    #[test]
    fn non_object_payload_is_malformed() {
        let err = PolicyConfig::from_json("[1, 2, 3]").expect_err("arrays are rejected");
        assert!(matches!(err, PolicyError::Malformed(_)));
    }

    #[test]
    fn inverted_gates_are_rejected() {
        let err = PolicyConfig::from_json(
            r#"{"ml_auto_approve_threshold": 90, "ml_auto_reject_threshold": 80}"#,
        )
        .expect_err("inverted gates rejected");
        assert!(err.to_string().contains("must not exceed"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = PolicyConfig::load(Some(Path::new("/nonexistent/fraud_policy.json")))
            .expect_err("missing file is reported");
        assert!(matches!(err, PolicyError::Io { .. }));
    }

    #[test]
    fn no_path_uses_defaults() {
        let policy = PolicyConfig::load(None).expect("defaults load");
        assert_eq!(policy, PolicyConfig::default());
    }
}
