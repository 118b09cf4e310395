//! Append-only NDJSON log of reviewer-confirmed outcomes.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::LearningError;
use crate::review::{DecisionContext, Verdict};

/// Serializes appends from every store handle in the process.
static APPEND_LOCK: Mutex<()> = Mutex::new(());

/// Where a feedback record came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackMetadata {
    pub source: Option<String>,
    pub review_id: Option<String>,
}

/// One human-confirmed review outcome. Never mutated after it is written.
///
/// Reads are lenient: a `null` or mistyped field falls back to its default so
/// one odd line in the append-only log cannot block training forever.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    #[serde(default)]
    pub account: Value,
    #[serde(default, deserialize_with = "lenient_verdict")]
    pub final_verdict: String,
    #[serde(default)]
    pub context: Value,
    #[serde(default, deserialize_with = "or_default")]
    pub metadata: FeedbackMetadata,
    #[serde(default, deserialize_with = "or_default")]
    pub reviewed_at_utc: DateTime<Utc>,
}

fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).unwrap_or_default())
}

fn lenient_verdict<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(verdict) => verdict,
        other => other.to_string(),
    })
}

impl FeedbackRecord {
    pub fn new(
        account: Value,
        final_verdict: Verdict,
        context: &DecisionContext,
        metadata: FeedbackMetadata,
        reviewed_at_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            account,
            final_verdict: final_verdict.label().to_string(),
            context: serde_json::to_value(context).unwrap_or(Value::Null),
            metadata,
            reviewed_at_utc,
        }
    }

    /// Binary training label, or `None` when the verdict was left blank.
    pub fn label(&self) -> Result<Option<u8>, LearningError> {
        let verdict = self.final_verdict.trim();
        if verdict.is_empty() {
            return Ok(None);
        }
        label_for(verdict).map(Some)
    }
}

/// `Reject` is the positive class; every other known verdict is 0.
pub fn label_for(verdict: &str) -> Result<u8, LearningError> {
    let parsed: Verdict = verdict
        .parse()
        .map_err(|_| LearningError::UnknownLabel(verdict.to_string()))?;
    Ok(u8::from(parsed == Verdict::Reject))
}

#[derive(Debug, Clone)]
pub struct FeedbackStore {
    path: PathBuf,
}

impl FeedbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Append one record as a single line with one `write_all`.
    pub fn append(&self, record: &FeedbackRecord) -> Result<(), LearningError> {
        let mut line = serde_json::to_vec(record).map_err(LearningError::Serialize)?;
        line.push(b'\n');

        let _guard = APPEND_LOCK.lock();
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;
        file.write_all(&line).map_err(|source| self.io_error(source))?;
        file.flush().map_err(|source| self.io_error(source))?;

        tracing::debug!(path = %self.path.display(), verdict = %record.final_verdict, "feedback appended");
        Ok(())
    }

    /// Every record in file order; blank lines are skipped. A line holding
    /// valid JSON that is not an object reads as an empty record, which
    /// training skips for its blank verdict.
    pub fn read_all(&self) -> Result<Vec<FeedbackRecord>, LearningError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                let parse_error = |source| LearningError::Parse {
                    path: self.path.clone(),
                    line: index + 1,
                    source,
                };
                match serde_json::from_str::<Value>(line).map_err(parse_error)? {
                    value @ Value::Object(_) => serde_json::from_value(value).map_err(parse_error),
                    _ => Ok(FeedbackRecord::default()),
                }
            })
            .collect()
    }

    /// Number of non-blank lines, the watermark used by the retraining gate.
    pub fn count_lines(&self) -> Result<usize, LearningError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| self.io_error(source))?;
        Ok(raw.lines().filter(|line| !line.trim().is_empty()).count())
    }

    fn io_error(&self, source: std::io::Error) -> LearningError {
        LearningError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
