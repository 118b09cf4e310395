//! Batch reviews: read many accounts, review them on a bounded worker pool,
//! and emit a flat queue table for the manual-review team.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::service::ReviewService;

/// Verdict column value for rows that could not be reviewed.
pub const INPUT_ERROR_VERDICT: &str = "Input Error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchFormat {
    Json,
    JsonLines,
    Csv,
}

impl BatchFormat {
    pub fn from_path(path: &Path) -> Result<Self, BatchError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Ok(BatchFormat::Json),
            "jsonl" | "ndjson" => Ok(BatchFormat::JsonLines),
            "csv" => Ok(BatchFormat::Csv),
            _ => Err(BatchError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Failure reading or writing a batch file.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported batch input {} (expected .json, .jsonl, or .csv)", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("JSON input must be an object or an array of objects")]
    NotAnObject,
    #[error("invalid JSON on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid CSV input: {0}")]
    Csv(#[from] csv::Error),
}

pub fn read_accounts(path: &Path) -> Result<Vec<Value>, BatchError> {
    let format = BatchFormat::from_path(path)?;
    let file = File::open(path).map_err(|source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_accounts(format, BufReader::new(file))
}

/// Parse account payloads. Non-object JSON array entries are skipped.
pub fn parse_accounts<R: BufRead>(format: BatchFormat, reader: R) -> Result<Vec<Value>, BatchError> {
    match format {
        BatchFormat::Json => parse_json(reader),
        BatchFormat::JsonLines => parse_json_lines(reader),
        BatchFormat::Csv => parse_csv(reader),
    }
}

fn parse_json<R: Read>(reader: R) -> Result<Vec<Value>, BatchError> {
    let payload: Value =
        serde_json::from_reader(reader).map_err(|source| BatchError::Json { line: 1, source })?;
    match payload {
        Value::Object(_) => Ok(vec![payload]),
        Value::Array(items) => Ok(items.into_iter().filter(Value::is_object).collect()),
        _ => Err(BatchError::NotAnObject),
    }
}

fn parse_json_lines<R: BufRead>(reader: R) -> Result<Vec<Value>, BatchError> {
    let mut accounts = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| BatchError::Io {
            path: PathBuf::from("<jsonl input>"),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(trimmed).map_err(|source| BatchError::Json {
            line: index + 1,
            source,
        })?;
        if value.is_object() {
            accounts.push(value);
        }
    }
    Ok(accounts)
}

fn split_multi(raw: &str) -> Vec<String> {
    raw.split('|')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_csv<R: Read>(reader: R) -> Result<Vec<Value>, BatchError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut accounts = Vec::new();

    for record in csv_reader.deserialize::<BTreeMap<String, String>>() {
        let row = record?;
        let network_country = row.get("network_country").cloned().unwrap_or_default();
        let mut object = Map::new();
        for (key, value) in row {
            let converted = match key.as_str() {
                "item_urls" => Value::from(split_multi(&value)),
                "ip_addresses" => Value::Array(
                    split_multi(&value)
                        .into_iter()
                        .map(|ip| serde_json::json!({"ip": ip, "country": network_country}))
                        .collect(),
                ),
                _ => Value::String(value),
            };
            object.insert(key, converted);
        }
        accounts.push(Value::Object(object));
    }
    Ok(accounts)
}

/// One line of the manual-review queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueRow {
    pub row_id: usize,
    pub name: String,
    pub email: String,
    pub company_name: String,
    pub ml_score: String,
    pub verdict: String,
    pub confidence_score: String,
    pub confidence_level: String,
    pub tags: String,
    pub final_reason: String,
}

fn source_field(source: &Value, key: &str) -> String {
    match source.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn review_row(service: &ReviewService, row_id: usize, source: Value) -> QueueRow {
    let mut row = QueueRow {
        row_id,
        name: source_field(&source, "name"),
        email: source_field(&source, "email"),
        company_name: source_field(&source, "company_name"),
        ml_score: source_field(&source, "ml_score"),
        verdict: String::new(),
        confidence_score: String::new(),
        confidence_level: String::new(),
        tags: String::new(),
        final_reason: String::new(),
    };

    match service.review_value(source) {
        Ok(result) => {
            row.verdict = result.verdict.label().to_string();
            row.confidence_score = result.confidence_score().to_string();
            row.confidence_level = result.confidence_level().label().to_string();
            row.tags = result.tags.join("|");
            row.final_reason = result.decision_summary.final_reason;
        }
        Err(error) => {
            tracing::warn!(row_id, %error, "batch row failed review");
            row.verdict = INPUT_ERROR_VERDICT.to_string();
            row.final_reason = error.to_string();
        }
    }
    row
}

/// Review every account on `workers` threads. Rows are numbered from 1 and
/// returned in input order regardless of completion order.
pub fn review_batch(service: &ReviewService, accounts: Vec<Value>, workers: usize) -> Vec<QueueRow> {
    let workers = workers.clamp(1, accounts.len().max(1));
    let total = accounts.len();
    let (job_tx, job_rx) = crossbeam_channel::bounded::<(usize, Value)>(workers * 2);
    let (row_tx, row_rx) = crossbeam_channel::unbounded::<QueueRow>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let jobs = job_rx.clone();
            let rows = row_tx.clone();
            scope.spawn(move || {
                for (row_id, payload) in jobs {
                    if rows.send(review_row(service, row_id, payload)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(job_rx);
        drop(row_tx);

        for (index, payload) in accounts.into_iter().enumerate() {
            if job_tx.send((index + 1, payload)).is_err() {
                break;
            }
        }
        drop(job_tx);
    });

    let mut rows: Vec<QueueRow> = row_rx.into_iter().collect();
    rows.sort_by_key(|row| row.row_id);
    tracing::info!(total, reviewed = rows.len(), workers, "batch review finished");
    rows
}

pub const QUEUE_COLUMNS: [&str; 10] = [
    "row_id",
    "name",
    "email",
    "company_name",
    "ml_score",
    "verdict",
    "confidence_score",
    "confidence_level",
    "tags",
    "final_reason",
];

/// Header is always written, even for an empty batch.
pub fn write_queue<W: Write>(rows: &[QueueRow], writer: W) -> Result<(), BatchError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(QUEUE_COLUMNS)?;
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush().map_err(|source| BatchError::Io {
        path: PathBuf::from("<queue output>"),
        source,
    })?;
    Ok(())
}

/// Write the queue CSV, creating parent directories as needed.
pub fn write_queue_file(path: &Path, rows: &[QueueRow]) -> Result<(), BatchError> {
    let io_error = |source| BatchError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let file = File::create(path).map_err(io_error)?;
    write_queue(rows, file)
}
