use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the review tooling.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub telemetry: TelemetryConfig,
    pub storage: StorageConfig,
    pub collectors: CollaboratorConfig,
    pub batch_workers: usize,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("REVIEW_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let log_level = env::var("REVIEW_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let feedback_path = env::var("REVIEW_FEEDBACK_PATH")
            .unwrap_or_else(|_| "data/review_feedback.jsonl".to_string());
        let model_path = env::var("REVIEW_MODEL_PATH")
            .unwrap_or_else(|_| "models/self_learning_model.json".to_string());

        let timeout_secs = env::var("REVIEW_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "6".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidTimeout)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        let batch_workers = env::var("REVIEW_BATCH_WORKERS")
            .unwrap_or_else(|_| "4".to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidWorkers)?;
        if batch_workers == 0 {
            return Err(ConfigError::InvalidWorkers);
        }

        let collectors = CollaboratorConfig {
            page_timeout: Duration::from_secs(timeout_secs),
            api_timeout: Duration::from_secs(timeout_secs + 2),
            scamadviser_url: optional_var("SCAMADVISER_API_URL"),
            scamadviser_key: optional_var("SCAMADVISER_API_KEY"),
            scamadviser_url_param: optional_var("SCAMADVISER_URL_PARAM")
                .unwrap_or_else(|| "url".to_string()),
            linkedin_url: optional_var("LINKEDIN_API_URL"),
            linkedin_token: optional_var("LINKEDIN_ACCESS_TOKEN"),
            opencorporates_token: optional_var("OPENCORPORATES_API_TOKEN"),
            ml_risk_url: optional_var("ML_RISK_API_URL"),
            ml_risk_key: optional_var("ML_RISK_API_KEY"),
            toolkit_url: optional_var("FRAUD_TOOLKIT_URL"),
        };

        Ok(Self {
            environment,
            telemetry: TelemetryConfig { log_level },
            storage: StorageConfig {
                feedback_path: PathBuf::from(feedback_path),
                model_path: PathBuf::from(model_path),
            },
            collectors,
            batch_workers,
        })
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Locations of the feedback log and the classifier artifact.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub feedback_path: PathBuf,
    pub model_path: PathBuf,
}

/// Credentials, endpoints, and timeouts handed to every external collaborator.
///
/// A missing endpoint or credential is reported by the collaborator as a
/// not-configured outcome rather than silently skipped.
#[derive(Debug, Clone)]
pub struct CollaboratorConfig {
    pub page_timeout: Duration,
    pub api_timeout: Duration,
    pub scamadviser_url: Option<String>,
    pub scamadviser_key: Option<String>,
    pub scamadviser_url_param: String,
    pub linkedin_url: Option<String>,
    pub linkedin_token: Option<String>,
    pub opencorporates_token: Option<String>,
    pub ml_risk_url: Option<String>,
    pub ml_risk_key: Option<String>,
    pub toolkit_url: Option<String>,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            page_timeout: Duration::from_secs(6),
            api_timeout: Duration::from_secs(8),
            scamadviser_url: None,
            scamadviser_key: None,
            scamadviser_url_param: "url".to_string(),
            linkedin_url: None,
            linkedin_token: None,
            opencorporates_token: None,
            ml_risk_url: None,
            ml_risk_key: None,
            toolkit_url: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidTimeout,
    InvalidWorkers,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidTimeout => {
                write!(f, "REVIEW_HTTP_TIMEOUT_SECS must be a positive integer")
            }
            ConfigError::InvalidWorkers => {
                write!(f, "REVIEW_BATCH_WORKERS must be a positive integer")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "REVIEW_ENV",
            "REVIEW_LOG_LEVEL",
            "REVIEW_FEEDBACK_PATH",
            "REVIEW_MODEL_PATH",
            "REVIEW_HTTP_TIMEOUT_SECS",
            "REVIEW_BATCH_WORKERS",
            "SCAMADVISER_API_URL",
            "SCAMADVISER_API_KEY",
            "SCAMADVISER_URL_PARAM",
            "LINKEDIN_API_URL",
            "LINKEDIN_ACCESS_TOKEN",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(
            config.storage.feedback_path,
            PathBuf::from("data/review_feedback.jsonl")
        );
        assert_eq!(config.collectors.page_timeout, Duration::from_secs(6));
        assert_eq!(config.collectors.scamadviser_url_param, "url");
        assert_eq!(config.batch_workers, 4);
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("SCAMADVISER_API_URL", "   ");
        env::set_var("LINKEDIN_ACCESS_TOKEN", "token-123");
        let config = AppConfig::load().expect("config loads");
        assert!(config.collectors.scamadviser_url.is_none());
        assert_eq!(config.collectors.linkedin_token.as_deref(), Some("token-123"));
        reset_env();
    }

    #[test]
    fn rejects_zero_timeout() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("REVIEW_HTTP_TIMEOUT_SECS", "0");
        let err = AppConfig::load().expect_err("zero timeout rejected");
        assert!(matches!(err, ConfigError::InvalidTimeout));
        reset_env();
    }
}
