use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use fraud_review::config::AppConfig;
use fraud_review::error::AppError;
use fraud_review::learning::SelfLearningCheck;
use fraud_review::policy::PolicyConfig;
use fraud_review::review::collectors::advanced::{AdvancedCheckOptions, AdvancedCheckSuite};
use fraud_review::review::collectors::toolkit::ToolkitCheck;
use fraud_review::review::collectors::HttpClient;
use fraud_review::review::{DecisionEngine, ReviewService, Verdict};
use serde::Serialize;
use serde_json::Value;

/// Collaborator switches shared by `review` and `batch`.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct ReviewOptions {
    /// Policy JSON file; defaults apply when omitted
    #[arg(long)]
    pub(crate) policy: Option<PathBuf>,
    /// Disable live URL inspection when network access is restricted
    #[arg(long)]
    pub(crate) no_web_checks: bool,
    /// Enable every advanced external check
    #[arg(long)]
    pub(crate) use_advanced_checks: bool,
    #[arg(long)]
    pub(crate) enable_scamadviser: bool,
    #[arg(long)]
    pub(crate) enable_linkedin: bool,
    #[arg(long)]
    pub(crate) enable_ssl: bool,
    #[arg(long)]
    pub(crate) enable_social: bool,
    #[arg(long)]
    pub(crate) enable_registry: bool,
    /// Query the external ML risk API
    #[arg(long)]
    pub(crate) enable_ml: bool,
    /// Query the fraud-intelligence toolkit
    #[arg(long)]
    pub(crate) use_toolkit: bool,
    /// Add the self-learning model's reject probability as a signal
    #[arg(long)]
    pub(crate) use_self_learning: bool,
    /// Model artifact path (defaults to REVIEW_MODEL_PATH)
    #[arg(long)]
    pub(crate) model_path: Option<PathBuf>,
}

impl ReviewOptions {
    fn advanced(&self) -> AdvancedCheckOptions {
        let all = self.use_advanced_checks;
        AdvancedCheckOptions {
            scamadviser: all || self.enable_scamadviser,
            linkedin: all || self.enable_linkedin,
            ssl: all || self.enable_ssl,
            social: all || self.enable_social,
            registry: all || self.enable_registry,
            ml: all || self.enable_ml,
        }
    }
}

pub(crate) fn build_service(options: &ReviewOptions, config: &AppConfig) -> Result<ReviewService, AppError> {
    let policy = PolicyConfig::load(options.policy.as_deref())?;
    let mut service = ReviewService::new(DecisionEngine::new(policy));

    if !options.no_web_checks {
        service = service.with_fetcher(Arc::new(HttpClient::new(config.collectors.page_timeout)));
    }

    let advanced = options.advanced();
    if advanced.any() {
        service = service.with_check(Box::new(AdvancedCheckSuite::from_config(
            &config.collectors,
            advanced,
        )));
    }
    if options.use_toolkit {
        service = service.with_check(Box::new(ToolkitCheck::from_config(&config.collectors)));
    }
    if options.use_self_learning {
        service = service.with_check(Box::new(SelfLearningCheck::new(model_path(
            options.model_path.as_deref(),
            config,
        ))));
    }

    tracing::debug!(
        web_checks = !options.no_web_checks,
        checks = ?service.check_names(),
        "review service assembled"
    );
    Ok(service)
}

pub(crate) fn model_path(explicit: Option<&Path>, config: &AppConfig) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.storage.model_path.clone())
}

/// Read a JSON document from `path`, or from stdin when `path` is `-`.
pub(crate) fn read_json(path: &Path) -> Result<Value, AppError> {
    let raw = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn read_json_object(path: &Path) -> Result<Value, AppError> {
    let value = read_json(path)?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(AppError::Input(format!(
            "{} must contain a JSON object",
            path.display()
        )))
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn parse_verdict(raw: &str) -> Result<Verdict, String> {
    raw.parse::<Verdict>().map_err(|err| {
        let choices: Vec<&str> = Verdict::ALL.iter().map(|verdict| verdict.label()).collect();
        format!("{err}; expected one of: {}", choices.join(", "))
    })
}
