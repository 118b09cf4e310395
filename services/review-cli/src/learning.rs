use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Args;
use fraud_review::config::AppConfig;
use fraud_review::error::AppError;
use fraud_review::learning::{
    auto_train, predict_reject_probability, train_from_feedback, FeatureVector,
    FeedbackMetadata, FeedbackRecord, FeedbackStore, DEFAULT_MIN_NEW_RECORDS,
};
use fraud_review::policy::PolicyConfig;
use fraud_review::review::{AccountSummary, DecisionContext, DecisionEngine, Verdict};
use serde_json::{json, Value};

use crate::infra::{model_path, parse_verdict, print_json, read_json_object};

#[derive(Args, Debug)]
pub(crate) struct FeedbackAddArgs {
    /// Account summary JSON that was reviewed
    #[arg(long)]
    pub(crate) account: PathBuf,
    /// Verdict confirmed by the human reviewer
    #[arg(long, value_parser = parse_verdict)]
    pub(crate) final_verdict: Verdict,
    /// Feedback JSONL (defaults to REVIEW_FEEDBACK_PATH)
    #[arg(long)]
    pub(crate) feedback_data: Option<PathBuf>,
    /// Decision context JSON; recomputed from the account when omitted
    #[arg(long)]
    pub(crate) context: Option<PathBuf>,
    #[arg(long, default_value = "manual-review")]
    pub(crate) source: String,
    #[arg(long)]
    pub(crate) review_id: Option<String>,
    /// Policy used when the context has to be recomputed
    #[arg(long)]
    pub(crate) policy: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct TrainArgs {
    #[arg(long)]
    pub(crate) feedback_data: Option<PathBuf>,
    #[arg(long)]
    pub(crate) model_path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct AutoTrainArgs {
    #[arg(long)]
    pub(crate) feedback_data: Option<PathBuf>,
    #[arg(long)]
    pub(crate) model_path: Option<PathBuf>,
    /// New feedback lines required since the last training run
    #[arg(long, default_value_t = DEFAULT_MIN_NEW_RECORDS)]
    pub(crate) min_new_records: usize,
}

#[derive(Args, Debug)]
pub(crate) struct PredictArgs {
    #[arg(long)]
    pub(crate) account: PathBuf,
    /// Decision context JSON; empty context when omitted
    #[arg(long)]
    pub(crate) context: Option<PathBuf>,
    #[arg(long)]
    pub(crate) model_path: Option<PathBuf>,
}

fn feedback_store(explicit: Option<&Path>, config: &AppConfig) -> FeedbackStore {
    FeedbackStore::new(
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.storage.feedback_path.clone()),
    )
}

fn load_context(
    path: Option<&Path>,
    account: &Value,
    policy: Option<&Path>,
) -> Result<DecisionContext, AppError> {
    if let Some(path) = path {
        return Ok(serde_json::from_value(read_json_object(path)?)?);
    }
    let summary = AccountSummary::from_value(account.clone())?;
    let engine = DecisionEngine::new(PolicyConfig::load(policy)?);
    Ok(engine.base_context(&summary, None)?)
}

pub(crate) fn run_add_feedback(args: FeedbackAddArgs, config: &AppConfig) -> Result<(), AppError> {
    let account = read_json_object(&args.account)?;
    let context = load_context(args.context.as_deref(), &account, args.policy.as_deref())?;
    let store = feedback_store(args.feedback_data.as_deref(), config);

    let record = FeedbackRecord::new(
        account,
        args.final_verdict,
        &context,
        FeedbackMetadata {
            source: Some(args.source),
            review_id: args.review_id,
        },
        Utc::now(),
    );
    store.append(&record)?;

    print_json(&json!({
        "status": "recorded",
        "feedback_path": store.path(),
        "final_verdict": args.final_verdict.label(),
    }))
}

pub(crate) fn run_train(args: TrainArgs, config: &AppConfig) -> Result<(), AppError> {
    let store = feedback_store(args.feedback_data.as_deref(), config);
    let model = model_path(args.model_path.as_deref(), config);
    let report = train_from_feedback(&store, &model)?;
    print_json(&report)
}

pub(crate) fn run_auto_train(args: AutoTrainArgs, config: &AppConfig) -> Result<(), AppError> {
    let store = feedback_store(args.feedback_data.as_deref(), config);
    let model = model_path(args.model_path.as_deref(), config);
    let outcome = auto_train(&store, &model, args.min_new_records)?;
    print_json(&outcome)
}

pub(crate) fn run_predict(args: PredictArgs, config: &AppConfig) -> Result<(), AppError> {
    let account = read_json_object(&args.account)?;
    let context = match args.context.as_deref() {
        Some(path) => read_json_object(path)?,
        None => Value::Object(Default::default()),
    };
    let model = model_path(args.model_path.as_deref(), config);
    let features = FeatureVector::from_raw(&account, &context);
    print_json(&predict_reject_probability(&model, &features))
}
