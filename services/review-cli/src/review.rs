use std::path::PathBuf;

use clap::Args;
use fraud_review::config::AppConfig;
use fraud_review::error::AppError;
use fraud_review::review::{format_report, read_accounts, review_batch, write_queue_file};

use crate::infra::{build_service, print_json, read_json_object, ReviewOptions};

#[derive(Args, Debug)]
pub(crate) struct ReviewArgs {
    /// Account summary JSON file (`-` for stdin)
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Print the raw decision as JSON instead of the markdown report
    #[arg(long)]
    pub(crate) json: bool,
    #[command(flatten)]
    pub(crate) options: ReviewOptions,
}

#[derive(Args, Debug)]
pub(crate) struct BatchArgs {
    /// Accounts as .json, .jsonl, or .csv
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Destination of the manual-review queue CSV
    #[arg(long)]
    pub(crate) output: PathBuf,
    /// Worker threads (defaults to REVIEW_BATCH_WORKERS)
    #[arg(long)]
    pub(crate) workers: Option<usize>,
    #[command(flatten)]
    pub(crate) options: ReviewOptions,
}

pub(crate) fn run_review(args: ReviewArgs, config: &AppConfig) -> Result<(), AppError> {
    let service = build_service(&args.options, config)?;
    let payload = read_json_object(&args.input)?;
    let result = service.review_value(payload)?;

    if args.json {
        print_json(&result)
    } else {
        println!("{}", format_report(&result));
        Ok(())
    }
}

pub(crate) fn run_batch(args: BatchArgs, config: &AppConfig) -> Result<(), AppError> {
    let service = build_service(&args.options, config)?;
    let accounts = read_accounts(&args.input)?;
    let workers = args.workers.unwrap_or(config.batch_workers).max(1);

    let rows = review_batch(&service, accounts, workers);
    write_queue_file(&args.output, &rows)?;

    let failed = rows
        .iter()
        .filter(|row| row.verdict == fraud_review::review::batch::INPUT_ERROR_VERDICT)
        .count();
    tracing::info!(rows = rows.len(), failed, output = %args.output.display(), "queue written");
    println!("Processed {} account(s) -> {}", rows.len(), args.output.display());
    Ok(())
}
