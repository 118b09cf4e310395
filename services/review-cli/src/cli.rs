use crate::learning::{
    run_add_feedback, run_auto_train, run_predict, run_train, AutoTrainArgs, FeedbackAddArgs,
    PredictArgs, TrainArgs,
};
use crate::review::{run_batch, run_review, BatchArgs, ReviewArgs};
use clap::{Parser, Subcommand};
use fraud_review::config::AppConfig;
use fraud_review::error::AppError;
use fraud_review::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "fraud-review",
    about = "Review onboarding accounts for fraud and maintain the self-learning model",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Review a single account JSON file and print the report
    Review(ReviewArgs),
    /// Review a .json, .jsonl, or .csv file and write a manual-review queue
    Batch(BatchArgs),
    /// Record reviewer outcomes and manage the self-learning model
    Feedback {
        #[command(subcommand)]
        command: FeedbackCommand,
    },
}

#[derive(Subcommand, Debug)]
enum FeedbackCommand {
    /// Append one human-confirmed verdict to the feedback store
    Add(FeedbackAddArgs),
    /// Train the model from every labeled feedback record
    Train(TrainArgs),
    /// Train only when enough new feedback has accumulated
    AutoTrain(AutoTrainArgs),
    /// Print the model's reject probability for an account
    Predict(PredictArgs),
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    tracing::debug!(environment = ?config.environment, "configuration loaded");

    match cli.command {
        Command::Review(args) => run_review(args, &config),
        Command::Batch(args) => run_batch(args, &config),
        Command::Feedback { command } => match command {
            FeedbackCommand::Add(args) => run_add_feedback(args, &config),
            FeedbackCommand::Train(args) => run_train(args, &config),
            FeedbackCommand::AutoTrain(args) => run_auto_train(args, &config),
            FeedbackCommand::Predict(args) => run_predict(args, &config),
        },
    }
}
