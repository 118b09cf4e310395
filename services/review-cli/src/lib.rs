mod cli;
mod infra;
mod learning;
mod review;

use fraud_review::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
