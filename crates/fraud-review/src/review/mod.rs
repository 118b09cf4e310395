//! Account fraud review: signal normalization, external collection, and the
//! decision engine that turns both into a verdict with a rationale.

pub mod batch;
pub mod collectors;
pub mod domain;
pub mod evaluation;
pub mod service;
pub mod signals;

#[cfg(test)]
mod tests;

pub use batch::{
    parse_accounts, read_accounts, review_batch, write_queue, write_queue_file, BatchError,
    BatchFormat, QueueRow,
};
pub use collectors::{
    CheckOutcome, CheckRequest, CollaboratorError, ExternalCheck, PageFetcher, SignalFinding,
};
pub use domain::{
    AccountSummary, ConfidenceLevel, DecisionAnalysis, DecisionContext, DecisionDebug,
    DecisionResult, DecisionSummary, IpObservation, ReviewError, ScoreComponent, SignalGroup,
    UnknownVerdict, Verdict,
};
pub use evaluation::{decide, format_report, DecisionEngine, ExternalSignals};
pub use service::ReviewService;
