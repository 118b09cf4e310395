pub mod config;
pub mod error;
pub mod learning;
pub mod policy;
pub mod review;
pub mod telemetry;
