use thiserror::Error;

/// The only condition that aborts a pipeline run. Every other anomaly
/// (bad dates, empty weeks, malformed email blocks) degrades to a default.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
