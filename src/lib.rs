//! Weekly insight digest over app-store reviews: clean, bucket by ISO week,
//! classify, aggregate per theme, write a bounded note and pull the email
//! fields out of its trailing block.

pub mod classify;
pub mod clean;
pub mod combine;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod pulse;
pub mod redact;
pub mod report;
pub mod sample;
pub mod select;
pub mod stats;

pub use error::PipelineError;
pub use models::PipelineOutput;
pub use pipeline::Pipeline;
