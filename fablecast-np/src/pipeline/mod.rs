//! Narration pipeline: job model and orchestrator.

pub mod job;
pub mod orchestrator;

pub use job::{JobMode, JobOptions, JobStage, NarrationJob, PipelineEvent};
pub use orchestrator::Orchestrator;
