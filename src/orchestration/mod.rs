//! # Renumbering Orchestration
//!
//! The execution engine of the crate: the step executor performs one remote
//! operation for one work item, the pipeline orchestrator drives the
//! ordered step sequence (or its rollback inverse) over the whole item set
//! on a background worker, and the job registry hands out pollable handles.
//!
//! ## Execution model
//!
//! One run = one spawned task. Within a run, execution is strictly
//! sequential: later steps consume values generated by earlier steps of the
//! same item, and the remote ERP serializes structure changes anyway. Runs
//! on different assets (or different environments) may execute
//! concurrently; they touch disjoint rows. There is no cancellation - a
//! started run proceeds to completion or to an infrastructure abort, and
//! callers only observe progress through the job registry.

pub mod jobs;
pub mod pipeline;
pub mod step_executor;

pub use jobs::{ItemResult, JobRegistry, JobState, JobStatus};
pub use pipeline::PipelineOrchestrator;
pub use step_executor::{StepExecutor, StepOutcome};
