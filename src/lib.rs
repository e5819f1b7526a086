//! # SPAREPART Core Rust
//!
//! Rust implementation of the renumbering workflow engine for the SPAREPART
//! wagon fleet tooling.
//!
//! ## Overview
//!
//! The crate drives multi-step change procedures against the ERP MI API to
//! relabel a wagon and its installed components with new identifiers. It is
//! designed to complement the FastAPI SPAREPART apps: they own the HTTP
//! surface, report generation and data-warehouse loads, while this core
//! handles the failure-tolerant workflow execution - per-step idempotency,
//! partial-failure recording and resumable interrupted runs.
//!
//! ## Architecture
//!
//! - [`hierarchy`] - reconstructs the component tree of an asset from flat
//!   historical installation records and resolves each item's parent
//! - [`classify`] - maps raw MI responses onto the outcome taxonomy
//!   (success / async / already-done / blocking / error)
//! - [`steps`] - the fixed step catalogue with exhaustive per-step
//!   parameter mappings
//! - [`orchestration`] - step executor, pipeline orchestrator (forward and
//!   rollback) and the pollable job registry
//! - [`database`] - run state store with merge-on-reimport and the
//!   append-only operation log
//! - [`mi`] - MI REST client, `.ionapi` credentials, token acquisition
//!
//! ## Execution model
//!
//! A run executes sequentially on one spawned worker; the caller gets a job
//! id immediately and polls the registry. Item-level failures never abort a
//! run - they are recorded in the item's status column and the aggregate
//! counters. Re-running any step skips items whose status is already set,
//! which makes interrupted runs resumable without repeating completed work.

pub mod classify;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod hierarchy;
pub mod logging;
pub mod mi;
pub mod models;
pub mod orchestration;
pub mod steps;

pub use classify::{classify, Classification, Outcome};
pub use config::{DatabaseConfig, MiConfig, PipelineConfig, RetryConfig, SparepartConfig};
pub use database::{DatabaseConnection, RunStateStore};
pub use error::{Result, SparepartError};
pub use hierarchy::{HierarchySource, RawComponentRecord, RenumberTarget};
pub use mi::{MiClient, MiResponse, TransactionService};
pub use models::{OperationLogEntry, WorkItem};
pub use orchestration::{
    JobRegistry, JobState, JobStatus, PipelineOrchestrator, StepExecutor, StepOutcome,
};
pub use steps::{RunContext, StepDefinition};
