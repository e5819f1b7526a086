//! # Pipeline Steps
//!
//! The fixed catalogue of remote operations a renumbering run is composed
//! of. Every step is one variant of [`StepDefinition`] with an exhaustively
//! enumerated parameter mapping - there is no dynamic field discovery, and
//! adding a step means adding a variant the compiler checks everywhere.

pub mod definition;
pub mod params;

use serde::{Deserialize, Serialize};

pub use definition::{ExtractSpec, StepDefinition};

/// Run-level context threaded through parameter building and execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    /// Target environment, `live` or `test`
    pub environment: String,
    /// Exercise the pipeline without remote calls
    pub dry_run: bool,
    /// Effective date of the change, `YYYYMMDD`; required by the terminal
    /// remove/install steps
    pub change_date: Option<String>,
    /// Whether this run renames the wagon itself (enables the wagon-level
    /// master-data steps)
    pub renumber_wagon: bool,
}

impl RunContext {
    pub fn new(environment: &str, dry_run: bool) -> Self {
        Self {
            environment: environment.to_string(),
            dry_run,
            change_date: None,
            renumber_wagon: true,
        }
    }
}
