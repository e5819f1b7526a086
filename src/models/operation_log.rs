//! # MI Operation Log
//!
//! Append-only record of every remote call attempt, success or failure,
//! dry-run or live. Written by the step executor, consumed by external
//! tooling; the core never reads it back.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One remote-call attempt.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OperationLogEntry {
    #[serde(default)]
    pub id: i64,
    pub logged_at: String,
    pub environment: String,
    pub step_name: String,
    pub hierarchy_path: String,
    pub asset_item: String,
    pub asset_serial: String,
    pub dry_run: bool,
    pub program: String,
    pub transaction: String,
    pub success: bool,
    pub error_text: Option<String>,
    /// Raw response JSON, absent for dry-run and transport failures
    pub raw_response: Option<String>,
}

impl OperationLogEntry {
    /// Build an entry stamped with the current time.
    #[allow(clippy::too_many_arguments)]
    pub fn now(
        environment: &str,
        step_name: &str,
        hierarchy_path: &str,
        asset_item: &str,
        asset_serial: &str,
        dry_run: bool,
        program: &str,
        transaction: &str,
        success: bool,
        error_text: Option<String>,
        raw_response: Option<String>,
    ) -> Self {
        Self {
            id: 0,
            logged_at: Utc::now().to_rfc3339(),
            environment: environment.to_string(),
            step_name: step_name.to_string(),
            hierarchy_path: hierarchy_path.to_string(),
            asset_item: asset_item.to_string(),
            asset_serial: asset_serial.to_string(),
            dry_run,
            program: program.to_string(),
            transaction: transaction.to_string(),
            success,
            error_text,
            raw_response,
        }
    }
}
