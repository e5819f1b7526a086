//! # Error Types
//!
//! Structured error handling for the renumbering core using thiserror
//! instead of `Box<dyn Error>` patterns.
//!
//! The taxonomy mirrors how failures propagate through a run:
//!
//! - [`SparepartError::Validation`] - a required field is missing before any
//!   remote call is issued. Never retried; recorded on the owning work item.
//! - [`SparepartError::Remote`] - transport/HTTP failure talking to the MI
//!   service. Retried only for designated steps, otherwise terminal for the
//!   item/step.
//! - [`SparepartError::BusinessConflict`] - the remote system reports a
//!   blocking precondition or an idempotency conflict. Terminal unless the
//!   rollback fallback applies.
//! - [`SparepartError::Infrastructure`] - credentials/environment cannot be
//!   resolved. Aborts the whole run; partial state stays persisted.
//!
//! Item/step-level errors are folded into status strings and never raise out
//! of the step executor. Only infrastructure errors terminate a run.

use thiserror::Error;

/// Error taxonomy for the renumbering core
#[derive(Error, Debug)]
pub enum SparepartError {
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Remote MI error: {program}/{transaction}: {message}")]
    Remote {
        program: String,
        transaction: String,
        message: String,
    },

    #[error("Business conflict: {message}")]
    BusinessConflict { message: String },

    #[error("Infrastructure error: {message}")]
    Infrastructure { message: String },

    #[error("Database error: {operation}: {message}")]
    Database { operation: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Job not found: {job_id}")]
    JobNotFound { job_id: String },
}

impl SparepartError {
    /// Create a validation error for a missing or malformed work-item field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a remote transaction error
    pub fn remote(
        program: impl Into<String>,
        transaction: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Remote {
            program: program.into(),
            transaction: transaction.into(),
            message: message.into(),
        }
    }

    /// Create a business conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::BusinessConflict {
            message: message.into(),
        }
    }

    /// Create an infrastructure error
    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::Infrastructure {
            message: message.into(),
        }
    }

    /// Create a database error
    pub fn database(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Database {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error aborts a whole pipeline run instead of a single
    /// item/step. Everything except infrastructure, database and
    /// configuration failures is recorded per item and the run continues.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::Infrastructure { .. } | Self::Database { .. } | Self::Configuration { .. }
        )
    }
}

impl From<sqlx::Error> for SparepartError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            operation: "sqlx".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for SparepartError {
    fn from(err: reqwest::Error) -> Self {
        Self::Remote {
            program: String::new(),
            transaction: String::new(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SparepartError>;
