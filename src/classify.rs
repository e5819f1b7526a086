//! # Response Classification
//!
//! Maps a raw MI response onto the small outcome taxonomy the pipeline
//! works with. The rule order is significant: the async and idempotent
//! cases must be recognized *before* generic error scanning, because their
//! raw payloads are error-shaped (failed-transaction counters, error
//! fields) even though the business operation succeeded or is already in
//! the desired end-state.

use serde::{Deserialize, Serialize};

use crate::constants::{mi_codes, status};
use crate::mi::MiResponse;

/// Outcome taxonomy of one remote step invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Plain success
    Ok,
    /// Success; the state change completes asynchronously downstream
    OkAsync,
    /// The desired end-state already holds
    OkIdempotent,
    /// A manual precondition is unmet; not automatically retryable
    Blocking,
    /// Hard failure
    Error,
}

impl Outcome {
    /// Success-like outcomes let the pipeline proceed.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::OkAsync | Self::OkIdempotent)
    }
}

/// Classified response with the extracted business message.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub outcome: Outcome,
    pub code: String,
    pub message: String,
}

impl Classification {
    /// Whether this is one of the two idempotency-conflict responses that
    /// the rollback install fallback reacts to by trying the next parent
    /// candidate.
    pub fn is_conflict_pair(&self) -> bool {
        matches!(self.outcome, Outcome::OkIdempotent | Outcome::Blocking)
    }

    /// Status string persisted into the step's column.
    pub fn status_string(&self) -> String {
        match self.outcome {
            Outcome::Ok => status::OK.to_string(),
            Outcome::OkAsync => status::OK_ASYNC.to_string(),
            Outcome::OkIdempotent => status::OK_IDEMPOTENT.to_string(),
            Outcome::Blocking => format!("{}{}", status::BLOCKED_PREFIX, self.message),
            Outcome::Error => format!("{}{}", status::ERROR_PREFIX, self.message),
        }
    }
}

/// Classify one MI response.
pub fn classify(response: &MiResponse) -> Classification {
    let (code, message) = response.first_message().unwrap_or_default();
    let lowered = message.to_lowercase();

    if code == mi_codes::ASYNC_REMOVAL || lowered.contains(mi_codes::ASYNC_REMOVAL_TEXT) {
        return Classification {
            outcome: Outcome::OkAsync,
            code,
            message,
        };
    }
    if code == mi_codes::ALREADY_INSTALLED || lowered.contains(mi_codes::ALREADY_INSTALLED_TEXT) {
        return Classification {
            outcome: Outcome::OkIdempotent,
            code,
            message,
        };
    }
    if code == mi_codes::STATUS_80_BLOCK || lowered.contains(mi_codes::STATUS_80_TEXT) {
        return Classification {
            outcome: Outcome::Blocking,
            code,
            message,
        };
    }
    if response.has_error() {
        let text = if message.is_empty() {
            "MI transaction failed".to_string()
        } else {
            message
        };
        return Classification {
            outcome: Outcome::Error,
            code,
            message: text,
        };
    }

    Classification {
        outcome: Outcome::Ok,
        code,
        message,
    }
}
