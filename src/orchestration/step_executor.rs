//! # Step Executor
//!
//! Performs one named remote operation for one work item: builds the
//! parameter set, applies dry-run short-circuiting, invokes the MI service,
//! classifies the result, persists the outcome and applies the bounded
//! retry policy for steps whose result depends on asynchronous downstream
//! propagation.
//!
//! ## Failure semantics
//!
//! The executor never raises item-level failures: validation errors,
//! transport errors and business conflicts all come back as a
//! [`StepOutcome`] and land in the item's status column. Only database
//! failures (persisting the outcome) propagate, since losing the status
//! record would break resumability.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

use crate::classify::{classify, Outcome};
use crate::config::PipelineConfig;
use crate::constants::{status, DRY_RUN_PLACEHOLDER};
use crate::database::RunStateStore;
use crate::error::{Result, SparepartError};
use crate::logging::log_mi_operation;
use crate::mi::TransactionService;
use crate::models::{OperationLogEntry, WorkItem};
use crate::steps::{RunContext, StepDefinition};

/// Transient result of one step execution for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub ok: bool,
    pub classification: Outcome,
    pub message: String,
    pub extracted_value: Option<String>,
}

impl StepOutcome {
    fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            classification: Outcome::Error,
            message: message.into(),
            extracted_value: None,
        }
    }
}

/// Executes single steps against the MI service and the run state store.
pub struct StepExecutor {
    service: Arc<dyn TransactionService>,
    store: Arc<RunStateStore>,
    config: PipelineConfig,
}

impl StepExecutor {
    pub fn new(
        service: Arc<dyn TransactionService>,
        store: Arc<RunStateStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            service,
            store,
            config,
        }
    }

    /// Execute one step for one item and persist the outcome.
    ///
    /// The returned outcome is already folded into the item's status column
    /// (and value/timestamp columns where applicable) by the time this
    /// returns.
    pub async fn execute(
        &self,
        step: StepDefinition,
        item: &WorkItem,
        ctx: &RunContext,
    ) -> Result<StepOutcome> {
        debug!(
            step = step.name(),
            hierarchy_path = %item.hierarchy_path,
            dry_run = ctx.dry_run,
            "executing step"
        );

        // Pre-call validation; a missing input never reaches the remote
        // service and is never retried.
        let params = match step.build_params(item, ctx) {
            Ok(params) => params,
            Err(SparepartError::Validation { field, message }) => {
                let text = format!("{field}: {message}");
                let outcome = StepOutcome::error(&text);
                self.persist_outcome(step, item, ctx, &outcome, None).await?;
                self.log_attempt(step, item, ctx, false, Some(&text), None)
                    .await?;
                return Ok(outcome);
            }
            Err(other) => return Err(other),
        };

        if ctx.dry_run {
            return self.execute_dry_run(step, item, ctx).await;
        }

        let retry = self.config.retry_for(step.name());
        let max_attempts = if step.retries_on_missing_value() {
            retry.max_attempts.max(1)
        } else {
            1
        };

        let mut last_outcome = StepOutcome::error("no attempt executed");
        for attempt in 1..=max_attempts {
            let call = self
                .service
                .call(step.program(), step.transaction(), &params)
                .await;

            match call {
                Err(err) => {
                    let text = err.to_string();
                    warn!(
                        step = step.name(),
                        hierarchy_path = %item.hierarchy_path,
                        attempt,
                        error = %text,
                        "remote call failed"
                    );
                    self.log_attempt(step, item, ctx, false, Some(&text), None)
                        .await?;
                    last_outcome = StepOutcome::error(&text);
                }
                Ok(response) => {
                    let raw = serde_json::to_string(&response).ok();
                    let classification = classify(&response);
                    let extracted = step
                        .extract_spec()
                        .and_then(|spec| response.find_field(spec.candidates));

                    self.log_attempt(
                        step,
                        item,
                        ctx,
                        classification.outcome.is_success(),
                        (!classification.outcome.is_success())
                            .then(|| classification.message.clone())
                            .as_deref(),
                        raw.as_deref(),
                    )
                    .await?;

                    let value_missing = step.extract_spec().is_some()
                        && classification.outcome.is_success()
                        && extracted.is_none();

                    if value_missing && step.retries_on_missing_value() && attempt < max_attempts {
                        // The downstream system has not materialized the
                        // value yet; wait and ask again.
                        debug!(
                            step = step.name(),
                            attempt,
                            delay_ms = retry.delay_ms,
                            "expected value absent, retrying"
                        );
                        sleep(Duration::from_millis(retry.delay_ms)).await;
                        continue;
                    }

                    if value_missing {
                        let spec = step.extract_spec().expect("checked above");
                        last_outcome = StepOutcome::error(format!("{} fehlt", spec.value_name));
                        break;
                    }

                    last_outcome = StepOutcome {
                        ok: classification.outcome.is_success(),
                        classification: classification.outcome,
                        message: classification.status_string(),
                        extracted_value: extracted,
                    };
                    break;
                }
            }

            // Transport failures retry only for value-producing steps.
            if step.retries_on_missing_value() && attempt < max_attempts {
                sleep(Duration::from_millis(retry.delay_ms)).await;
                continue;
            }
            break;
        }

        self.persist_outcome(step, item, ctx, &last_outcome, last_outcome.extracted_value.clone())
            .await?;
        Ok(last_outcome)
    }

    /// Dry-run: no remote call, synthetic success, placeholder generated
    /// values so downstream steps still validate.
    async fn execute_dry_run(
        &self,
        step: StepDefinition,
        item: &WorkItem,
        ctx: &RunContext,
    ) -> Result<StepOutcome> {
        let extracted = step.extract_spec().map(|_| DRY_RUN_PLACEHOLDER.to_string());
        let outcome = StepOutcome {
            ok: true,
            classification: Outcome::Ok,
            message: status::DRY_RUN.to_string(),
            extracted_value: extracted.clone(),
        };
        self.persist_outcome(step, item, ctx, &outcome, extracted)
            .await?;
        self.log_attempt(step, item, ctx, true, None, None).await?;
        Ok(outcome)
    }

    /// Fold an outcome into the item's columns, committed immediately.
    async fn persist_outcome(
        &self,
        step: StepDefinition,
        item: &WorkItem,
        _ctx: &RunContext,
        outcome: &StepOutcome,
        extracted: Option<String>,
    ) -> Result<()> {
        let status_text = if outcome.ok {
            outcome.message.clone()
        } else if outcome.message.starts_with(status::ERROR_PREFIX)
            || outcome.message.starts_with(status::BLOCKED_PREFIX)
        {
            outcome.message.clone()
        } else {
            format!("{}{}", status::ERROR_PREFIX, outcome.message)
        };

        self.store
            .update_column(item.id, step.status_column(), &status_text)
            .await?;

        if let (Some(spec), Some(value)) = (step.extract_spec(), extracted) {
            self.store
                .update_column(item.id, spec.store_column, &value)
                .await?;
        }

        if outcome.ok {
            if let Some(column) = step.timestamp_column() {
                self.store
                    .update_column(item.id, column, &Utc::now().to_rfc3339())
                    .await?;
            }
        }
        Ok(())
    }

    /// Append one operation-log row for one attempt.
    async fn log_attempt(
        &self,
        step: StepDefinition,
        item: &WorkItem,
        ctx: &RunContext,
        success: bool,
        error_text: Option<&str>,
        raw_response: Option<&str>,
    ) -> Result<()> {
        log_mi_operation(
            step.name(),
            step.program(),
            step.transaction(),
            &item.hierarchy_path,
            ctx.dry_run,
            success,
            error_text,
        );
        let entry = OperationLogEntry::now(
            &ctx.environment,
            step.name(),
            &item.hierarchy_path,
            &item.asset_item,
            &item.asset_serial,
            ctx.dry_run,
            step.program(),
            step.transaction(),
            success,
            error_text.map(str::to_string),
            raw_response.map(str::to_string),
        );
        self.store.append_log(&entry).await
    }
}
