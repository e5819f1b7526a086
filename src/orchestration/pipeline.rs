//! # Pipeline Orchestrator
//!
//! Owns the ordered step sequence of a renumbering run and drives the step
//! executor over all pending work items, step by step. Also provides the
//! rollback pipeline that re-attaches previously removed components.
//!
//! ## Transitions
//!
//! A step only processes items whose own status column is still empty and
//! which the step applies to, so re-invoking any step - or re-running a
//! whole interrupted pipeline - is idempotent: completed items are skipped
//! without a remote call. Items proceed independently; there is no barrier
//! requiring the whole item set to finish step N before step N+1 starts
//! being iterated, the orchestrator simply walks "for each pending item,
//! run step N" and then moves on.
//!
//! ## Failure semantics
//!
//! Item-level failures are recorded and the run continues with the next
//! item. Only infrastructure-level errors (store unreachable, persisting an
//! outcome failed) abort the run; everything already persisted remains
//! valid for a resumed run.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::classify::Outcome;
use crate::config::SparepartConfig;
use crate::constants::status;
use crate::database::RunStateStore;
use crate::error::Result;
use crate::hierarchy::{resolve, HierarchySource, RenumberTarget};
use crate::mi::TransactionService;
use crate::models::WorkItem;
use crate::orchestration::jobs::{ItemResult, JobRegistry, JobStatus};
use crate::orchestration::step_executor::{StepExecutor, StepOutcome};
use crate::steps::{RunContext, StepDefinition};

/// Drives renumbering and rollback runs over the work-item set of one
/// asset.
pub struct PipelineOrchestrator {
    store: Arc<RunStateStore>,
    executor: StepExecutor,
    registry: Arc<JobRegistry>,
}

impl PipelineOrchestrator {
    pub fn new(
        service: Arc<dyn TransactionService>,
        store: Arc<RunStateStore>,
        registry: Arc<JobRegistry>,
        config: &SparepartConfig,
    ) -> Self {
        let executor = StepExecutor::new(service, store.clone(), config.pipeline.clone());
        Self {
            store,
            executor,
            registry,
        }
    }

    /// The forward step sequence. The wagon-level master-data steps join
    /// only when the run renames the wagon itself; installation always runs
    /// last.
    pub fn forward_steps(ctx: &RunContext) -> Vec<StepDefinition> {
        let mut steps = vec![
            StepDefinition::RemoveComponent,
            StepDefinition::AddProperty,
            StepDefinition::LookupWorkOrder,
            StepDefinition::ChangeSerial,
            StepDefinition::Approve,
            StepDefinition::Assembly,
            StepDefinition::UpdateControlObject,
        ];
        if ctx.renumber_wagon {
            steps.extend([
                StepDefinition::GenericItemBasic,
                StepDefinition::GenericItemWhs,
                StepDefinition::UpdateMasterData,
                StepDefinition::UpdateCustomField,
            ]);
        }
        steps.push(StepDefinition::InstallComponent);
        steps
    }

    /// Re-import the asset's hierarchy: look it up, resolve it and merge it
    /// into the run state. Returns the number of imported items.
    pub async fn import_hierarchy(
        &self,
        source: &dyn HierarchySource,
        target: &RenumberTarget,
    ) -> Result<usize> {
        let records = source
            .lookup_hierarchy(&target.asset_item, &target.asset_serial)
            .await?;
        let items = resolve(&records, target);
        info!(
            asset_item = %target.asset_item,
            asset_serial = %target.asset_serial,
            raw_records = records.len(),
            work_items = items.len(),
            "hierarchy imported"
        );
        self.store
            .import(&target.asset_item, &target.asset_serial, items)
            .await
    }

    /// Start a forward renumbering run on a background worker and return
    /// the job id for polling.
    pub fn start_renumbering(
        self: &Arc<Self>,
        target: RenumberTarget,
        ctx: RunContext,
    ) -> Uuid {
        let job_id = self.registry.create("renumber", &ctx.environment);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_to_completion(job_id, target, ctx, false).await;
        });
        job_id
    }

    /// Start a rollback run on a background worker.
    pub fn start_rollback(self: &Arc<Self>, target: RenumberTarget, ctx: RunContext) -> Uuid {
        let job_id = self.registry.create("rollback", &ctx.environment);
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_to_completion(job_id, target, ctx, true).await;
        });
        job_id
    }

    async fn run_to_completion(
        &self,
        job_id: Uuid,
        target: RenumberTarget,
        ctx: RunContext,
        rollback: bool,
    ) {
        let result = if rollback {
            self.run_rollback(job_id, &target, &ctx).await
        } else {
            self.run_forward(job_id, &target, &ctx).await
        };
        match result {
            Ok(()) => {
                self.registry.finish(job_id, JobStatus::Success, None);
            }
            Err(err) => {
                error!(job_id = %job_id, error = %err, "pipeline run aborted");
                self.registry
                    .finish(job_id, JobStatus::Error, Some(err.to_string()));
            }
        }
    }

    /// Execute the forward pipeline for all pending items.
    pub async fn run_forward(
        &self,
        job_id: Uuid,
        target: &RenumberTarget,
        ctx: &RunContext,
    ) -> Result<()> {
        let items = self
            .store
            .read_all(&target.asset_item, &target.asset_serial)
            .await?;
        self.registry.update(job_id, |job| job.total = items.len());
        info!(
            job_id = %job_id,
            items = items.len(),
            dry_run = ctx.dry_run,
            "starting renumbering run"
        );

        let steps = Self::forward_steps(ctx);
        let last = *steps.last().expect("step sequence is never empty");
        let mut failed_items: HashSet<String> = HashSet::new();
        let total = items.len();

        for step in steps {
            // Re-read so each step sees the values the previous one
            // generated.
            let mut current = self
                .store
                .read_all(&target.asset_item, &target.asset_serial)
                .await?;
            if step == StepDefinition::InstallComponent {
                // Re-attach in reverse order of removal: root-most first.
                current.reverse();
            }

            let mut ok = 0usize;
            let mut failed = 0usize;
            let mut skipped = 0usize;

            for item in &current {
                if !step.is_applicable(item, ctx) {
                    skipped += 1;
                    continue;
                }
                if item
                    .status(step.status_column())
                    .is_some_and(|s| !s.trim().is_empty())
                {
                    skipped += 1;
                    continue;
                }

                let outcome = self.executor.execute(step, item, ctx).await?;
                self.record(job_id, step, item, &outcome);
                if outcome.ok {
                    ok += 1;
                } else {
                    failed += 1;
                    failed_items.insert(item.hierarchy_path.clone());
                }

                if step == last {
                    self.registry.update(job_id, |job| job.processed += 1);
                }
            }

            self.registry.append_log(
                job_id,
                format!("step {}: {ok} ok / {failed} error / {skipped} skipped", step.name()),
            );
            self.registry
                .set_counts(job_id, total - failed_items.len(), failed_items.len());
        }

        self.registry.update(job_id, |job| job.processed = job.total);
        Ok(())
    }

    /// Replay the install step for items whose removal previously went
    /// through (live or dry-run), resolving install conflicts by trying the
    /// next parent candidate.
    pub async fn run_rollback(
        &self,
        job_id: Uuid,
        target: &RenumberTarget,
        ctx: &RunContext,
    ) -> Result<()> {
        let mut items = self
            .store
            .read_all(&target.asset_item, &target.asset_serial)
            .await?;
        // Top-down: parents have to be back in place before their children.
        items.reverse();

        let pending: Vec<&WorkItem> = items
            .iter()
            .filter(|item| {
                item.remove_status
                    .as_deref()
                    .is_some_and(status::is_ok_like)
            })
            .collect();
        self.registry.update(job_id, |job| job.total = pending.len());
        info!(job_id = %job_id, items = pending.len(), "starting rollback run");

        let total = pending.len();
        let mut failed = 0usize;
        for item in pending {
            let outcome = self.install_with_fallback(item, target, ctx).await?;
            if !outcome.ok {
                failed += 1;
            }
            self.record(job_id, StepDefinition::InstallComponent, item, &outcome);
            self.registry.update(job_id, |job| job.processed += 1);
            self.registry.set_counts(job_id, total - failed, failed);
        }
        Ok(())
    }

    /// Install one item; on an idempotency-conflict response, retry against
    /// the remaining parent candidates in their deterministic order before
    /// giving up. This is targeted conflict resolution, not a blind retry:
    /// it only engages for the conflict code pair and only when more than
    /// one candidate exists.
    async fn install_with_fallback(
        &self,
        item: &WorkItem,
        target: &RenumberTarget,
        ctx: &RunContext,
    ) -> Result<StepOutcome> {
        let outcome = self
            .executor
            .execute(StepDefinition::InstallComponent, item, ctx)
            .await?;
        if outcome.ok || !is_conflict(&outcome) {
            return Ok(outcome);
        }

        let parent = crate::hierarchy::resolver::parent_path(&item.hierarchy_path);
        if parent.is_empty() {
            return Ok(outcome);
        }
        let candidates = self
            .store
            .candidates_at_path(&target.asset_item, &target.asset_serial, &parent)
            .await?;
        if candidates.len() <= 1 {
            return Ok(outcome);
        }

        let mut last = outcome;
        for candidate in candidates {
            if candidate.component_item == item.parent_item
                && candidate.component_serial == item.parent_serial
            {
                continue;
            }
            info!(
                hierarchy_path = %item.hierarchy_path,
                candidate_item = %candidate.component_item,
                candidate_serial = %candidate.component_serial,
                "install conflict, retrying against next parent candidate"
            );
            let mut retargeted = item.clone();
            retargeted.parent_item = candidate.component_item.clone();
            retargeted.parent_serial = candidate.component_serial.clone();

            last = self
                .executor
                .execute(StepDefinition::InstallComponent, &retargeted, ctx)
                .await?;
            if last.ok || !is_conflict(&last) {
                break;
            }
        }
        Ok(last)
    }

    fn record(&self, job_id: Uuid, step: StepDefinition, item: &WorkItem, outcome: &StepOutcome) {
        self.registry.record_result(
            job_id,
            ItemResult {
                hierarchy_path: item.hierarchy_path.clone(),
                component_item: item.component_item.clone(),
                component_serial: item.component_serial.clone(),
                step: step.name().to_string(),
                status: outcome.message.clone(),
                ok: outcome.ok,
            },
        );
    }
}

/// The idempotency-conflict pair the install fallback reacts to.
fn is_conflict(outcome: &StepOutcome) -> bool {
    matches!(
        outcome.classification,
        Outcome::OkIdempotent | Outcome::Blocking
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_sequence_order() {
        let ctx = RunContext::new("test", false);
        let steps = PipelineOrchestrator::forward_steps(&ctx);
        assert_eq!(steps.first(), Some(&StepDefinition::RemoveComponent));
        assert_eq!(steps.last(), Some(&StepDefinition::InstallComponent));
        assert_eq!(steps.len(), 12);

        let lookup = steps
            .iter()
            .position(|s| *s == StepDefinition::LookupWorkOrder)
            .unwrap();
        let add = steps
            .iter()
            .position(|s| *s == StepDefinition::AddProperty)
            .unwrap();
        assert!(add < lookup);
    }

    #[test]
    fn part_only_runs_skip_wagon_level_steps() {
        let mut ctx = RunContext::new("test", false);
        ctx.renumber_wagon = false;
        let steps = PipelineOrchestrator::forward_steps(&ctx);
        assert_eq!(steps.len(), 8);
        assert!(!steps.contains(&StepDefinition::UpdateMasterData));
        assert_eq!(steps.last(), Some(&StepDefinition::InstallComponent));
    }
}
