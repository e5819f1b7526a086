//! # Job Registry
//!
//! In-memory registry of pipeline executions. Callers start a run, receive
//! a job id immediately and poll for progress; the executing worker mutates
//! the job state as it goes.
//!
//! Finished jobs are evicted after a TTL instead of accumulating for the
//! process lifetime; eviction runs opportunistically on every create and
//! snapshot.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::constants::jobs as limits;

/// Lifecycle state of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Success,
    Error,
}

/// One step result of one item, as reported to polling callers.
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub hierarchy_path: String,
    pub component_item: String,
    pub component_serial: String,
    pub step: String,
    pub status: String,
    pub ok: bool,
}

/// Pollable state of one pipeline execution.
#[derive(Debug, Clone, Serialize)]
pub struct JobState {
    pub id: Uuid,
    pub job_type: String,
    pub environment: String,
    pub status: JobStatus,
    pub total: usize,
    pub processed: usize,
    pub ok_count: usize,
    pub error_count: usize,
    pub error: Option<String>,
    pub results: Vec<ItemResult>,
    /// Bounded log ring, oldest lines dropped first
    pub logs: VecDeque<String>,
    pub started: DateTime<Utc>,
    pub finished: Option<DateTime<Utc>>,
}

/// Registry of running and recently finished jobs.
pub struct JobRegistry {
    jobs: DashMap<Uuid, JobState>,
    ttl: Duration,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(limits::FINISHED_TTL_SECS))
    }
}

impl JobRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: DashMap::new(),
            ttl,
        }
    }

    /// Register a new running job and return its id.
    pub fn create(&self, job_type: &str, environment: &str) -> Uuid {
        self.evict_expired();
        let id = Uuid::new_v4();
        self.jobs.insert(
            id,
            JobState {
                id,
                job_type: job_type.to_string(),
                environment: environment.to_string(),
                status: JobStatus::Running,
                total: 0,
                processed: 0,
                ok_count: 0,
                error_count: 0,
                error: None,
                results: Vec::new(),
                logs: VecDeque::new(),
                started: Utc::now(),
                finished: None,
            },
        );
        id
    }

    /// Mutate a job under the registry lock.
    pub fn update<F: FnOnce(&mut JobState)>(&self, id: Uuid, f: F) {
        if let Some(mut job) = self.jobs.get_mut(&id) {
            f(job.value_mut());
        }
    }

    /// Append one log line, keeping the ring bounded.
    pub fn append_log(&self, id: Uuid, line: impl Into<String>) {
        let line = line.into();
        if line.is_empty() {
            return;
        }
        self.update(id, |job| {
            job.logs.push_back(line);
            while job.logs.len() > limits::LOG_LIMIT {
                job.logs.pop_front();
            }
        });
    }

    /// Record one item/step result. The ok/error counters are item-level
    /// aggregates maintained by the orchestrator, not per-step tallies.
    pub fn record_result(&self, id: Uuid, result: ItemResult) {
        self.update(id, |job| {
            job.results.push(result);
        });
    }

    /// Set the item-level ok/error aggregate.
    pub fn set_counts(&self, id: Uuid, ok: usize, error: usize) {
        self.update(id, |job| {
            job.ok_count = ok;
            job.error_count = error;
        });
    }

    /// Mark a job finished.
    pub fn finish(&self, id: Uuid, status: JobStatus, error: Option<String>) {
        self.update(id, |job| {
            job.status = status;
            job.error = error;
            job.finished = Some(Utc::now());
        });
    }

    /// Snapshot a job for polling; `None` for unknown or evicted ids.
    pub fn snapshot(&self, id: Uuid) -> Option<JobState> {
        self.evict_expired();
        self.jobs.get(&id).map(|job| job.value().clone())
    }

    /// Number of retained jobs, running and finished.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn evict_expired(&self) {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::hours(1));
        let now = Utc::now();
        self.jobs.retain(|_, job| match job.finished {
            Some(finished) => now - finished < ttl,
            None => true,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_poll_roundtrip() {
        let registry = JobRegistry::default();
        let id = registry.create("renumber", "test");
        registry.update(id, |job| job.total = 3);
        registry.append_log(id, "step remove-component: 3 ok / 0 error");

        let snapshot = registry.snapshot(id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Running);
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.logs.len(), 1);
    }

    #[test]
    fn unknown_id_yields_none() {
        let registry = JobRegistry::default();
        assert!(registry.snapshot(Uuid::new_v4()).is_none());
    }

    #[test]
    fn log_ring_is_bounded() {
        let registry = JobRegistry::default();
        let id = registry.create("renumber", "test");
        for i in 0..(limits::LOG_LIMIT + 50) {
            registry.append_log(id, format!("line {i}"));
        }
        let snapshot = registry.snapshot(id).unwrap();
        assert_eq!(snapshot.logs.len(), limits::LOG_LIMIT);
        assert_eq!(snapshot.logs.front().unwrap(), "line 50");
    }

    #[test]
    fn finished_jobs_are_evicted_after_ttl() {
        let registry = JobRegistry::new(Duration::from_secs(0));
        let id = registry.create("renumber", "test");
        registry.finish(id, JobStatus::Success, None);
        // TTL of zero: the next poll evicts it.
        assert!(registry.snapshot(id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn results_and_counts_are_reported() {
        let registry = JobRegistry::default();
        let id = registry.create("renumber", "test");
        registry.record_result(
            id,
            ItemResult {
                hierarchy_path: "1-1".to_string(),
                component_item: "A".to_string(),
                component_serial: "S1".to_string(),
                step: "remove-component".to_string(),
                status: "OK".to_string(),
                ok: true,
            },
        );
        registry.record_result(
            id,
            ItemResult {
                hierarchy_path: "1-2".to_string(),
                component_item: "B".to_string(),
                component_serial: "S2".to_string(),
                step: "remove-component".to_string(),
                status: "ERROR: parent_item: required field is empty".to_string(),
                ok: false,
            },
        );
        registry.set_counts(id, 1, 1);
        let snapshot = registry.snapshot(id).unwrap();
        assert_eq!(snapshot.ok_count, 1);
        assert_eq!(snapshot.error_count, 1);
        assert_eq!(snapshot.results.len(), 2);
    }
}
