//! # Core Constants
//!
//! Status vocabulary, remote message codes and structural rules shared
//! across the renumbering pipeline. The MI message codes and the path rules
//! encode behavior of the remote ERP and must not be changed without
//! checking against real response data.

/// Status strings persisted into the per-step columns of a work item.
pub mod status {
    /// Step completed successfully.
    pub const OK: &str = "OK";

    /// Step accepted; the underlying change completes asynchronously
    /// downstream.
    pub const OK_ASYNC: &str = "OK (asynchron)";

    /// The desired end-state already holds; the step was a no-op.
    pub const OK_IDEMPOTENT: &str = "OK (bereits erledigt)";

    /// A manual precondition on the remote side is unmet.
    pub const BLOCKED_PREFIX: &str = "KONFLIKT: ";

    /// Step failed; the rest of the message is operator-facing.
    pub const ERROR_PREFIX: &str = "ERROR: ";

    /// Step was exercised in dry-run mode, no remote call was issued.
    pub const DRY_RUN: &str = "DRY-RUN";

    /// Any of the success-like statuses, including dry-run. Items carrying
    /// one of these are skipped on re-execution of the same step.
    pub fn is_ok_like(value: &str) -> bool {
        value == OK || value == OK_ASYNC || value == OK_IDEMPOTENT || value == DRY_RUN
    }
}

/// MI message codes with special classification semantics.
pub mod mi_codes {
    /// Removal is performed asynchronously by the ERP; the call itself
    /// succeeded.
    pub const ASYNC_REMOVAL: &str = "MOS09102";

    /// The component is already installed in the requested position.
    pub const ALREADY_INSTALLED: &str = "MOS07713";

    /// Work order status 80 blocks the change; requires manual action.
    pub const STATUS_80_BLOCK: &str = "MOS10080";

    /// Message fragments checked alongside the codes. The remote system is
    /// not consistent about codes across releases, the texts are stable.
    pub const ASYNC_REMOVAL_TEXT: &str = "asynchronous removal";
    pub const ALREADY_INSTALLED_TEXT: &str = "is installed in this position";
    pub const STATUS_80_TEXT: &str = "status is 80";
}

/// Hierarchy-path structure rules.
pub mod paths {
    /// Segment separator inside a hierarchy path ("1-2-01-3").
    pub const SEPARATOR: char = '-';

    /// Items at or above this depth (segment count) belong to the wagon
    /// level and target the asset's new identifiers directly instead of a
    /// derived substitution.
    pub const ROOT_DEPTH_MAX: usize = 2;

    /// Sentinel third segment of a depth-4 path that is dropped when
    /// computing the parent path. Matches an ERP data quirk observed on
    /// real structures; do not generalize to other values.
    pub const COLLAPSED_SEGMENT: &str = "01";

    /// Depth at which the collapsing rule applies.
    pub const COLLAPSED_DEPTH: usize = 4;
}

/// Job registry limits.
pub mod jobs {
    /// Maximum number of log lines retained per job.
    pub const LOG_LIMIT: usize = 2000;

    /// Seconds a finished job stays pollable before eviction.
    pub const FINISHED_TTL_SECS: u64 = 3600;
}

/// Placeholder generated value used by dry-run executions so downstream
/// steps that consume an extracted value still validate.
pub const DRY_RUN_PLACEHOLDER: &str = "DRYRUN";

/// Environments the tooling can run against. Table names and credential
/// files are routed by this value.
pub mod environments {
    pub const LIVE: &str = "live";
    pub const TEST: &str = "test";

    /// Table-name suffix per environment, mirroring the cache database
    /// layout of the loader apps.
    pub fn table_suffix(env: &str) -> &'static str {
        if env == TEST {
            "_test"
        } else {
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_like_statuses() {
        assert!(status::is_ok_like(status::OK));
        assert!(status::is_ok_like(status::OK_ASYNC));
        assert!(status::is_ok_like(status::OK_IDEMPOTENT));
        assert!(status::is_ok_like(status::DRY_RUN));
        assert!(!status::is_ok_like("ERROR: MWNO fehlt"));
    }

    #[test]
    fn test_environment_suffix() {
        assert_eq!(environments::table_suffix(environments::LIVE), "");
        assert_eq!(environments::table_suffix(environments::TEST), "_test");
    }
}
