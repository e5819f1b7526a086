//! # Data Layer
//!
//! Row types persisted in the cache database: the per-run work items of the
//! renumbering pipeline and the append-only MI operation log.

pub mod operation_log;
pub mod work_item;

pub use operation_log::OperationLogEntry;
pub use work_item::{derive_new_component_ids, ItemTargets, WorkItem};
