//! # Hierarchy Resolution
//!
//! Reconstructs the tree of still-installed components from the flat
//! historical installation records of one asset and produces the work items
//! of a renumbering run.
//!
//! The resolver is pure and deterministic: the same raw record set always
//! yields the same work items, the same parent assignment and the same
//! sequence numbers, which is what makes re-imports idempotent.

pub mod resolver;
pub mod source;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use resolver::resolve;
pub use source::MiHierarchySource;

/// One historical installation record as returned by the master-data
/// lookup, before filtering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawComponentRecord {
    /// Dash-delimited position path; empty paths are discarded
    pub path: String,
    /// Parent identifiers as carried by the source row (informational;
    /// resolution recomputes the parent from the path structure)
    pub parent_item: String,
    pub parent_serial: String,
    pub component_item: String,
    pub component_serial: String,
    /// Removal timestamp; blank or zero means the component was never
    /// removed and is out of renumbering scope
    pub removal_timestamp: String,
    /// Equipment type used by the parent-type constraint map
    pub component_type: String,
    /// Second type column from the source view; not used by resolution
    pub component_type_alt: String,
}

/// Old and new identifiers of the asset for one renumbering run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenumberTarget {
    pub asset_item: String,
    pub asset_serial: String,
    pub new_asset_item: String,
    pub new_asset_serial: String,
}

/// The master-data lookup seam.
#[async_trait]
pub trait HierarchySource: Send + Sync {
    /// Component history of one asset, ordered as delivered by the source.
    async fn lookup_hierarchy(
        &self,
        asset_item: &str,
        asset_serial: &str,
    ) -> Result<Vec<RawComponentRecord>>;
}
