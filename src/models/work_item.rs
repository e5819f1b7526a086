//! # Work Item Model
//!
//! One node of the asset's component hierarchy for one renumbering run.
//!
//! ## Overview
//!
//! A `WorkItem` row is created by the hierarchy resolver on import and then
//! mutated column-by-column as the pipeline executes: every pipeline step
//! owns exactly one nullable status column, plus the generated identifiers
//! (planned operation, work order) threaded into later steps of the same
//! item. Re-importing a hierarchy merges on the node identity (path plus
//! component identifiers) and preserves completed-step state, which is what
//! makes interrupted runs resumable.
//!
//! ## Status Columns
//!
//! A `NULL`/empty status means the step is still pending for this item; any
//! other value means the step was attempted and will be skipped on re-runs
//! (success-like values) or needs operator attention (`ERROR: …`,
//! `KONFLIKT: …`).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::constants::paths;

/// One hierarchy node within a renumbering run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct WorkItem {
    /// Row id, 0 until persisted
    #[serde(default)]
    pub id: i64,

    /// Dash-delimited position within the asset structure. Shared only by
    /// sibling nodes of a fan-out position
    pub hierarchy_path: String,

    /// Root asset (wagon) owning this run
    pub asset_item: String,
    pub asset_serial: String,

    /// Component at this node; empty for the root node itself
    pub component_item: String,
    pub component_serial: String,

    /// Resolved immediate parent; blank when no candidate was found
    pub parent_item: String,
    pub parent_serial: String,

    /// Source removal timestamp of the historical record
    pub removal_timestamp: String,

    /// Target identifiers of the asset, shared by all items of the run
    pub new_asset_item: String,
    pub new_asset_serial: String,

    /// Target identifiers of this component; empty when no safe derivation
    /// exists
    pub new_component_item: String,
    pub new_component_serial: String,

    // One status column per pipeline step.
    pub remove_status: Option<String>,
    pub add_property_status: Option<String>,
    pub planned_operation: Option<String>,
    pub lookup_order_status: Option<String>,
    pub work_order: Option<String>,
    pub rename_status: Option<String>,
    pub approve_status: Option<String>,
    pub assembly_status: Option<String>,
    pub control_object_status: Option<String>,
    pub generic_basic_status: Option<String>,
    pub generic_whs_status: Option<String>,
    pub master_data_status: Option<String>,
    pub custom_field_status: Option<String>,
    pub install_status: Option<String>,

    /// Timestamps of the terminal remove/install steps
    pub removed_at: Option<String>,
    pub installed_at: Option<String>,

    /// Stable ordering key assigned on (re)import
    pub sequence_number: i64,
}

/// Identifiers a rename-type step targets for one item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemTargets {
    pub item: String,
    pub serial: String,
}

impl WorkItem {
    /// Path depth = number of dash-delimited segments.
    pub fn depth(&self) -> usize {
        path_depth(&self.hierarchy_path)
    }

    /// Whether this row is the root node (the asset itself).
    pub fn is_root(&self) -> bool {
        self.component_item.is_empty() && self.component_serial.is_empty()
    }

    /// Target identifiers after renumbering.
    ///
    /// Root-level items (depth within [`paths::ROOT_DEPTH_MAX`]) target the
    /// asset's new identifiers directly. Deeper items only have a target
    /// when a derivation was possible; `None` here means the rename step
    /// must not run for this item.
    pub fn rename_targets(&self) -> Option<ItemTargets> {
        if self.depth() <= paths::ROOT_DEPTH_MAX {
            if self.new_asset_item.is_empty() && self.new_asset_serial.is_empty() {
                return None;
            }
            return Some(ItemTargets {
                item: self.new_asset_item.clone(),
                serial: self.new_asset_serial.clone(),
            });
        }
        if self.new_component_item.is_empty() && self.new_component_serial.is_empty() {
            return None;
        }
        Some(ItemTargets {
            item: self.new_component_item.clone(),
            serial: self.new_component_serial.clone(),
        })
    }

    /// Read the status column for a step by its column name.
    pub fn status(&self, column: &str) -> Option<&str> {
        let value = match column {
            "remove_status" => &self.remove_status,
            "add_property_status" => &self.add_property_status,
            "lookup_order_status" => &self.lookup_order_status,
            "rename_status" => &self.rename_status,
            "approve_status" => &self.approve_status,
            "assembly_status" => &self.assembly_status,
            "control_object_status" => &self.control_object_status,
            "generic_basic_status" => &self.generic_basic_status,
            "generic_whs_status" => &self.generic_whs_status,
            "master_data_status" => &self.master_data_status,
            "custom_field_status" => &self.custom_field_status,
            "install_status" => &self.install_status,
            _ => return None,
        };
        value.as_deref()
    }

    /// Write the status column for a step by its column name.
    pub fn set_status(&mut self, column: &str, value: String) {
        let slot = match column {
            "remove_status" => &mut self.remove_status,
            "add_property_status" => &mut self.add_property_status,
            "lookup_order_status" => &mut self.lookup_order_status,
            "rename_status" => &mut self.rename_status,
            "approve_status" => &mut self.approve_status,
            "assembly_status" => &mut self.assembly_status,
            "control_object_status" => &mut self.control_object_status,
            "generic_basic_status" => &mut self.generic_basic_status,
            "generic_whs_status" => &mut self.generic_whs_status,
            "master_data_status" => &mut self.master_data_status,
            "custom_field_status" => &mut self.custom_field_status,
            "install_status" => &mut self.install_status,
            _ => return,
        };
        *slot = Some(value);
    }
}

/// Depth of a hierarchy path in segments; 0 for an empty path.
pub fn path_depth(path: &str) -> usize {
    if path.trim().is_empty() {
        0
    } else {
        path.split(paths::SEPARATOR).count()
    }
}

/// Derive the component's target identifiers from the asset's old/new
/// identifier pair.
///
/// The substitution is purely structural: it applies only when the
/// component identifier embeds the asset's serial or item as a substring.
/// When neither embeds, both targets stay empty - a missing derivation is
/// surfaced at step time, never guessed here.
pub fn derive_new_component_ids(
    component_item: &str,
    component_serial: &str,
    asset_item: &str,
    asset_serial: &str,
    new_asset_item: &str,
    new_asset_serial: &str,
) -> (String, String) {
    let item_derivable = (!asset_item.is_empty() && component_item.contains(asset_item))
        || (!asset_serial.is_empty() && component_item.contains(asset_serial));
    let serial_derivable = (!asset_serial.is_empty() && component_serial.contains(asset_serial))
        || (!asset_item.is_empty() && component_serial.contains(asset_item));

    if !item_derivable && !serial_derivable {
        return (String::new(), String::new());
    }

    let substitute = |value: &str| {
        let mut out = value.to_string();
        if !asset_serial.is_empty() {
            out = out.replace(asset_serial, new_asset_serial);
        }
        if !asset_item.is_empty() {
            out = out.replace(asset_item, new_asset_item);
        }
        out
    };

    (substitute(component_item), substitute(component_serial))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::paths;

    #[test]
    fn depth_counts_segments() {
        assert_eq!(path_depth(""), 0);
        assert_eq!(path_depth("1"), 1);
        assert_eq!(path_depth("1-2-01-3"), 4);
    }

    #[test]
    fn root_level_items_target_asset_ids() {
        let item = WorkItem {
            hierarchy_path: "1-1".to_string(),
            new_asset_item: "NEWX".to_string(),
            new_asset_serial: "NEW123".to_string(),
            ..WorkItem::default()
        };
        assert!(item.depth() <= paths::ROOT_DEPTH_MAX);
        let targets = item.rename_targets().unwrap();
        assert_eq!(targets.item, "NEWX");
        assert_eq!(targets.serial, "NEW123");
    }

    #[test]
    fn deep_items_without_derivation_have_no_target() {
        let item = WorkItem {
            hierarchy_path: "1-2-3".to_string(),
            new_asset_item: "NEWX".to_string(),
            new_asset_serial: "NEW123".to_string(),
            ..WorkItem::default()
        };
        assert!(item.rename_targets().is_none());
    }

    #[test]
    fn derivation_substitutes_embedded_asset_serial() {
        let (item, serial) = derive_new_component_ids(
            "DG-4711",
            "DG-SER-0815-A",
            "WAG4711",
            "0815",
            "WAG9900",
            "7777",
        );
        // Item embeds neither asset id, serial embeds "0815": both fields
        // run through the substitution once any embedding is proven.
        assert_eq!(item, "DG-4711");
        assert_eq!(serial, "DG-SER-7777-A");
    }

    #[test]
    fn derivation_never_guesses() {
        let (item, serial) =
            derive_new_component_ids("AXLE-1", "S-100", "WAG4711", "0815", "WAG9900", "7777");
        assert!(item.is_empty());
        assert!(serial.is_empty());
    }

    #[test]
    fn status_roundtrip_by_column_name() {
        let mut item = WorkItem::default();
        assert_eq!(item.status("remove_status"), None);
        item.set_status("remove_status", "OK".to_string());
        assert_eq!(item.status("remove_status"), Some("OK"));
        assert_eq!(item.status("no_such_column"), None);
    }
}
