//! # Hierarchy Resolver
//!
//! Turns the filtered installation records of one asset into work items
//! with resolved parents and deterministic ordering.
//!
//! Parent resolution works purely on the path structure:
//!
//! 1. Records are grouped by path.
//! 2. The parent path is the path with its last segment dropped - except
//!    for depth-4 paths whose third segment is the sentinel `01`, where the
//!    sentinel segment is dropped instead (an ERP data quirk on real
//!    structures; preserved verbatim).
//! 3. Candidate parents are the records at the parent path. When a path's
//!    fan-out exceeds the candidate supply, the search widens to sibling
//!    paths at the parent depth sharing the parent path's prefix.
//! 4. A fixed component-type → parent-type map narrows candidates when it
//!    matches at least one of them.
//! 5. Candidates sort by `(serial, item)`; the i-th child of a path takes
//!    the (i mod n)-th candidate.
//!
//! Records with no resolvable parent keep blank parent fields; the removal
//! step later fails validation for them before any remote call is made.

use std::collections::HashMap;

use crate::constants::paths;
use crate::hierarchy::{RawComponentRecord, RenumberTarget};
use crate::models::{derive_new_component_ids, work_item::path_depth, WorkItem};

/// Expected parent equipment type per child equipment type. Applied as a
/// filter only when at least one candidate matches.
const EXPECTED_PARENT_TYPE: &[(&str, &str)] = &[
    ("RADSATZ", "DREHGESTELL"),
    ("BREMSKLOTZ", "BREMSE"),
    ("LAGER", "RADSATZ"),
];

fn expected_parent_type(child_type: &str) -> Option<&'static str> {
    EXPECTED_PARENT_TYPE
        .iter()
        .find(|(child, _)| *child == child_type)
        .map(|(_, parent)| *parent)
}

/// Parent path of a hierarchy path.
///
/// Standard truncation drops the last segment. A depth-4 path whose third
/// segment equals [`paths::COLLAPSED_SEGMENT`] instead drops that sentinel
/// segment, collapsing to a 3-segment parent.
pub fn parent_path(path: &str) -> String {
    let segments: Vec<&str> = path.split(paths::SEPARATOR).collect();
    if segments.len() <= 1 {
        return String::new();
    }
    if segments.len() == paths::COLLAPSED_DEPTH && segments[2] == paths::COLLAPSED_SEGMENT {
        let mut kept: Vec<&str> = segments[..2].to_vec();
        kept.push(segments[3]);
        return kept.join("-");
    }
    segments[..segments.len() - 1].join("-")
}

/// Resolve raw records into the work items of one renumbering run.
pub fn resolve(records: &[RawComponentRecord], target: &RenumberTarget) -> Vec<WorkItem> {
    // Scope filter: only components that were actually removed take part.
    let filtered: Vec<&RawComponentRecord> = records
        .iter()
        .filter(|r| !r.path.trim().is_empty())
        .filter(|r| is_removed(&r.removal_timestamp))
        .collect();

    let mut by_path: HashMap<&str, Vec<&RawComponentRecord>> = HashMap::new();
    for record in &filtered {
        by_path.entry(record.path.as_str()).or_default().push(*record);
    }

    let mut items: Vec<WorkItem> = Vec::with_capacity(filtered.len());

    for (index, record) in filtered.iter().copied().enumerate() {
        let child_count = by_path
            .get(record.path.as_str())
            .map_or(1, |group| group.len());

        let assigned = assign_parent(record, child_count, &by_path, &filtered);

        // The root record carries no component identifiers of its own;
        // children attached to it hang off the asset directly.
        let (parent_item, parent_serial) = match assigned {
            Some(parent) if parent.component_item.is_empty() && parent.component_serial.is_empty() => {
                (target.asset_item.clone(), target.asset_serial.clone())
            }
            Some(parent) => (parent.component_item.clone(), parent.component_serial.clone()),
            None => (String::new(), String::new()),
        };

        let (new_component_item, new_component_serial) = derive_new_component_ids(
            &record.component_item,
            &record.component_serial,
            &target.asset_item,
            &target.asset_serial,
            &target.new_asset_item,
            &target.new_asset_serial,
        );

        items.push(WorkItem {
            id: 0,
            hierarchy_path: record.path.clone(),
            asset_item: target.asset_item.clone(),
            asset_serial: target.asset_serial.clone(),
            component_item: record.component_item.clone(),
            component_serial: record.component_serial.clone(),
            parent_item,
            parent_serial,
            removal_timestamp: record.removal_timestamp.clone(),
            new_asset_item: target.new_asset_item.clone(),
            new_asset_serial: target.new_asset_serial.clone(),
            new_component_item,
            new_component_serial,
            sequence_number: index as i64,
            ..WorkItem::default()
        });
    }

    // Bottom-up execution order: most-nested first, root-most last, stable
    // within a depth level.
    items.sort_by(|a, b| {
        path_depth(&b.hierarchy_path)
            .cmp(&path_depth(&a.hierarchy_path))
            .then(a.sequence_number.cmp(&b.sequence_number))
    });
    for (sequence, item) in items.iter_mut().enumerate() {
        item.sequence_number = sequence as i64 + 1;
    }

    items
}

/// Pick the parent record for one child, or `None` when no candidate
/// exists.
fn assign_parent<'a>(
    child: &RawComponentRecord,
    children_at_path: usize,
    by_path: &HashMap<&str, Vec<&'a RawComponentRecord>>,
    all: &[&'a RawComponentRecord],
) -> Option<&'a RawComponentRecord> {
    let parent = parent_path(&child.path);
    if parent.is_empty() {
        return None;
    }

    let mut candidates: Vec<&RawComponentRecord> = by_path
        .get(parent.as_str())
        .map(|group| group.to_vec())
        .unwrap_or_default();

    // Fan-out exceeds supply: widen to sibling paths at the parent depth
    // sharing the parent path's prefix.
    if candidates.len() < children_at_path {
        let parent_depth = path_depth(&parent);
        let prefix = parent_path(&parent);
        candidates = all
            .iter()
            .filter(|r| path_depth(&r.path) == parent_depth && parent_path(&r.path) == prefix)
            .copied()
            .collect();
    }

    if candidates.is_empty() {
        return None;
    }

    // Type constraint, only when it actually matches a candidate.
    if let Some(wanted) = expected_parent_type(&child.component_type) {
        let typed: Vec<&RawComponentRecord> = candidates
            .iter()
            .filter(|c| c.component_type == wanted)
            .copied()
            .collect();
        if !typed.is_empty() {
            candidates = typed;
        }
    }

    candidates.sort_by(|a, b| {
        (a.component_serial.as_str(), a.component_item.as_str())
            .cmp(&(b.component_serial.as_str(), b.component_item.as_str()))
    });

    // The i-th child sharing a path takes the i-th candidate, wrapping when
    // children outnumber candidates. Index is the child's position within
    // its path group, in source order.
    let child_index = by_path
        .get(child.path.as_str())
        .and_then(|group| group.iter().position(|r| std::ptr::eq(*r, child)))
        .unwrap_or(0);

    Some(candidates[child_index % candidates.len()])
}

/// A component counts as removed when its removal timestamp is neither
/// blank nor a zero date.
fn is_removed(timestamp: &str) -> bool {
    let trimmed = timestamp.trim();
    if trimmed.is_empty() {
        return false;
    }
    !trimmed.chars().all(|c| c == '0' || c == '.' || c == '-' || c == ':' || c == ' ')
}
