//! # Run State Store
//!
//! Persisted work items of a renumbering run, one row per hierarchy node,
//! keyed by `(asset_item, asset_serial, hierarchy_path)`.
//!
//! Two properties carry the resumability story:
//!
//! - **Merge on re-import**: re-scanning the hierarchy replaces the row set
//!   but carries success-like step statuses, generated identifiers and step
//!   timestamps over from the previous rows, so completed work is never
//!   repeated. Failed statuses are deliberately dropped by the merge - a
//!   re-import gives errored items another attempt.
//! - **Single-column updates**: every status write is one `UPDATE` on one
//!   row, committed immediately. Concurrent runs on disjoint assets never
//!   conflict, and a crash leaves a consistent, resumable record.

use std::collections::HashMap;

use sqlx::SqlitePool;

use crate::constants::status;
use crate::database::migrations;
use crate::error::{Result, SparepartError};
use crate::models::{OperationLogEntry, WorkItem};

/// Columns a step is allowed to write. Guards the dynamic column names used
/// in single-column updates.
const WRITABLE_COLUMNS: &[&str] = &[
    "remove_status",
    "add_property_status",
    "planned_operation",
    "lookup_order_status",
    "work_order",
    "rename_status",
    "approve_status",
    "assembly_status",
    "control_object_status",
    "generic_basic_status",
    "generic_whs_status",
    "master_data_status",
    "custom_field_status",
    "install_status",
    "removed_at",
    "installed_at",
];

pub struct RunStateStore {
    pool: SqlitePool,
    environment: String,
    items_table: String,
    log_table: String,
}

impl RunStateStore {
    /// Build a store for one environment, creating the schema if absent.
    pub async fn new(pool: SqlitePool, environment: &str) -> Result<Self> {
        migrations::ensure_schema(&pool, environment).await?;
        Ok(Self {
            pool,
            environment: environment.to_string(),
            items_table: migrations::items_table(environment),
            log_table: migrations::log_table(environment),
        })
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// All rows of one asset's run, ordered by `sequence_number`.
    pub async fn read_all(&self, asset_item: &str, asset_serial: &str) -> Result<Vec<WorkItem>> {
        let sql = format!(
            "SELECT * FROM {} WHERE asset_item = ? AND asset_serial = ? ORDER BY sequence_number",
            self.items_table
        );
        let items = sqlx::query_as::<_, WorkItem>(&sql)
            .bind(asset_item)
            .bind(asset_serial)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Fetch one row by id.
    pub async fn get(&self, id: i64) -> Result<Option<WorkItem>> {
        let sql = format!("SELECT * FROM {} WHERE id = ?", self.items_table);
        let item = sqlx::query_as::<_, WorkItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    /// Import a freshly resolved item set for one asset.
    ///
    /// An empty set wipes the asset's rows (fresh run). Otherwise the
    /// previous rows are merged in: success-like statuses, generated
    /// identifiers and timestamps carry over by node identity, then the
    /// whole row set is replaced in one transaction.
    pub async fn import(
        &self,
        asset_item: &str,
        asset_serial: &str,
        mut items: Vec<WorkItem>,
    ) -> Result<usize> {
        let existing = self.read_all(asset_item, asset_serial).await?;
        // Children sharing a path are still distinct nodes; the merge key
        // includes the component identity.
        let by_node: HashMap<(&str, &str, &str), &WorkItem> = existing
            .iter()
            .map(|item| {
                (
                    (
                        item.hierarchy_path.as_str(),
                        item.component_item.as_str(),
                        item.component_serial.as_str(),
                    ),
                    item,
                )
            })
            .collect();

        for item in &mut items {
            if let Some(old) = by_node.get(&(
                item.hierarchy_path.as_str(),
                item.component_item.as_str(),
                item.component_serial.as_str(),
            )) {
                carry_completed_state(item, old);
            }
        }

        let mut tx = self.pool.begin().await?;

        let delete_sql = format!(
            "DELETE FROM {} WHERE asset_item = ? AND asset_serial = ?",
            self.items_table
        );
        sqlx::query(&delete_sql)
            .bind(asset_item)
            .bind(asset_serial)
            .execute(&mut *tx)
            .await?;

        let insert_sql = format!(
            r#"
            INSERT INTO {} (
                hierarchy_path, asset_item, asset_serial,
                component_item, component_serial, parent_item, parent_serial,
                removal_timestamp,
                new_asset_item, new_asset_serial, new_component_item, new_component_serial,
                remove_status, add_property_status, planned_operation,
                lookup_order_status, work_order, rename_status, approve_status,
                assembly_status, control_object_status, generic_basic_status,
                generic_whs_status, master_data_status, custom_field_status,
                install_status, removed_at, installed_at, sequence_number
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            self.items_table
        );

        let count = items.len();
        for item in &items {
            sqlx::query(&insert_sql)
                .bind(&item.hierarchy_path)
                .bind(&item.asset_item)
                .bind(&item.asset_serial)
                .bind(&item.component_item)
                .bind(&item.component_serial)
                .bind(&item.parent_item)
                .bind(&item.parent_serial)
                .bind(&item.removal_timestamp)
                .bind(&item.new_asset_item)
                .bind(&item.new_asset_serial)
                .bind(&item.new_component_item)
                .bind(&item.new_component_serial)
                .bind(&item.remove_status)
                .bind(&item.add_property_status)
                .bind(&item.planned_operation)
                .bind(&item.lookup_order_status)
                .bind(&item.work_order)
                .bind(&item.rename_status)
                .bind(&item.approve_status)
                .bind(&item.assembly_status)
                .bind(&item.control_object_status)
                .bind(&item.generic_basic_status)
                .bind(&item.generic_whs_status)
                .bind(&item.master_data_status)
                .bind(&item.custom_field_status)
                .bind(&item.install_status)
                .bind(&item.removed_at)
                .bind(&item.installed_at)
                .bind(item.sequence_number)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(count)
    }

    /// Write one status/value column of one row, committed immediately.
    pub async fn update_column(&self, id: i64, column: &str, value: &str) -> Result<()> {
        if !WRITABLE_COLUMNS.contains(&column) {
            return Err(SparepartError::database(
                "update_column",
                format!("column '{column}' is not writable"),
            ));
        }
        let sql = format!("UPDATE {} SET {} = ? WHERE id = ?", self.items_table, column);
        sqlx::query(&sql)
            .bind(value)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Parent candidates for an item during rollback: rows of the same run
    /// whose path equals the parent path, in the deterministic
    /// `(serial, item)` candidate order.
    pub async fn candidates_at_path(
        &self,
        asset_item: &str,
        asset_serial: &str,
        path: &str,
    ) -> Result<Vec<WorkItem>> {
        let sql = format!(
            "SELECT * FROM {} WHERE asset_item = ? AND asset_serial = ? AND hierarchy_path = ? \
             ORDER BY component_serial, component_item",
            self.items_table
        );
        let items = sqlx::query_as::<_, WorkItem>(&sql)
            .bind(asset_item)
            .bind(asset_serial)
            .bind(path)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    /// Append one operation-log row.
    pub async fn append_log(&self, entry: &OperationLogEntry) -> Result<()> {
        let sql = format!(
            r#"
            INSERT INTO {} (
                logged_at, environment, step_name, hierarchy_path,
                asset_item, asset_serial, dry_run, program, "transaction",
                success, error_text, raw_response
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            self.log_table
        );
        sqlx::query(&sql)
            .bind(&entry.logged_at)
            .bind(&entry.environment)
            .bind(&entry.step_name)
            .bind(&entry.hierarchy_path)
            .bind(&entry.asset_item)
            .bind(&entry.asset_serial)
            .bind(entry.dry_run)
            .bind(&entry.program)
            .bind(&entry.transaction)
            .bind(entry.success)
            .bind(&entry.error_text)
            .bind(&entry.raw_response)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Number of operation-log rows, used by tests and diagnostics.
    pub async fn log_count(&self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.log_table);
        let row: (i64,) = sqlx::query_as(&sql).fetch_one(&self.pool).await?;
        Ok(row.0)
    }
}

/// Carry success-like step state from a previous row into its re-imported
/// replacement. Generated identifiers and step timestamps travel with the
/// statuses that produced them.
fn carry_completed_state(new: &mut WorkItem, old: &WorkItem) {
    let carry = |slot: &mut Option<String>, previous: &Option<String>| {
        if slot.is_none() {
            if let Some(value) = previous {
                if status::is_ok_like(value) {
                    *slot = Some(value.clone());
                }
            }
        }
    };

    carry(&mut new.remove_status, &old.remove_status);
    carry(&mut new.add_property_status, &old.add_property_status);
    carry(&mut new.lookup_order_status, &old.lookup_order_status);
    carry(&mut new.rename_status, &old.rename_status);
    carry(&mut new.approve_status, &old.approve_status);
    carry(&mut new.assembly_status, &old.assembly_status);
    carry(&mut new.control_object_status, &old.control_object_status);
    carry(&mut new.generic_basic_status, &old.generic_basic_status);
    carry(&mut new.generic_whs_status, &old.generic_whs_status);
    carry(&mut new.master_data_status, &old.master_data_status);
    carry(&mut new.custom_field_status, &old.custom_field_status);
    carry(&mut new.install_status, &old.install_status);

    if new.planned_operation.is_none() {
        new.planned_operation = old.planned_operation.clone();
    }
    if new.work_order.is_none() {
        new.work_order = old.work_order.clone();
    }
    if new.removed_at.is_none() {
        new.removed_at = old.removed_at.clone();
    }
    if new.installed_at.is_none() {
        new.installed_at = old.installed_at.clone();
    }
}
