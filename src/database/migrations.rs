//! Schema creation for the renumbering tables.
//!
//! The cache database is shared with the loader apps, which create their
//! own tables on demand; this module does the same for the renumbering
//! tables. Statements are idempotent (`CREATE TABLE IF NOT EXISTS`) and run
//! once per store construction.

use sqlx::SqlitePool;

use crate::constants::environments;
use crate::error::Result;

/// Environment-suffixed work-item table name.
pub fn items_table(environment: &str) -> String {
    format!("renumber_items{}", environments::table_suffix(environment))
}

/// Environment-suffixed operation-log table name.
pub fn log_table(environment: &str) -> String {
    format!("mi_operation_log{}", environments::table_suffix(environment))
}

/// Create the renumbering tables for one environment if absent.
pub async fn ensure_schema(pool: &SqlitePool, environment: &str) -> Result<()> {
    let items = items_table(environment);
    let log = log_table(environment);

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {items} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            hierarchy_path TEXT NOT NULL,
            asset_item TEXT NOT NULL,
            asset_serial TEXT NOT NULL,
            component_item TEXT NOT NULL DEFAULT '',
            component_serial TEXT NOT NULL DEFAULT '',
            parent_item TEXT NOT NULL DEFAULT '',
            parent_serial TEXT NOT NULL DEFAULT '',
            removal_timestamp TEXT NOT NULL DEFAULT '',
            new_asset_item TEXT NOT NULL DEFAULT '',
            new_asset_serial TEXT NOT NULL DEFAULT '',
            new_component_item TEXT NOT NULL DEFAULT '',
            new_component_serial TEXT NOT NULL DEFAULT '',
            remove_status TEXT,
            add_property_status TEXT,
            planned_operation TEXT,
            lookup_order_status TEXT,
            work_order TEXT,
            rename_status TEXT,
            approve_status TEXT,
            assembly_status TEXT,
            control_object_status TEXT,
            generic_basic_status TEXT,
            generic_whs_status TEXT,
            master_data_status TEXT,
            custom_field_status TEXT,
            install_status TEXT,
            removed_at TEXT,
            installed_at TEXT,
            sequence_number INTEGER NOT NULL DEFAULT 0
        )
        "#
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {log} (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            logged_at TEXT NOT NULL,
            environment TEXT NOT NULL,
            step_name TEXT NOT NULL,
            hierarchy_path TEXT NOT NULL,
            asset_item TEXT NOT NULL,
            asset_serial TEXT NOT NULL,
            dry_run INTEGER NOT NULL DEFAULT 0,
            program TEXT NOT NULL,
            "transaction" TEXT NOT NULL,
            success INTEGER NOT NULL DEFAULT 0,
            error_text TEXT,
            raw_response TEXT
        )
        "#
    ))
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_env_suffixed() {
        assert_eq!(items_table("live"), "renumber_items");
        assert_eq!(items_table("test"), "renumber_items_test");
        assert_eq!(log_table("test"), "mi_operation_log_test");
    }
}
