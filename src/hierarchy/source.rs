//! # Master-Data Hierarchy Source
//!
//! [`HierarchySource`] implementation over the MI transaction service:
//! `MOS256MI/LstAsBuild` lists the as-built structure of a serialized
//! asset, expanded over its full history.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::hierarchy::{HierarchySource, RawComponentRecord};
use crate::mi::TransactionService;

/// As-built lookup via `MOS256MI`.
pub struct MiHierarchySource {
    service: Arc<dyn TransactionService>,
}

impl MiHierarchySource {
    pub fn new(service: Arc<dyn TransactionService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl HierarchySource for MiHierarchySource {
    async fn lookup_hierarchy(
        &self,
        asset_item: &str,
        asset_serial: &str,
    ) -> Result<Vec<RawComponentRecord>> {
        let mut params = BTreeMap::new();
        params.insert("MTRL".to_string(), asset_item.to_string());
        params.insert("SERN".to_string(), asset_serial.to_string());
        // Expand the structure and include removed positions; both flags
        // are required to see the full history.
        params.insert("EXPA".to_string(), "1".to_string());
        params.insert("MEVA".to_string(), "1".to_string());

        let response = self
            .service
            .call("MOS256MI", "LstAsBuild", &params)
            .await?;

        let mut records = Vec::new();
        for result in &response.results {
            for row in &result.records {
                let field = |name: &str| -> String {
                    row.get(name)
                        .map(|v| match v {
                            serde_json::Value::String(s) => s.clone(),
                            serde_json::Value::Null => String::new(),
                            other => other.to_string(),
                        })
                        .unwrap_or_default()
                        .trim()
                        .to_string()
                };
                records.push(RawComponentRecord {
                    path: field("CFGP"),
                    parent_item: field("PMTL"),
                    parent_serial: field("PSER"),
                    component_item: field("MTRL"),
                    component_serial: field("SERN"),
                    removal_timestamp: field("RMDT"),
                    component_type: field("EQTP"),
                    component_type_alt: field("ITTY"),
                });
            }
        }
        Ok(records)
    }
}
