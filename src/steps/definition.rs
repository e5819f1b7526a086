//! # Step Definitions
//!
//! One enum variant per remote operation of the renumbering pipeline. Each
//! variant knows its MI program/transaction, the status column it owns, the
//! generated value it extracts (if any) and how to build its parameter set
//! from a work item.
//!
//! Parameter building doubles as pre-call validation: a missing required
//! input yields a `Validation` error and the step never reaches the remote
//! service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SparepartError};
use crate::models::WorkItem;
use crate::steps::params;
use crate::steps::RunContext;

/// How a step's generated output value is extracted and where it lands.
#[derive(Debug, Clone, Copy)]
pub struct ExtractSpec {
    /// Candidate response field names, tried in this order
    pub candidates: &'static [&'static str],
    /// Work-item column the extracted value is stored into
    pub store_column: &'static str,
    /// Operator-facing name used in the terminal "fehlt" error
    pub value_name: &'static str,
}

/// The fixed catalogue of pipeline steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepDefinition {
    RemoveComponent,
    AddProperty,
    LookupWorkOrder,
    ChangeSerial,
    Approve,
    Assembly,
    UpdateControlObject,
    GenericItemBasic,
    GenericItemWhs,
    UpdateMasterData,
    UpdateCustomField,
    InstallComponent,
}

impl StepDefinition {
    /// Stable step name, used in logs, configuration and job output.
    pub fn name(self) -> &'static str {
        match self {
            Self::RemoveComponent => "remove-component",
            Self::AddProperty => "add-property",
            Self::LookupWorkOrder => "lookup-work-order",
            Self::ChangeSerial => "change-serial",
            Self::Approve => "approve",
            Self::Assembly => "assembly",
            Self::UpdateControlObject => "update-control-object",
            Self::GenericItemBasic => "generic-item-basic",
            Self::GenericItemWhs => "generic-item-whs",
            Self::UpdateMasterData => "update-master-data",
            Self::UpdateCustomField => "update-custom-field",
            Self::InstallComponent => "install-component",
        }
    }

    /// MI program the step executes against.
    pub fn program(self) -> &'static str {
        match self {
            Self::RemoveComponent | Self::InstallComponent => "MOS125MI",
            Self::AddProperty => "MOS160MI",
            Self::LookupWorkOrder => "MOS170MI",
            Self::ChangeSerial => "MOS306MI",
            Self::Approve | Self::Assembly => "MOS100MI",
            Self::UpdateControlObject => "MOS045MI",
            Self::GenericItemBasic | Self::GenericItemWhs => "MMS200MI",
            Self::UpdateMasterData => "MOS250MI",
            Self::UpdateCustomField => "CUSEXTMI",
        }
    }

    /// MI transaction name.
    pub fn transaction(self) -> &'static str {
        match self {
            Self::RemoveComponent => "Remove",
            Self::AddProperty => "AddProperty",
            Self::LookupWorkOrder => "Get",
            Self::ChangeSerial => "ChgNumber",
            Self::Approve => "Approve",
            Self::Assembly => "Report",
            Self::UpdateControlObject => "Upd",
            Self::GenericItemBasic => "UpdItmBasic",
            Self::GenericItemWhs => "UpdItmWhs",
            Self::UpdateMasterData => "UpdEquipment",
            Self::UpdateCustomField => "ChgFieldValue",
            Self::InstallComponent => "Install",
        }
    }

    /// The status column this step owns.
    pub fn status_column(self) -> &'static str {
        match self {
            Self::RemoveComponent => "remove_status",
            Self::AddProperty => "add_property_status",
            Self::LookupWorkOrder => "lookup_order_status",
            Self::ChangeSerial => "rename_status",
            Self::Approve => "approve_status",
            Self::Assembly => "assembly_status",
            Self::UpdateControlObject => "control_object_status",
            Self::GenericItemBasic => "generic_basic_status",
            Self::GenericItemWhs => "generic_whs_status",
            Self::UpdateMasterData => "master_data_status",
            Self::UpdateCustomField => "custom_field_status",
            Self::InstallComponent => "install_status",
        }
    }

    /// Timestamp column of the terminal remove/install steps.
    pub fn timestamp_column(self) -> Option<&'static str> {
        match self {
            Self::RemoveComponent => Some("removed_at"),
            Self::InstallComponent => Some("installed_at"),
            _ => None,
        }
    }

    /// Generated output value of the step, if it produces one.
    pub fn extract_spec(self) -> Option<ExtractSpec> {
        match self {
            Self::AddProperty => Some(ExtractSpec {
                candidates: &["PLPN", "PLNO"],
                store_column: "planned_operation",
                value_name: "PLPN",
            }),
            Self::LookupWorkOrder => Some(ExtractSpec {
                candidates: &["MWNO", "ORNO"],
                store_column: "work_order",
                value_name: "MWNO",
            }),
            _ => None,
        }
    }

    /// Whether an absent output value is retried. Only the work-order
    /// lookup waits on asynchronous downstream materialization.
    pub fn retries_on_missing_value(self) -> bool {
        matches!(self, Self::LookupWorkOrder)
    }

    /// Whether the step applies to this item at all. Wagon-level
    /// master-data steps run once, on the root item, and only when the run
    /// renames the wagon itself.
    pub fn is_applicable(self, item: &WorkItem, ctx: &RunContext) -> bool {
        match self {
            Self::GenericItemBasic
            | Self::GenericItemWhs
            | Self::UpdateMasterData
            | Self::UpdateCustomField => ctx.renumber_wagon && item.is_root(),
            _ => true,
        }
    }

    /// Build the step's flat parameter set from the work item.
    ///
    /// Every mapping is fixed and exhaustive; a missing required input is a
    /// `Validation` error and short-circuits before any remote call.
    pub fn build_params(
        self,
        item: &WorkItem,
        ctx: &RunContext,
    ) -> Result<BTreeMap<String, String>> {
        let mut p = BTreeMap::new();
        match self {
            Self::RemoveComponent => {
                let date = required_date(ctx)?;
                let (mtrl, sern) = subject_ids(item);
                require(&mtrl, "component_item")?;
                require(&sern, "component_serial")?;
                if !item.is_root() {
                    require(&item.parent_item, "parent_item")?;
                    require(&item.parent_serial, "parent_serial")?;
                    p.insert("PMTL".into(), item.parent_item.clone());
                    p.insert("PSER".into(), item.parent_serial.clone());
                }
                p.insert("MTRL".into(), mtrl);
                p.insert("SERN".into(), sern);
                p.insert("RMDT".into(), date);
                p.insert("RMRE".into(), params::REMOVAL_REASON.into());
                p.insert("WHLO".into(), params::WAREHOUSE.into());
                p.insert("RESP".into(), params::RESPONSIBLE.into());
            }
            Self::AddProperty => {
                let (mtrl, sern) = subject_ids(item);
                require(&mtrl, "component_item")?;
                require(&sern, "component_serial")?;
                p.insert("MTRL".into(), mtrl);
                p.insert("SERN".into(), sern);
                p.insert("SERV".into(), params::RENUMBER_SERVICE.into());
                p.insert("RESP".into(), params::RESPONSIBLE.into());
            }
            Self::LookupWorkOrder => {
                let plpn = item
                    .planned_operation
                    .as_deref()
                    .filter(|v| !v.is_empty())
                    .ok_or_else(|| {
                        SparepartError::validation("PLPN", "no planned operation recorded yet")
                    })?;
                p.insert("PLPN".into(), plpn.to_string());
            }
            Self::ChangeSerial => {
                let targets = item.rename_targets().ok_or_else(|| {
                    SparepartError::validation(
                        "new_component_item",
                        "no target identifiers derived for this item",
                    )
                })?;
                let (mtrl, sern) = subject_ids(item);
                require(&mtrl, "component_item")?;
                require(&sern, "component_serial")?;
                p.insert("MTRL".into(), mtrl);
                p.insert("SERN".into(), sern);
                p.insert("NWMT".into(), targets.item);
                p.insert("NWSN".into(), targets.serial);
                p.insert("RESP".into(), params::RESPONSIBLE.into());
            }
            Self::Approve => {
                let mwno = required_work_order(item)?;
                p.insert("MWNO".into(), mwno);
                p.insert("RESP".into(), params::RESPONSIBLE.into());
            }
            Self::Assembly => {
                let mwno = required_work_order(item)?;
                p.insert("MWNO".into(), mwno);
                p.insert("OPNO".into(), params::ASSEMBLY_OPERATION.into());
                p.insert("RESP".into(), params::RESPONSIBLE.into());
            }
            Self::UpdateControlObject => {
                let targets = item.rename_targets().ok_or_else(|| {
                    SparepartError::validation(
                        "new_component_item",
                        "no target identifiers derived for this item",
                    )
                })?;
                let (mtrl, sern) = subject_ids(item);
                require(&mtrl, "component_item")?;
                p.insert("MTRL".into(), mtrl);
                p.insert("SERN".into(), sern);
                p.insert("NWMT".into(), targets.item);
                p.insert("NWSN".into(), targets.serial);
            }
            Self::GenericItemBasic => {
                require(&item.new_asset_item, "new_asset_item")?;
                p.insert("ITNO".into(), item.new_asset_item.clone());
                p.insert("RESP".into(), params::RESPONSIBLE.into());
            }
            Self::GenericItemWhs => {
                require(&item.new_asset_item, "new_asset_item")?;
                p.insert("ITNO".into(), item.new_asset_item.clone());
                p.insert("WHLO".into(), params::WAREHOUSE.into());
            }
            Self::UpdateMasterData => {
                require(&item.new_asset_item, "new_asset_item")?;
                require(&item.new_asset_serial, "new_asset_serial")?;
                p.insert("MTRL".into(), item.new_asset_item.clone());
                p.insert("SERN".into(), item.new_asset_serial.clone());
            }
            Self::UpdateCustomField => {
                require(&item.new_asset_item, "new_asset_item")?;
                require(&item.new_asset_serial, "new_asset_serial")?;
                p.insert("FILE".into(), params::CUSTOM_FIELD_FILE.into());
                p.insert("PK01".into(), item.new_asset_item.clone());
                p.insert("PK02".into(), item.new_asset_serial.clone());
                p.insert("FLDI".into(), params::CUSTOM_FIELD_ID.into());
                p.insert("FLDV".into(), item.new_asset_serial.clone());
            }
            Self::InstallComponent => {
                let date = required_date(ctx)?;
                let (mtrl, sern) = install_ids(item);
                require(&mtrl, "component_item")?;
                require(&sern, "component_serial")?;
                if !item.is_root() {
                    require(&item.parent_item, "parent_item")?;
                    require(&item.parent_serial, "parent_serial")?;
                    p.insert("PMTL".into(), item.parent_item.clone());
                    p.insert("PSER".into(), item.parent_serial.clone());
                }
                p.insert("MTRL".into(), mtrl);
                p.insert("SERN".into(), sern);
                p.insert("INDT".into(), date);
                p.insert("INRE".into(), params::INSTALL_REASON.into());
                p.insert("WHLO".into(), params::WAREHOUSE.into());
                p.insert("RESP".into(), params::RESPONSIBLE.into());
            }
        }
        Ok(p)
    }
}

/// The item/serial pair a structural step addresses: the component at this
/// node, or the asset itself at the root node.
fn subject_ids(item: &WorkItem) -> (String, String) {
    if item.is_root() {
        (item.asset_item.clone(), item.asset_serial.clone())
    } else {
        (item.component_item.clone(), item.component_serial.clone())
    }
}

/// Identifiers to install under: the renamed pair when a rename target
/// exists, otherwise the original pair.
fn install_ids(item: &WorkItem) -> (String, String) {
    match item.rename_targets() {
        Some(targets) => (targets.item, targets.serial),
        None => subject_ids(item),
    }
}

fn required_work_order(item: &WorkItem) -> Result<String> {
    item.work_order
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SparepartError::validation("MWNO", "no work order recorded yet"))
}

fn required_date(ctx: &RunContext) -> Result<String> {
    ctx.change_date
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SparepartError::validation("change_date", "no change date set for the run"))
}

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(SparepartError::validation(
            field,
            "required field is empty",
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RunContext {
        RunContext {
            environment: "test".to_string(),
            dry_run: false,
            change_date: Some("20260805".to_string()),
            renumber_wagon: true,
        }
    }

    fn item() -> WorkItem {
        WorkItem {
            hierarchy_path: "1-1-1".to_string(),
            asset_item: "WAGX".to_string(),
            asset_serial: "OLD123".to_string(),
            component_item: "DG-OLD123".to_string(),
            component_serial: "S-OLD123-A".to_string(),
            parent_item: "UF".to_string(),
            parent_serial: "UFS".to_string(),
            new_asset_item: "NEWX".to_string(),
            new_asset_serial: "NEW123".to_string(),
            new_component_item: "DG-NEW123".to_string(),
            new_component_serial: "S-NEW123-A".to_string(),
            ..WorkItem::default()
        }
    }

    #[test]
    fn remove_params_carry_reason_and_warehouse() {
        let p = StepDefinition::RemoveComponent
            .build_params(&item(), &ctx())
            .unwrap();
        assert_eq!(p.get("MTRL").unwrap(), "DG-OLD123");
        assert_eq!(p.get("PMTL").unwrap(), "UF");
        assert_eq!(p.get("RMRE").unwrap(), params::REMOVAL_REASON);
        assert_eq!(p.get("WHLO").unwrap(), params::WAREHOUSE);
        assert_eq!(p.get("RMDT").unwrap(), "20260805");
    }

    #[test]
    fn remove_without_resolved_parent_fails_validation() {
        let mut orphan = item();
        orphan.parent_item.clear();
        orphan.parent_serial.clear();
        let err = StepDefinition::RemoveComponent
            .build_params(&orphan, &ctx())
            .unwrap_err();
        assert!(matches!(err, SparepartError::Validation { .. }));
    }

    #[test]
    fn remove_without_change_date_fails_validation() {
        let mut no_date = ctx();
        no_date.change_date = None;
        let err = StepDefinition::RemoveComponent
            .build_params(&item(), &no_date)
            .unwrap_err();
        assert!(matches!(err, SparepartError::Validation { .. }));
    }

    #[test]
    fn lookup_requires_planned_operation() {
        let err = StepDefinition::LookupWorkOrder
            .build_params(&item(), &ctx())
            .unwrap_err();
        assert!(matches!(err, SparepartError::Validation { .. }));

        let mut ready = item();
        ready.planned_operation = Some("990001".to_string());
        let p = StepDefinition::LookupWorkOrder
            .build_params(&ready, &ctx())
            .unwrap();
        assert_eq!(p.get("PLPN").unwrap(), "990001");
    }

    #[test]
    fn rename_uses_derived_targets() {
        let p = StepDefinition::ChangeSerial
            .build_params(&item(), &ctx())
            .unwrap();
        assert_eq!(p.get("NWMT").unwrap(), "DG-NEW123");
        assert_eq!(p.get("NWSN").unwrap(), "S-NEW123-A");
    }

    #[test]
    fn rename_without_derivation_fails_validation() {
        let mut underivable = item();
        underivable.new_component_item.clear();
        underivable.new_component_serial.clear();
        let err = StepDefinition::ChangeSerial
            .build_params(&underivable, &ctx())
            .unwrap_err();
        assert!(matches!(err, SparepartError::Validation { .. }));
    }

    #[test]
    fn root_item_steps_target_the_asset() {
        let root = WorkItem {
            hierarchy_path: "1".to_string(),
            asset_item: "WAGX".to_string(),
            asset_serial: "OLD123".to_string(),
            new_asset_item: "NEWX".to_string(),
            new_asset_serial: "NEW123".to_string(),
            ..WorkItem::default()
        };
        let p = StepDefinition::ChangeSerial.build_params(&root, &ctx()).unwrap();
        assert_eq!(p.get("MTRL").unwrap(), "WAGX");
        assert_eq!(p.get("NWMT").unwrap(), "NEWX");
        assert_eq!(p.get("NWSN").unwrap(), "NEW123");
        // Root removal carries no parent position.
        let p = StepDefinition::RemoveComponent.build_params(&root, &ctx()).unwrap();
        assert!(!p.contains_key("PMTL"));
    }

    #[test]
    fn wagon_level_steps_apply_only_to_root() {
        let root = WorkItem {
            hierarchy_path: "1".to_string(),
            ..WorkItem::default()
        };
        let component = item();
        let context = ctx();
        for step in [
            StepDefinition::GenericItemBasic,
            StepDefinition::GenericItemWhs,
            StepDefinition::UpdateMasterData,
            StepDefinition::UpdateCustomField,
        ] {
            assert!(step.is_applicable(&root, &context));
            assert!(!step.is_applicable(&component, &context));
        }
        let mut part_only = context.clone();
        part_only.renumber_wagon = false;
        assert!(!StepDefinition::UpdateMasterData.is_applicable(&root, &part_only));
    }

    #[test]
    fn install_prefers_renamed_identifiers() {
        let p = StepDefinition::InstallComponent
            .build_params(&item(), &ctx())
            .unwrap();
        assert_eq!(p.get("MTRL").unwrap(), "DG-NEW123");
        assert_eq!(p.get("INRE").unwrap(), params::INSTALL_REASON);
    }

    #[test]
    fn only_the_work_order_lookup_retries() {
        for step in [
            StepDefinition::RemoveComponent,
            StepDefinition::AddProperty,
            StepDefinition::ChangeSerial,
            StepDefinition::InstallComponent,
        ] {
            assert!(!step.retries_on_missing_value());
        }
        assert!(StepDefinition::LookupWorkOrder.retries_on_missing_value());
    }
}
