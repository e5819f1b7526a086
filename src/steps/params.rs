//! Fixed parameter values the remote system expects verbatim.
//!
//! These constants encode required vocabulary of the ERP configuration:
//! responsible-party code, warehouse, reason codes, the service id of the
//! renumbering property and the custom-field coordinates. Changing any of
//! them desynchronizes the tooling from the remote customizing.

/// Responsible party recorded on every change.
pub const RESPONSIBLE: &str = "MFDRENUM";

/// Warehouse the component stock movements book against.
pub const WAREHOUSE: &str = "100";

/// Removal reason code for the detach step.
pub const REMOVAL_REASON: &str = "U1";

/// Installation reason code for the attach step.
pub const INSTALL_REASON: &str = "I1";

/// Service id of the renumbering property on the equipment.
pub const RENUMBER_SERVICE: &str = "UMNUM";

/// Reported operation number on the assembly confirmation.
pub const ASSEMBLY_OPERATION: &str = "0010";

/// Custom-field coordinates for the wagon number extension field.
pub const CUSTOM_FIELD_FILE: &str = "EQUIPMENT";
pub const CUSTOM_FIELD_ID: &str = "WAGNO";
