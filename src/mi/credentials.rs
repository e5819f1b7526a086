//! # `.ionapi` Credential Handling
//!
//! Service-account credential files as exported from the ION API gateway.
//! File discovery routes by environment (live/test use separate tenants) and
//! falls back through a fixed preference list when several files exist.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::MiConfig;
use crate::constants::environments;
use crate::error::{Result, SparepartError};

/// File names tried, in order, when the directory holds several `.ionapi`
/// files and no explicit path was configured.
const PREFERRED_IONAPI_FILES: &[&str] = &[
    "MFD_Backend_Python.ionapi",
    "service_account.ionapi",
];

/// Per-environment backend credential file names.
fn env_file_name(environment: &str) -> &'static str {
    if environment == environments::TEST {
        "TST_MFD_Backend_Python.ionapi"
    } else {
        "MFD_Backend_Python.ionapi"
    }
}

/// Parsed `.ionapi` export. Field names follow the export format.
#[derive(Debug, Clone, Deserialize)]
pub struct IonApiCredentials {
    /// Token endpoint base URL
    pub pu: String,
    /// Token endpoint path
    pub ot: String,
    /// OAuth2 client id
    pub ci: String,
    /// OAuth2 client secret
    pub cs: String,
    /// Service account access key (username)
    pub saak: String,
    /// Service account secret key (password)
    pub sask: String,
    /// ION API gateway base URL
    #[serde(default)]
    pub iu: String,
    /// Tenant identifier
    #[serde(default)]
    pub ti: String,
}

impl IonApiCredentials {
    /// Load and parse a `.ionapi` file. Exports are UTF-8 with an optional
    /// BOM, depending on which tool produced them.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SparepartError::infrastructure(format!(".ionapi not readable: {}: {e}", path.display()))
        })?;
        let trimmed = raw.trim_start_matches('\u{feff}');
        serde_json::from_str(trimmed).map_err(|e| {
            SparepartError::infrastructure(format!(
                "invalid .ionapi file {}: {e}",
                path.display()
            ))
        })
    }

    /// Token endpoint URL
    pub fn token_url(&self) -> String {
        format!("{}{}", self.pu, self.ot)
    }

    /// API base URL including the tenant segment
    pub fn base_url(&self) -> Result<String> {
        let base = self.iu.trim_end_matches('/');
        if base.is_empty() || self.ti.is_empty() {
            return Err(SparepartError::infrastructure(
                ".ionapi file carries no 'iu' or 'ti' entry",
            ));
        }
        Ok(format!("{}/{}", base, self.ti))
    }
}

/// Locate the `.ionapi` file for an environment.
///
/// Resolution order: explicit configured path, `IONAPI_PATH` environment
/// variable, the environment's backend file, a single candidate in the
/// directory, then the preference list, then the lexicographically first
/// candidate.
pub fn find_ionapi_path(mi: &MiConfig, environment: &str) -> Result<PathBuf> {
    let validate = |path: PathBuf| -> Result<PathBuf> {
        if path.exists() {
            Ok(path)
        } else {
            Err(SparepartError::infrastructure(format!(
                ".ionapi file not found: {}",
                path.display()
            )))
        }
    };

    if let Some(explicit) = &mi.ionapi_path {
        return validate(explicit.clone());
    }
    if let Ok(env_path) = std::env::var("IONAPI_PATH") {
        return validate(PathBuf::from(env_path));
    }

    let env_file = mi.ionapi_dir.join(env_file_name(environment));
    if env_file.exists() {
        return Ok(env_file);
    }

    let mut candidates: Vec<PathBuf> = match std::fs::read_dir(&mi.ionapi_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "ionapi"))
            .collect(),
        Err(_) => Vec::new(),
    };
    candidates.sort();

    match candidates.len() {
        0 => Err(SparepartError::infrastructure(format!(
            "no .ionapi file found under {}; place one there or set IONAPI_PATH",
            mi.ionapi_dir.display()
        ))),
        1 => Ok(candidates.remove(0)),
        _ => {
            for preferred in PREFERRED_IONAPI_FILES {
                if let Some(found) = candidates
                    .iter()
                    .find(|c| c.file_name().is_some_and(|n| n == *preferred))
                {
                    return Ok(found.clone());
                }
            }
            let chosen = candidates.remove(0);
            tracing::warn!(
                chosen = %chosen.display(),
                "multiple .ionapi files found, using the first; set IONAPI_PATH to pick another"
            );
            Ok(chosen)
        }
    }
}
