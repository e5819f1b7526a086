//! # Configuration Management
//!
//! Layered configuration for the renumbering core: built-in defaults, an
//! optional TOML file, then `SPAREPART_*` environment overrides. The loaded
//! struct is plain data; components receive the sections they need at
//! construction time.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::environments;
use crate::error::{Result, SparepartError};

/// Top-level configuration for the renumbering core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SparepartConfig {
    /// Target environment, `live` or `test`
    pub environment: String,
    pub database: DatabaseConfig,
    pub mi: MiConfig,
    pub pipeline: PipelineConfig,
}

/// SQLite cache database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the cache database shared with the loader apps
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Remote MI transaction service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MiConfig {
    /// Directory holding the `.ionapi` service-account files
    pub ionapi_dir: PathBuf,
    /// Explicit `.ionapi` file, overrides per-environment routing
    pub ionapi_path: Option<PathBuf>,
    /// Request timeout for one MI call, seconds
    pub timeout_secs: u64,
    /// Token request timeout, seconds
    pub token_timeout_secs: u64,
}

/// Pipeline execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Execute the full pipeline without issuing remote calls
    pub dry_run: bool,
    /// Default retry policy for steps that wait on a generated value
    pub retry: RetryConfig,
    /// Per-step retry overrides, keyed by step name
    pub step_retries: HashMap<String, RetryConfig>,
}

/// Retry policy for one step. Operator-tunable; the defaults match the most
/// common values found in operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for SparepartConfig {
    fn default() -> Self {
        Self {
            environment: environments::LIVE.to_string(),
            database: DatabaseConfig::default(),
            mi: MiConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/cache.db"),
            max_connections: 5,
        }
    }
}

impl Default for MiConfig {
    fn default() -> Self {
        Self {
            ionapi_dir: PathBuf::from("credentials/ionapi"),
            ionapi_path: None,
            timeout_secs: 60,
            token_timeout_secs: 30,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            retry: RetryConfig::default(),
            step_retries: HashMap::new(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 2000,
        }
    }
}

impl SparepartConfig {
    /// Load configuration: defaults, then `config/sparepart.toml` if present,
    /// then `SPAREPART_*` environment variables (`SPAREPART_ENVIRONMENT`,
    /// `SPAREPART_DATABASE__PATH`, ...).
    pub fn load() -> Result<Self> {
        Self::load_from(PathBuf::from("config/sparepart.toml"))
    }

    /// Load configuration with an explicit file location
    pub fn load_from(file: PathBuf) -> Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .add_source(
                config::Environment::with_prefix("SPAREPART")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings = builder
            .build()
            .map_err(|e| SparepartError::configuration(e.to_string()))?;

        let mut cfg: SparepartConfig = settings
            .try_deserialize()
            .map_err(|e| SparepartError::configuration(e.to_string()))?;
        cfg.environment = cfg.environment.to_lowercase();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.environment != environments::LIVE && self.environment != environments::TEST {
            return Err(SparepartError::configuration(format!(
                "unknown environment '{}', expected 'live' or 'test'",
                self.environment
            )));
        }
        if self.pipeline.retry.max_attempts == 0 {
            return Err(SparepartError::configuration(
                "retry.max_attempts must be at least 1",
            ));
        }
        Ok(())
    }

    /// Retry policy for a named step, falling back to the pipeline default
    pub fn retry_for(&self, step_name: &str) -> RetryConfig {
        self.pipeline.retry_for(step_name)
    }
}

impl PipelineConfig {
    /// Retry policy for a named step, falling back to the default
    pub fn retry_for(&self, step_name: &str) -> RetryConfig {
        self.step_retries
            .get(step_name)
            .copied()
            .unwrap_or(self.retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = SparepartConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.environment, "live");
        assert_eq!(cfg.pipeline.retry.max_attempts, 3);
    }

    #[test]
    fn per_step_retry_override() {
        let mut cfg = SparepartConfig::default();
        cfg.pipeline.step_retries.insert(
            "lookup-work-order".to_string(),
            RetryConfig {
                max_attempts: 5,
                delay_ms: 500,
            },
        );
        assert_eq!(cfg.retry_for("lookup-work-order").max_attempts, 5);
        assert_eq!(cfg.retry_for("approve").max_attempts, 3);
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let cfg = SparepartConfig {
            environment: "staging".to_string(),
            ..SparepartConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
