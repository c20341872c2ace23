//! Compiler configuration.
//!
//! Settings are read from a `docbridge.toml` file. A `.env` file next to it
//! is loaded first, and the following environment variables override the
//! file:
//!
//! - `DOCBRIDGE_ID_COLUMN` - column that receives generated identifiers
//! - `DOCBRIDGE_CONFLICT_POLICY` - `overwrite` or `merge`
//! - `DOCBRIDGE_ID_STORAGE_TYPE` - storage type of generated identifiers

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::compiler::StorageType;
use crate::error::{DbError, DbResult};

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "docbridge.toml";

/// Environment variable names
pub const ENV_ID_COLUMN: &str = "DOCBRIDGE_ID_COLUMN";
pub const ENV_CONFLICT_POLICY: &str = "DOCBRIDGE_CONFLICT_POLICY";
pub const ENV_ID_STORAGE_TYPE: &str = "DOCBRIDGE_ID_STORAGE_TYPE";

/// What to do when two constraints target the same column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// The later constraint replaces the earlier one
    #[default]
    Overwrite,
    /// Disjoint operators are intersected; anything else is rejected
    Merge,
}

impl FromStr for ConflictPolicy {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Ok(ConflictPolicy::Overwrite),
            "merge" => Ok(ConflictPolicy::Merge),
            other => Err(DbError::ConfigError(format!(
                "unknown conflict policy '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictPolicy::Overwrite => f.write_str("overwrite"),
            ConflictPolicy::Merge => f.write_str("merge"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Column that receives the generated identifier on insert
    #[serde(default = "default_id_column")]
    pub id_column: String,
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,
    /// Storage type of generated identifiers when the insert does not
    /// declare the id field itself
    #[serde(default = "default_id_storage_type")]
    pub id_storage_type: StorageType,
}

fn default_id_column() -> String {
    "id".to_string()
}

fn default_id_storage_type() -> StorageType {
    StorageType::ObjectId
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            id_column: default_id_column(),
            conflict_policy: ConflictPolicy::default(),
            id_storage_type: default_id_storage_type(),
        }
    }
}

impl CompilerConfig {
    /// Load configuration from a directory.
    ///
    /// A missing config file is not an error; defaults are used and the
    /// environment overrides still apply.
    pub fn load(dir: &Path) -> DbResult<Self> {
        let env_path = dir.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }

        let config_path = dir.join(CONFIG_FILE_NAME);
        let config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            Self::default()
        };
        config.with_env_overrides()
    }

    /// Parse a TOML config file without applying overrides
    pub fn from_file(path: &Path) -> DbResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> DbResult<Self> {
        let config: CompilerConfig =
            toml::from_str(content).map_err(|e| DbError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> DbResult<Self> {
        if let Ok(id_column) = std::env::var(ENV_ID_COLUMN) {
            if !id_column.is_empty() {
                self.id_column = id_column;
            }
        }

        if let Ok(policy) = std::env::var(ENV_CONFLICT_POLICY) {
            if !policy.is_empty() {
                self.conflict_policy = policy.parse()?;
            }
        }

        if let Ok(storage_type) = std::env::var(ENV_ID_STORAGE_TYPE) {
            if !storage_type.is_empty() {
                self.id_storage_type = StorageType::from(storage_type.trim());
            }
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> DbResult<()> {
        if self.id_column.trim().is_empty() {
            return Err(DbError::ConfigError("id_column must not be empty".to_string()));
        }
        Ok(())
    }
}
