use std::{fs::File, io::Read, path::Path};

use serde::{Deserialize, Serialize};

use crate::database::dialect::{DialectLimits, SqlDialect};
use crate::database::error::ConfigurationError;
use crate::database::planner::{EncodingMode, DEFAULT_LITERAL_BATCH_SIZE};

pub const YAML_CONFIG_NAME: &str = "rbulk.yaml";

pub const DEFAULT_UNION_SEPARATOR: &str = "UNION ALL";

fn default_union_separator() -> String {
    DEFAULT_UNION_SEPARATOR.to_string()
}

fn default_batch_size() -> usize {
    DEFAULT_LITERAL_BATCH_SIZE
}

/// Settings for one bulk write run.
///
/// Limits not given in the file fall back to the dialect's presets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkConfig {
    #[serde(default)]
    pub dialect: SqlDialect,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<DialectLimits>,

    #[serde(default = "default_union_separator")]
    pub union_separator: String,

    /// Rows per statement in literal-value mode.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub encoding: EncodingMode,
}

impl Default for BulkConfig {
    fn default() -> Self {
        BulkConfig::new(SqlDialect::default())
    }
}

impl BulkConfig {
    pub fn new(dialect: SqlDialect) -> Self {
        BulkConfig {
            dialect,
            limits: None,
            union_separator: default_union_separator(),
            batch_size: default_batch_size(),
            encoding: EncodingMode::default(),
        }
    }

    pub fn with_limits(mut self, limits: DialectLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_encoding(mut self, encoding: EncodingMode) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_union_separator(mut self, union_separator: impl Into<String>) -> Self {
        self.union_separator = union_separator.into();
        self
    }

    pub fn limits(&self) -> DialectLimits {
        self.limits.unwrap_or_else(|| self.dialect.default_limits())
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let limits = self.limits();
        limits.validate()?;

        if self.union_separator.trim().is_empty() {
            return Err(ConfigurationError::EmptyUnionSeparator);
        }
        if self.batch_size == 0 {
            return Err(ConfigurationError::ZeroBatchSize);
        }
        if let Some(limit) = limits.max_compound_select {
            if self.batch_size > limit {
                return Err(ConfigurationError::CompoundSelectLimitExceeded {
                    dialect: self.dialect.name(),
                    batch_size: self.batch_size,
                    limit,
                });
            }
        }

        Ok(())
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ReadConfigError> {
        let config: BulkConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ReadConfigError {
    #[error("Could not open config file: {0}")]
    CouldNotOpenFile(#[from] std::io::Error),

    #[error("Could not parse config file: {0}")]
    CouldNotParse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] ConfigurationError),
}

pub fn read_config(file_path: &Path) -> Result<BulkConfig, ReadConfigError> {
    let mut file = File::open(file_path)?;
    let mut contents = String::new();

    file.read_to_string(&mut contents)?;

    BulkConfig::from_yaml_str(&contents)
}
