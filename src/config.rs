//! Configuration loading from TOML files
//!
//! Every section is optional. A missing section falls back to the built-in
//! defaults, which reproduce the library's long-standing setup:
//! `mileage-chart.csv` in, `final-mileage.xlsx` out, the standard branch list.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MileageError;
use crate::locations::{BranchCode, LocationCodeMap};
use crate::parser::ParserSettings;
use crate::reference::{ReferenceTable, DEFAULT_INDEX_COLUMN};
use crate::report::DEFAULT_REPORT_PATH;

/// Default mileage chart location
pub const DEFAULT_REFERENCE_PATH: &str = "mileage-chart.csv";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Mileage chart CSV
    pub path: PathBuf,
    /// Header of the column listing row location codes
    pub index_column: String,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_REFERENCE_PATH),
            index_column: DEFAULT_INDEX_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Output artifact; the extension selects the format
    pub path: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_REPORT_PATH),
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MileageConfig {
    pub reference: ReferenceConfig,
    pub report: ReportConfig,
    pub parser: ParserSettings,
    /// Replaces the built-in branch list when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<BranchCode>>,
}

impl MileageConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MileageError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            MileageError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, MileageError> {
        let config: MileageConfig = toml::from_str(content)?;
        if config.parser.terminator.is_empty() {
            return Err(MileageError::Config(
                "parser.terminator must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    /// Branch map from the `branches` list, or the built-in table
    pub fn location_map(&self) -> Result<LocationCodeMap, MileageError> {
        match &self.branches {
            Some(entries) => LocationCodeMap::from_entries(entries),
            None => Ok(LocationCodeMap::default()),
        }
    }

    /// Load the configured mileage chart
    pub fn load_reference(&self) -> Result<ReferenceTable, MileageError> {
        ReferenceTable::load(&self.reference.path, &self.reference.index_column)
    }
}
