//! Error types for Visual Mileage

use thiserror::Error;

/// Errors that abort a mileage run
#[derive(Debug, Error)]
pub enum MileageError {
    #[error("Failed to parse {field} on entry ending at line {line}: {text:?}")]
    ParseError {
        line: usize,
        field: &'static str,
        text: String,
    },

    #[error("Unknown branch name: {0:?}")]
    UnknownBranch(String),

    #[error("No reference distance from {from} to {to}")]
    MissingDistance { from: String, to: String },

    #[error("Invalid reference table: {0}")]
    ReferenceTable(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Report writing error: {0}")]
    Report(String),

    #[error("Unsupported report format: {0}")]
    UnsupportedFormat(String),
}

impl MileageError {
    /// True for the lookup failures (unknown name or missing table entry)
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            MileageError::UnknownBranch(_) | MileageError::MissingDistance { .. }
        )
    }
}

#[cfg(feature = "xlsx")]
impl From<rust_xlsxwriter::XlsxError> for MileageError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        MileageError::Report(e.to_string())
    }
}

impl From<toml::de::Error> for MileageError {
    fn from(e: toml::de::Error) -> Self {
        MileageError::Config(e.to_string())
    }
}
