//! Report writing
//!
//! Writes the finished legs as a four-column table
//! (Date, From Branch, To Branch, Distance) without an index column.
//! The artifact is rendered completely before anything touches the disk.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MileageError;
use crate::types::{Leg, REPORT_COLUMNS};

/// Default artifact name, matching what the office has always received
pub const DEFAULT_REPORT_PATH: &str = "final-mileage.xlsx";

/// Output artifact format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Excel workbook with a frozen header row
    Xlsx,
    /// Comma-separated values with a header row
    Csv,
    /// JSON array of row objects
    Json,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Xlsx => "xlsx",
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }

    /// Infer the format from a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self, MileageError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "xlsx" => Ok(ReportFormat::Xlsx),
            "csv" => Ok(ReportFormat::Csv),
            "json" => Ok(ReportFormat::Json),
            _ => Err(MileageError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Write the report, overwriting any existing file at `path`
pub fn write_report(legs: &[Leg], path: &Path, format: ReportFormat) -> Result<(), MileageError> {
    match format {
        ReportFormat::Csv => fs::write(path, render_csv(legs)?)?,
        ReportFormat::Json => fs::write(path, render_json(legs)?)?,
        ReportFormat::Xlsx => write_xlsx(legs, path)?,
    }
    Ok(())
}

/// Render the report as CSV text
pub fn render_csv(legs: &[Leg]) -> Result<String, MileageError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    wtr.write_record(REPORT_COLUMNS)?;
    for leg in legs {
        wtr.serialize(leg)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| MileageError::Report(e.error().to_string()))?;
    String::from_utf8(bytes).map_err(|e| MileageError::Report(e.to_string()))
}

/// Render the report as a pretty-printed JSON array
pub fn render_json(legs: &[Leg]) -> Result<String, MileageError> {
    Ok(serde_json::to_string_pretty(legs)?)
}

#[cfg(feature = "xlsx")]
fn write_xlsx(legs: &[Leg], path: &Path) -> Result<(), MileageError> {
    use rust_xlsxwriter::{Format, Workbook};

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();

    for (col, title) in REPORT_COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *title, &header)?;
    }
    worksheet.set_freeze_panes(1, 0)?;
    worksheet.set_column_width(0, 12)?;
    worksheet.set_column_width(1, 26)?;
    worksheet.set_column_width(2, 26)?;

    for (idx, leg) in legs.iter().enumerate() {
        let row = (idx + 1) as u32;
        worksheet.write_string(row, 0, leg.date.format("%Y-%m-%d").to_string())?;
        worksheet.write_string(row, 1, leg.from.as_str())?;
        worksheet.write_string(row, 2, leg.to.as_str())?;
        worksheet.write_number(row, 3, leg.distance)?;
    }

    workbook.save(path)?;
    Ok(())
}

#[cfg(not(feature = "xlsx"))]
fn write_xlsx(_legs: &[Leg], path: &Path) -> Result<(), MileageError> {
    Err(MileageError::UnsupportedFormat(format!(
        "{} (built without the xlsx feature)",
        path.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn legs() -> Vec<Leg> {
        vec![
            Leg {
                date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                from: "Main Library".to_string(),
                to: "Birmingham Branch".to_string(),
                distance: 5.1,
            },
            Leg {
                date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                from: "Birmingham Branch".to_string(),
                to: "Kent Branch".to_string(),
                distance: 6.8,
            },
        ]
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ReportFormat::from_path(Path::new("out/final-mileage.xlsx")).unwrap(),
            ReportFormat::Xlsx
        );
        assert_eq!(
            ReportFormat::from_path(Path::new("report.CSV")).unwrap(),
            ReportFormat::Csv
        );
        assert_eq!(
            ReportFormat::from_path(Path::new("report.json")).unwrap(),
            ReportFormat::Json
        );
        assert!(matches!(
            ReportFormat::from_path(Path::new("report.ods")),
            Err(MileageError::UnsupportedFormat(_))
        ));
        assert!(ReportFormat::from_path(Path::new("report")).is_err());
    }

    #[test]
    fn test_render_csv() {
        let csv = render_csv(&legs()).unwrap();

        assert_eq!(
            csv,
            "Date,From Branch,To Branch,Distance\n\
             2024-01-05,Main Library,Birmingham Branch,5.1\n\
             2024-01-05,Birmingham Branch,Kent Branch,6.8\n"
        );
    }

    #[test]
    fn test_render_csv_empty_keeps_header() {
        let csv = render_csv(&[]).unwrap();
        assert_eq!(csv, "Date,From Branch,To Branch,Distance\n");
    }

    #[test]
    fn test_render_json_uses_column_names() {
        let json = render_json(&legs()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["Date"], "2024-01-05");
        assert_eq!(value[0]["From Branch"], "Main Library");
        assert_eq!(value[1]["To Branch"], "Kent Branch");
        assert_eq!(value[1]["Distance"], 6.8);
    }
}
