//! Mileage chart loading
//!
//! The mileage chart is a square CSV matrix: the header row and one index
//! column both list location codes, and cell [row][column] holds the driving
//! distance from the row location to the column location. Timeero's own
//! mileage is not reliable, so this chart is the authority for the report.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::MileageError;

/// Header of the column that holds row location codes
pub const DEFAULT_INDEX_COLUMN: &str = "LOCATION";

/// Read-only distance lookup keyed by (from code, to code)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTable {
    rows: IndexMap<String, IndexMap<String, f64>>,
}

impl ReferenceTable {
    /// Load a chart from a CSV file
    pub fn load(path: impl AsRef<Path>, index_column: &str) -> Result<Self, MileageError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let table = Self::from_reader(file, index_column)?;
        debug!(
            path = %path.display(),
            locations = table.rows.len(),
            "loaded mileage chart"
        );
        Ok(table)
    }

    /// Parse a chart from CSV text
    pub fn from_csv_str(csv_text: &str, index_column: &str) -> Result<Self, MileageError> {
        Self::from_reader(csv_text.as_bytes(), index_column)
    }

    /// Parse a chart from any CSV source
    pub fn from_reader<R: Read>(reader: R, index_column: &str) -> Result<Self, MileageError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let index = headers
            .iter()
            .position(|h| h == index_column)
            .ok_or_else(|| {
                MileageError::ReferenceTable(format!("missing index column {:?}", index_column))
            })?;

        let mut rows: IndexMap<String, IndexMap<String, f64>> = IndexMap::new();

        for result in rdr.records() {
            let record = result?;
            let from = match record.get(index) {
                Some(code) if !code.is_empty() => code.to_string(),
                _ => continue,
            };

            let mut distances = IndexMap::new();
            for (col, cell) in record.iter().enumerate() {
                if col == index || cell.is_empty() {
                    continue;
                }
                let to = match headers.get(col) {
                    Some(code) if !code.is_empty() => code,
                    _ => continue,
                };
                distances.insert(to.to_string(), parse_distance(&from, to, cell)?);
            }

            if rows.insert(from.clone(), distances).is_some() {
                return Err(MileageError::ReferenceTable(format!(
                    "location {:?} appears on more than one row",
                    from
                )));
            }
        }

        Ok(Self { rows })
    }

    /// Distance between two codes, if the chart has that cell
    pub fn distance(&self, from: &str, to: &str) -> Option<f64> {
        self.rows.get(from).and_then(|row| row.get(to)).copied()
    }

    /// Distance between two codes, failing for a missing cell
    pub fn lookup(&self, from: &str, to: &str) -> Result<f64, MileageError> {
        self.distance(from, to)
            .ok_or_else(|| MileageError::MissingDistance {
                from: from.to_string(),
                to: to.to_string(),
            })
    }

    /// Row location codes in file order
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rows.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_distance(from: &str, to: &str, cell: &str) -> Result<f64, MileageError> {
    match cell.parse::<f64>() {
        Ok(distance) if distance.is_finite() && distance >= 0.0 => Ok(distance),
        _ => Err(MileageError::ReferenceTable(format!(
            "invalid distance {:?} from {} to {}",
            cell, from, to
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHART: &str = "\
LOCATION,MAIN,BIRM,KENT
MAIN,0.00,5.1,2.4
BIRM,5.1,0.00,
KENT, 2.4 ,6.8,0.00
";

    #[test]
    fn test_lookup_distances() {
        let table = ReferenceTable::from_csv_str(CHART, DEFAULT_INDEX_COLUMN).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.distance("MAIN", "BIRM"), Some(5.1));
        assert_eq!(table.distance("KENT", "MAIN"), Some(2.4));
        assert_eq!(table.distance("MAIN", "MAIN"), Some(0.0));
        assert_eq!(table.codes().collect::<Vec<_>>(), vec!["MAIN", "BIRM", "KENT"]);
    }

    #[test]
    fn test_empty_cell_is_missing() {
        let table = ReferenceTable::from_csv_str(CHART, DEFAULT_INDEX_COLUMN).unwrap();

        assert_eq!(table.distance("BIRM", "KENT"), None);
        let err = table.lookup("BIRM", "KENT").unwrap_err();
        assert!(err.is_lookup());
    }

    #[test]
    fn test_unknown_code_is_missing() {
        let table = ReferenceTable::from_csv_str(CHART, DEFAULT_INDEX_COLUMN).unwrap();

        assert!(matches!(
            table.lookup("MAIN", "SYLV"),
            Err(MileageError::MissingDistance { .. })
        ));
        assert!(!table.contains("SYLV"));
    }

    #[test]
    fn test_index_column_anywhere() {
        let chart = "MAIN,BIRM,CODE\n0,5.1,MAIN\n5.1,0,BIRM\n";
        let table = ReferenceTable::from_csv_str(chart, "CODE").unwrap();

        assert_eq!(table.distance("BIRM", "MAIN"), Some(5.1));
    }

    #[test]
    fn test_missing_index_column() {
        let result = ReferenceTable::from_csv_str(CHART, "SITE");
        assert!(matches!(result, Err(MileageError::ReferenceTable(_))));
    }

    #[test]
    fn test_bad_cells_rejected() {
        let negative = "LOCATION,MAIN\nMAIN,-1.0\n";
        let text = "LOCATION,MAIN\nMAIN,far\n";

        assert!(ReferenceTable::from_csv_str(negative, DEFAULT_INDEX_COLUMN).is_err());
        assert!(ReferenceTable::from_csv_str(text, DEFAULT_INDEX_COLUMN).is_err());
    }

    #[test]
    fn test_duplicate_rows_rejected() {
        let chart = "LOCATION,MAIN\nMAIN,0\nMAIN,0\n";
        let result = ReferenceTable::from_csv_str(chart, DEFAULT_INDEX_COLUMN);

        assert!(matches!(result, Err(MileageError::ReferenceTable(_))));
    }
}
