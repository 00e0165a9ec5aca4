//! Branch name to location code mapping
//!
//! Timeero reports full branch names while the mileage chart is keyed by short
//! location codes. Several names can share a code when they are the same
//! physical site (e.g., Mobile Services operates out of King Road).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::MileageError;

/// One name/code pair of the mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchCode {
    /// Branch name exactly as Timeero prints it
    pub name: String,
    /// Location code used by the mileage chart
    pub code: String,
}

/// Branches of the Toledo Lucas County Public Library system
pub const DEFAULT_BRANCHES: &[(&str, &str)] = &[
    ("Main Library", "MAIN"),
    ("Birmingham Branch", "BIRM"),
    ("Heatherdowns Branch", "HED"),
    ("Holland Branch", "HOLL"),
    ("Kent Branch", "KENT"),
    ("Mobile Services", "KINGRD"),
    ("King Road Branch", "KINGRD"),
    ("Lagrange Branch", "LAG"),
    ("Locke Branch", "LOCKE"),
    ("Maumee Branch", "MAUM"),
    ("Mott Branch", "MOTT"),
    ("Oregon Branch", "OREG"),
    ("Friends of the Library", "WAREHOUSE"),
    ("Point Place Branch", "PTPL"),
    ("Reynolds Corners Branch", "RC"),
    ("Sanger Branch", "SANG"),
    ("South Branch", "SOUTH"),
    ("Sylvania Branch", "SYLV"),
    ("Toledo Heights Branch", "TH"),
    ("Washington Branch", "WASH"),
    ("Waterville Branch", "WATV"),
    ("West Toledo Branch", "WTOL"),
    ("Cherry Street Mission", "MAIN"),
];

/// Immutable, ordered branch name to code lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationCodeMap {
    codes: IndexMap<String, String>,
}

impl Default for LocationCodeMap {
    fn default() -> Self {
        let codes = DEFAULT_BRANCHES
            .iter()
            .map(|(name, code)| (name.to_string(), code.to_string()))
            .collect();
        Self { codes }
    }
}

impl LocationCodeMap {
    /// Build a map from explicit pairs, rejecting duplicate or blank entries
    pub fn from_entries(entries: &[BranchCode]) -> Result<Self, MileageError> {
        let mut codes = IndexMap::with_capacity(entries.len());

        for entry in entries {
            let name = entry.name.trim();
            let code = entry.code.trim();
            if name.is_empty() || code.is_empty() {
                return Err(MileageError::Config(format!(
                    "branch entry has an empty name or code: {:?} -> {:?}",
                    entry.name, entry.code
                )));
            }
            if codes.insert(name.to_string(), code.to_string()).is_some() {
                return Err(MileageError::Config(format!(
                    "branch {:?} is listed more than once",
                    name
                )));
            }
        }

        Ok(Self { codes })
    }

    /// Look up the code for a branch name
    pub fn code(&self, name: &str) -> Option<&str> {
        self.codes.get(name).map(String::as_str)
    }

    /// Look up the code for a branch name, failing for unknown names
    pub fn resolve(&self, name: &str) -> Result<&str, MileageError> {
        self.code(name)
            .ok_or_else(|| MileageError::UnknownBranch(name.to_string()))
    }

    /// Distinct codes in first-appearance order
    pub fn distinct_codes(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for code in self.codes.values() {
            if !seen.contains(&code.as_str()) {
                seen.push(code);
            }
        }
        seen
    }

    /// All pairs in configured order
    pub fn entries(&self) -> Vec<BranchCode> {
        self.codes
            .iter()
            .map(|(name, code)| BranchCode {
                name: name.clone(),
                code: code.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let map = LocationCodeMap::default();

        assert_eq!(map.len(), 23);
        assert_eq!(map.code("Main Library"), Some("MAIN"));
        assert_eq!(map.code("Cherry Street Mission"), Some("MAIN"));
        assert_eq!(map.code("Mobile Services"), Some("KINGRD"));
        assert_eq!(map.code("King Road Branch"), Some("KINGRD"));
        assert_eq!(map.code("main library"), None);
    }

    #[test]
    fn test_distinct_codes_keep_order() {
        let map = LocationCodeMap::default();
        let codes = map.distinct_codes();

        assert_eq!(codes.len(), 21);
        assert_eq!(codes[0], "MAIN");
        assert_eq!(codes[1], "BIRM");
        assert_eq!(codes.iter().filter(|c| **c == "KINGRD").count(), 1);
    }

    #[test]
    fn test_unknown_branch_is_lookup_error() {
        let map = LocationCodeMap::default();
        let err = map.resolve("Downtown Annex").unwrap_err();

        assert!(err.is_lookup());
        assert!(err.to_string().contains("Downtown Annex"));
    }

    #[test]
    fn test_from_entries() {
        let map = LocationCodeMap::from_entries(&[
            BranchCode {
                name: "North Office".to_string(),
                code: "NORTH".to_string(),
            },
            BranchCode {
                name: " South Office ".to_string(),
                code: "SOUTH".to_string(),
            },
        ])
        .unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.code("South Office"), Some("SOUTH"));
        assert_eq!(map.entries()[0].name, "North Office");
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let entry = BranchCode {
            name: "North Office".to_string(),
            code: "NORTH".to_string(),
        };
        let result = LocationCodeMap::from_entries(&[entry.clone(), entry]);

        assert!(matches!(result, Err(MileageError::Config(_))));
    }
}
