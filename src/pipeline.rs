//! Pipeline orchestration
//!
//! This module provides the public API for Visual Mileage.
//! It orchestrates the full pipeline from pasted Timeero text to report legs.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span};
use uuid::Uuid;

use crate::config::MileageConfig;
use crate::error::MileageError;
use crate::legs::{adjacent_pairs, LegReconstructor};
use crate::locations::LocationCodeMap;
use crate::normalizer::Normalizer;
use crate::parser::{ParserSettings, VisitParser};
use crate::reference::ReferenceTable;
use crate::report::{write_report, ReportFormat};
use crate::resolver::DistanceResolver;
use crate::types::{Leg, RunStats};

/// Convert pasted Timeero text to report legs using the built-in branch list.
///
/// # Arguments
/// * `text` - Raw text pasted from Timeero
/// * `reference` - Loaded mileage chart
///
/// # Returns
/// Report legs in date order
///
/// # Example
/// ```ignore
/// let chart = ReferenceTable::load("mileage-chart.csv", "LOCATION")?;
/// let legs = text_to_legs(&pasted, &chart)?;
/// ```
pub fn text_to_legs(text: &str, reference: &ReferenceTable) -> Result<Vec<Leg>, MileageError> {
    let locations = LocationCodeMap::default();
    Ok(run_stages(&VisitParser::default(), &locations, reference, text)?.legs)
}

/// Message handed back to the caller once the report is on disk
pub fn completion_message(path: &Path) -> String {
    format!("File saved as: {}", path.display())
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MileageRun {
    pub run_id: Uuid,
    pub legs: Vec<Leg>,
    pub stats: RunStats,
}

/// Processor holding the read-only lookups shared by every run.
pub struct MileageProcessor {
    parser: VisitParser,
    locations: LocationCodeMap,
    reference: ReferenceTable,
}

impl MileageProcessor {
    /// Create a processor with default parser settings
    pub fn new(locations: LocationCodeMap, reference: ReferenceTable) -> Self {
        Self {
            parser: VisitParser::default(),
            locations,
            reference,
        }
    }

    /// Build a processor from configuration, loading the mileage chart once
    pub fn from_config(config: &MileageConfig) -> Result<Self, MileageError> {
        let locations = config.location_map()?;
        let reference = config.load_reference()?;
        Ok(Self::new(locations, reference).with_parser_settings(config.parser.clone()))
    }

    /// Replace the parser settings
    pub fn with_parser_settings(mut self, settings: ParserSettings) -> Self {
        self.parser = VisitParser::new(settings);
        self
    }

    pub fn locations(&self) -> &LocationCodeMap {
        &self.locations
    }

    pub fn reference(&self) -> &ReferenceTable {
        &self.reference
    }

    /// Run every stage except writing the report.
    ///
    /// Pipeline stages:
    /// 1. VisitParser - Group lines into raw visits
    /// 2. Normalizer - Resolve timestamps, drop zero-duration visits, sort
    /// 3. LegReconstructor - Infer per-day legs
    /// 4. DistanceResolver - Attach chart distances, drop zero-distance legs
    pub fn process(&self, text: &str) -> Result<MileageRun, MileageError> {
        run_stages(&self.parser, &self.locations, &self.reference, text)
    }

    /// Run the pipeline and write the report.
    ///
    /// Nothing is written unless every stage succeeds. Returns the
    /// completion message together with the run.
    pub fn export(
        &self,
        text: &str,
        path: &Path,
        format: Option<ReportFormat>,
    ) -> Result<(String, MileageRun), MileageError> {
        let format = match format {
            Some(format) => format,
            None => ReportFormat::from_path(path)?,
        };

        let run = self.process(text)?;
        write_report(&run.legs, path, format)?;

        info!(
            run_id = %run.run_id,
            path = %path.display(),
            format = format.as_str(),
            "mileage report written"
        );

        Ok((completion_message(path), run))
    }
}

/// Parse, normalize, reconstruct and resolve one paste
fn run_stages(
    parser: &VisitParser,
    locations: &LocationCodeMap,
    reference: &ReferenceTable,
    text: &str,
) -> Result<MileageRun, MileageError> {
    let run_id = Uuid::new_v4();
    let _span = info_span!("mileage_run", %run_id).entered();

    // Stage 1: Parse pasted text
    let parsed = parser.parse(text);
    let mut stats = RunStats {
        lines_read: parsed.stats.lines_read,
        noise_lines: parsed.stats.noise_lines,
        visits_parsed: parsed.visits.len(),
        groups_discarded: parsed.stats.groups_discarded,
        trailing_fields: parsed.stats.trailing_fields,
        ..RunStats::default()
    };

    // Stage 2: Normalize visits
    let visits = Normalizer::normalize(parsed.visits)?;
    stats.zero_duration_visits = stats.visits_parsed - visits.len();

    // Stage 3: Reconstruct legs per day
    let days = LegReconstructor::group_by_day(&visits);
    let candidates: Vec<_> = days.iter().flat_map(LegReconstructor::day_legs).collect();
    stats.days = days.len();
    stats.candidate_legs = candidates.len();
    stats.self_loops_skipped = adjacent_pairs(&days) - candidates.len();

    // Stage 4: Resolve distances
    let resolver = DistanceResolver::new(locations, reference);
    let legs = resolver.resolve_all(candidates)?;
    stats.zero_distance_legs = stats.candidate_legs - legs.len();
    stats.legs_emitted = legs.len();

    info!(
        visits = stats.visits_parsed,
        discarded = stats.groups_discarded,
        days = stats.days,
        legs = stats.legs_emitted,
        "mileage run complete"
    );

    Ok(MileageRun {
        run_id,
        legs,
        stats,
    })
}
