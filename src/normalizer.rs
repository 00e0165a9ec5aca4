//! Visit normalization
//!
//! This module resolves the textual timestamps of raw visits:
//! - Clock-in/out date and time combined into orderable instants
//! - Dates and times rewritten in canonical form
//! - Zero-duration visits removed
//! - Remaining visits ordered by clock-in

use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::MileageError;
use crate::types::{NormalizedVisit, RawVisit};

/// Timeero's combined date and time layout ("Jan 05, 2024 08:00 AM")
pub const SOURCE_DATETIME_FORMAT: &str = "%b %d, %Y %I:%M %p";

/// Canonical date layout used for grouping and display
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonical 12-hour time layout
pub const CANONICAL_TIME_FORMAT: &str = "%I:%M %p";

/// Duration text of visits that never really happened
pub const ZERO_DURATION: &str = "0:00";

/// Normalizer for converting raw visits to ordered, timestamped visits
pub struct Normalizer;

impl Normalizer {
    /// Normalize a batch of raw visits.
    ///
    /// Fails on the first malformed date or time; one bad row means the
    /// export format changed and nothing from the run can be trusted.
    pub fn normalize(raw: Vec<RawVisit>) -> Result<Vec<NormalizedVisit>, MileageError> {
        let mut visits = Vec::with_capacity(raw.len());

        for visit in raw {
            let normalized = normalize_visit(visit)?;
            if normalized.duration == ZERO_DURATION {
                debug!(
                    line = normalized.line,
                    branch = %normalized.branch,
                    "dropping zero-duration visit"
                );
                continue;
            }
            visits.push(normalized);
        }

        sort_by_entry(&mut visits);
        Ok(visits)
    }
}

/// Stable ordering by clock-in instant
pub fn sort_by_entry(visits: &mut [NormalizedVisit]) {
    visits.sort_by_key(|v| v.entered_at);
}

fn normalize_visit(visit: RawVisit) -> Result<NormalizedVisit, MileageError> {
    let line = visit.line;
    let entered_at = parse_instant(&visit.date_in, &visit.time_in, line, "date/time in")?;
    let exited_at = parse_instant(&visit.date_out, &visit.time_out, line, "date/time out")?;

    Ok(NormalizedVisit {
        branch: visit.branch,
        entered_at,
        exited_at,
        date_in: entered_at.format(CANONICAL_DATE_FORMAT).to_string(),
        date_out: exited_at.format(CANONICAL_DATE_FORMAT).to_string(),
        time_in: entered_at.format(CANONICAL_TIME_FORMAT).to_string(),
        time_out: exited_at.format(CANONICAL_TIME_FORMAT).to_string(),
        duration: visit.duration,
        line: visit.line,
    })
}

/// Parse one date/time pair, keeping the offending text on failure
fn parse_instant(
    date: &str,
    time: &str,
    line: usize,
    field: &'static str,
) -> Result<NaiveDateTime, MileageError> {
    let combined = format!("{} {}", date.trim(), time.trim());
    NaiveDateTime::parse_from_str(&combined, SOURCE_DATETIME_FORMAT).map_err(|_| {
        MileageError::ParseError {
            line,
            field,
            text: combined,
        }
    })
}
