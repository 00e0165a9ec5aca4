//! Core types for the Visual Mileage pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: raw visits, normalized visits, candidate legs, and report legs.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Number of meaningful lines in one timeclock entry
pub const FIELDS_PER_VISIT: usize = 7;

/// One timeclock entry exactly as it appeared in the pasted text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawVisit {
    /// Branch name as shown by the tracking tool (e.g., "Main Library")
    pub branch: String,
    /// Clock-in time (e.g., "08:00 AM")
    pub time_in: String,
    /// Clock-in date (e.g., "Jan 05, 2024")
    pub date_in: String,
    /// Clock-out time
    pub time_out: String,
    /// Clock-out date
    pub date_out: String,
    /// Time on site (e.g., "1:45")
    pub duration: String,
    /// Tracking tool's own mileage label; carries the "miles" terminator
    pub distance_label: String,
    /// 1-based input line number of the terminator line
    pub line: usize,
}

impl RawVisit {
    /// Build a visit from exactly seven field values in input order
    pub fn from_fields(fields: [String; FIELDS_PER_VISIT], line: usize) -> Self {
        let [branch, time_in, date_in, time_out, date_out, duration, distance_label] = fields;
        Self {
            branch,
            time_in,
            date_in,
            time_out,
            date_out,
            duration,
            distance_label,
            line,
        }
    }
}

/// A visit with its timestamps resolved into orderable values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedVisit {
    pub branch: String,
    /// Combined clock-in date and time
    pub entered_at: NaiveDateTime,
    /// Combined clock-out date and time
    pub exited_at: NaiveDateTime,
    /// Canonical clock-in date ("YYYY-MM-DD")
    pub date_in: String,
    /// Canonical clock-out date ("YYYY-MM-DD")
    pub date_out: String,
    /// Canonical clock-in time ("hh:mm AM/PM")
    pub time_in: String,
    /// Canonical clock-out time ("hh:mm AM/PM")
    pub time_out: String,
    pub duration: String,
    pub line: usize,
}

impl NormalizedVisit {
    /// Calendar day the visit started on
    pub fn day(&self) -> NaiveDate {
        self.entered_at.date()
    }
}

/// All visits of one calendar day, in entry order
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub visits: Vec<NormalizedVisit>,
}

/// An inferred movement between two consecutive, distinct branches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLeg {
    pub date: NaiveDate,
    pub from: String,
    pub to: String,
}

/// One row of the final mileage report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "From Branch")]
    pub from: String,
    #[serde(rename = "To Branch")]
    pub to: String,
    #[serde(rename = "Distance")]
    pub distance: f64,
}

/// Report column headers, in output order
pub const REPORT_COLUMNS: [&str; 4] = ["Date", "From Branch", "To Branch", "Distance"];

/// Counters describing what one run kept and dropped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Lines read from the pasted text
    pub lines_read: usize,
    /// Lines skipped as noise tokens
    pub noise_lines: usize,
    /// Complete entries turned into visits
    pub visits_parsed: usize,
    /// Entries dropped for having the wrong number of fields
    pub groups_discarded: usize,
    /// Trailing fields left without a terminator
    pub trailing_fields: usize,
    /// Visits dropped for a "0:00" duration
    pub zero_duration_visits: usize,
    /// Distinct calendar days with at least one visit
    pub days: usize,
    /// Legs between distinct branches before distance lookup
    pub candidate_legs: usize,
    /// Consecutive visits to the same branch
    pub self_loops_skipped: usize,
    /// Legs dropped for a zero reference distance
    pub zero_distance_legs: usize,
    /// Rows in the final report
    pub legs_emitted: usize,
}
