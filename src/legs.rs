//! Leg reconstruction
//!
//! Travel is never recorded directly; it is inferred from the order of visits.
//! Within one calendar day, every visit after the first implies a drive from the
//! branch visited just before it. Consecutive visits to the same branch imply
//! no drive and are skipped. Days never chain into each other.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::types::{CandidateLeg, DayGroup, NormalizedVisit};

/// Leg reconstructor for turning ordered visits into candidate legs
pub struct LegReconstructor;

impl LegReconstructor {
    /// Group visits by clock-in date, ascending by calendar date.
    ///
    /// Visits keep their relative order inside each group, so input sorted by
    /// clock-in yields groups sorted by clock-in.
    pub fn group_by_day(visits: &[NormalizedVisit]) -> Vec<DayGroup> {
        let mut days: BTreeMap<NaiveDate, Vec<NormalizedVisit>> = BTreeMap::new();
        for visit in visits {
            days.entry(visit.day()).or_default().push(visit.clone());
        }

        days.into_iter()
            .map(|(date, visits)| DayGroup { date, visits })
            .collect()
    }

    /// Candidate legs for one day.
    ///
    /// The origin of each leg is the branch of the immediately preceding
    /// visit, whether or not a leg was emitted for that visit.
    pub fn day_legs(day: &DayGroup) -> Vec<CandidateLeg> {
        day.visits
            .windows(2)
            .filter(|pair| pair[0].branch != pair[1].branch)
            .map(|pair| CandidateLeg {
                date: day.date,
                from: pair[0].branch.clone(),
                to: pair[1].branch.clone(),
            })
            .collect()
    }

    /// Candidate legs for every day, days in calendar order
    pub fn reconstruct(visits: &[NormalizedVisit]) -> Vec<CandidateLeg> {
        Self::group_by_day(visits)
            .iter()
            .flat_map(Self::day_legs)
            .collect()
    }
}

/// Number of adjacent visit pairs across all days, self-loops included
pub fn adjacent_pairs(days: &[DayGroup]) -> usize {
    days.iter().map(|d| d.visits.len().saturating_sub(1)).sum()
}
