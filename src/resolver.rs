//! Distance resolution
//!
//! Candidate legs carry branch names; the mileage chart is keyed by location
//! codes. A leg whose chart distance is exactly zero connects two names for
//! the same site and does not belong in the report.

use tracing::debug;

use crate::error::MileageError;
use crate::locations::LocationCodeMap;
use crate::reference::ReferenceTable;
use crate::types::{CandidateLeg, Leg};

/// Resolver that attaches chart distances to candidate legs
pub struct DistanceResolver<'a> {
    locations: &'a LocationCodeMap,
    reference: &'a ReferenceTable,
}

impl<'a> DistanceResolver<'a> {
    pub fn new(locations: &'a LocationCodeMap, reference: &'a ReferenceTable) -> Self {
        Self {
            locations,
            reference,
        }
    }

    /// Resolve one candidate; `Ok(None)` means the leg is dropped
    pub fn resolve(&self, candidate: CandidateLeg) -> Result<Option<Leg>, MileageError> {
        let from_code = self.locations.resolve(&candidate.from)?;
        let to_code = self.locations.resolve(&candidate.to)?;
        let distance = self.reference.lookup(from_code, to_code)?;

        if distance == 0.0 {
            debug!(
                date = %candidate.date,
                from = %candidate.from,
                to = %candidate.to,
                "dropping zero-distance leg"
            );
            return Ok(None);
        }

        Ok(Some(Leg {
            date: candidate.date,
            from: candidate.from,
            to: candidate.to,
            distance,
        }))
    }

    /// Resolve every candidate in order, failing on the first lookup error
    pub fn resolve_all(&self, candidates: Vec<CandidateLeg>) -> Result<Vec<Leg>, MileageError> {
        let mut legs = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if let Some(leg) = self.resolve(candidate)? {
                legs.push(leg);
            }
        }
        Ok(legs)
    }
}
