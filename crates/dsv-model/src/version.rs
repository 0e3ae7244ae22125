//! The mapping between a published source version and a draft target version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::MappingType;
use crate::ids::VersionId;
use crate::mapping::{CandidateRef, MappingAddress, MappingPlan, PlanEntry};
use crate::plan::{FilterMappingPlan, IndicatorMappingPlan, LocationMappingPlan};

/// Ties a source and target version to their filter, location and indicator
/// plans.
///
/// The `*_complete` flags cache [`MappingPlan::is_complete`] so listings can
/// be filtered without walking the plans. They are refreshed by every
/// operation that changes a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSetVersionMapping {
    pub source_version: VersionId,
    pub target_version: VersionId,
    #[serde(default)]
    pub filters: FilterMappingPlan,
    #[serde(default)]
    pub locations: LocationMappingPlan,
    #[serde(default)]
    pub indicators: IndicatorMappingPlan,
    pub filter_mappings_complete: bool,
    pub location_mappings_complete: bool,
    pub indicator_mappings_complete: bool,
    /// Optimistic concurrency token; bumped by every successful save.
    #[serde(default)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frozen_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_fingerprint: Option<String>,
}

impl DataSetVersionMapping {
    pub fn new(
        source_version: VersionId,
        target_version: VersionId,
        filters: FilterMappingPlan,
        locations: LocationMappingPlan,
        indicators: IndicatorMappingPlan,
        now: DateTime<Utc>,
    ) -> Self {
        let mut mapping = Self {
            source_version,
            target_version,
            filters,
            locations,
            indicators,
            filter_mappings_complete: false,
            location_mappings_complete: false,
            indicator_mappings_complete: false,
            revision: 0,
            created_at: now,
            updated_at: now,
            frozen_at: None,
            source_fingerprint: None,
            target_fingerprint: None,
        };
        mapping.refresh_completeness();
        mapping
    }

    pub fn refresh_completeness(&mut self) {
        self.filter_mappings_complete = self.filters.is_complete();
        self.location_mappings_complete = self.locations.is_complete();
        self.indicator_mappings_complete = self.indicators.is_complete();
    }

    /// Cached completeness over all three plans.
    pub fn mappings_complete(&self) -> bool {
        self.filter_mappings_complete
            && self.location_mappings_complete
            && self.indicator_mappings_complete
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen_at.is_some()
    }

    /// Marks the mapping read-only. Keeps the first freeze time.
    pub fn freeze(&mut self, at: DateTime<Utc>) {
        if self.frozen_at.is_none() {
            self.frozen_at = Some(at);
            self.updated_at = at;
        }
    }

    pub fn entry(&self, address: &MappingAddress) -> Option<PlanEntry<'_>> {
        self.entries().into_iter().find(|e| &e.address == address)
    }

    pub fn count_by_type(&self, mapping_type: MappingType) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.mapping_type == mapping_type)
            .count()
    }
}

impl MappingPlan for DataSetVersionMapping {
    fn entries(&self) -> Vec<PlanEntry<'_>> {
        let mut entries = self.filters.entries();
        entries.extend(self.locations.entries());
        entries.extend(self.indicators.entries());
        entries
    }

    fn candidate_refs(&self) -> Vec<CandidateRef> {
        let mut refs = self.filters.candidate_refs();
        refs.extend(self.locations.candidate_refs());
        refs.extend(self.indicators.candidate_refs());
        refs
    }

    fn accepts_candidate(&self, address: &MappingAddress, candidate_key: &str) -> bool {
        match address {
            MappingAddress::Filter { .. } | MappingAddress::FilterOption { .. } => {
                self.filters.accepts_candidate(address, candidate_key)
            }
            MappingAddress::Location { .. } => {
                self.locations.accepts_candidate(address, candidate_key)
            }
            MappingAddress::Indicator { .. } => {
                self.indicators.accepts_candidate(address, candidate_key)
            }
        }
    }
}
