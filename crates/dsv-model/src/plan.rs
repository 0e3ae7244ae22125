//! Per-category mapping plans.
//!
//! Each plan pairs the mappings of the source version (keyed by source
//! structural key) with the candidates of the target version (keyed by
//! target structural key). Keys are opaque strings and round-trip exactly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::{GeographicLevel, MappingCategory};
use crate::mapping::{CandidateRef, Mapping, MappingAddress, MappingPlan, PlanEntry};
use crate::metadata::{FilterInfo, FilterOptionInfo, IndicatorInfo, LocationOptionInfo};

pub type FilterOptionMapping = Mapping<FilterOptionInfo>;
pub type LocationOptionMapping = Mapping<LocationOptionInfo>;
pub type IndicatorMapping = Mapping<IndicatorInfo>;

/// A filter's own mapping plus the mappings of its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterMapping {
    #[serde(flatten)]
    pub mapping: Mapping<FilterInfo>,
    #[serde(default)]
    pub option_mappings: BTreeMap<String, FilterOptionMapping>,
}

/// A target filter and its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCandidate {
    #[serde(flatten)]
    pub info: FilterInfo,
    #[serde(default)]
    pub options: BTreeMap<String, FilterOptionInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterMappingPlan {
    #[serde(default)]
    pub mappings: BTreeMap<String, FilterMapping>,
    #[serde(default)]
    pub candidates: BTreeMap<String, FilterCandidate>,
}

impl FilterMappingPlan {
    /// Finds an option candidate by key across every filter candidate.
    ///
    /// Option keys embed their owning filter key, so at most one filter
    /// candidate can hold a given option key.
    pub fn option_candidate(&self, option_key: &str) -> Option<(&str, &FilterOptionInfo)> {
        self.candidates.iter().find_map(|(filter_key, candidate)| {
            candidate
                .options
                .get(option_key)
                .map(|info| (filter_key.as_str(), info))
        })
    }

    pub fn option_mapping(&self, filter_key: &str, option_key: &str) -> Option<&FilterOptionMapping> {
        self.mappings
            .get(filter_key)
            .and_then(|f| f.option_mappings.get(option_key))
    }
}

impl MappingPlan for FilterMappingPlan {
    fn entries(&self) -> Vec<PlanEntry<'_>> {
        let mut entries = Vec::new();
        for (filter_key, filter) in &self.mappings {
            entries.push(PlanEntry::from_mapping(
                MappingAddress::filter(filter_key.clone()),
                &filter.mapping.source.label,
                &filter.mapping,
            ));
            for (option_key, option) in &filter.option_mappings {
                entries.push(PlanEntry::from_mapping(
                    MappingAddress::filter_option(filter_key.clone(), option_key.clone()),
                    &option.source.label,
                    option,
                ));
            }
        }
        entries
    }

    fn candidate_refs(&self) -> Vec<CandidateRef> {
        let mut refs = Vec::new();
        for (filter_key, candidate) in &self.candidates {
            refs.push(CandidateRef {
                category: MappingCategory::Filter,
                level: None,
                filter_key: None,
                candidate_key: filter_key.clone(),
                label: candidate.info.label.clone(),
            });
            for (option_key, option) in &candidate.options {
                refs.push(CandidateRef {
                    category: MappingCategory::FilterOption,
                    level: None,
                    filter_key: Some(filter_key.clone()),
                    candidate_key: option_key.clone(),
                    label: option.label.clone(),
                });
            }
        }
        refs
    }

    fn accepts_candidate(&self, address: &MappingAddress, candidate_key: &str) -> bool {
        match address {
            MappingAddress::Filter { .. } => self.candidates.contains_key(candidate_key),
            MappingAddress::FilterOption { .. } => self.option_candidate(candidate_key).is_some(),
            _ => false,
        }
    }
}

/// Mappings and candidates of one geographic level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationLevelMappings {
    #[serde(default)]
    pub mappings: BTreeMap<String, LocationOptionMapping>,
    #[serde(default)]
    pub candidates: BTreeMap<String, LocationOptionInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationMappingPlan {
    #[serde(default)]
    pub levels: BTreeMap<GeographicLevel, LocationLevelMappings>,
}

impl LocationMappingPlan {
    pub fn level(&self, level: GeographicLevel) -> Option<&LocationLevelMappings> {
        self.levels.get(&level)
    }
}

impl MappingPlan for LocationMappingPlan {
    fn entries(&self) -> Vec<PlanEntry<'_>> {
        self.levels
            .iter()
            .flat_map(|(level, mappings)| {
                mappings.mappings.iter().map(|(key, mapping)| {
                    PlanEntry::from_mapping(
                        MappingAddress::location(*level, key.clone()),
                        &mapping.source.label,
                        mapping,
                    )
                })
            })
            .collect()
    }

    fn candidate_refs(&self) -> Vec<CandidateRef> {
        self.levels
            .iter()
            .flat_map(|(level, mappings)| {
                mappings.candidates.iter().map(|(key, candidate)| CandidateRef {
                    category: MappingCategory::Location,
                    level: Some(*level),
                    filter_key: None,
                    candidate_key: key.clone(),
                    label: candidate.label.clone(),
                })
            })
            .collect()
    }

    fn accepts_candidate(&self, address: &MappingAddress, candidate_key: &str) -> bool {
        match address {
            MappingAddress::Location { level, .. } => self
                .levels
                .get(level)
                .is_some_and(|l| l.candidates.contains_key(candidate_key)),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorMappingPlan {
    #[serde(default)]
    pub mappings: BTreeMap<String, IndicatorMapping>,
    #[serde(default)]
    pub candidates: BTreeMap<String, IndicatorInfo>,
}

impl MappingPlan for IndicatorMappingPlan {
    fn entries(&self) -> Vec<PlanEntry<'_>> {
        self.mappings
            .iter()
            .map(|(key, mapping)| {
                PlanEntry::from_mapping(
                    MappingAddress::indicator(key.clone()),
                    &mapping.source.label,
                    mapping,
                )
            })
            .collect()
    }

    fn candidate_refs(&self) -> Vec<CandidateRef> {
        self.candidates
            .iter()
            .map(|(key, candidate)| CandidateRef {
                category: MappingCategory::Indicator,
                level: None,
                filter_key: None,
                candidate_key: key.clone(),
                label: candidate.label.clone(),
            })
            .collect()
    }

    fn accepts_candidate(&self, address: &MappingAddress, candidate_key: &str) -> bool {
        matches!(address, MappingAddress::Indicator { .. })
            && self.candidates.contains_key(candidate_key)
    }
}
