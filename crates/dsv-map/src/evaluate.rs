//! Completeness and compatibility facts about a mapping.
//!
//! Nothing here decides anything: [`compute_impact`] reports whether a
//! previously public entity lost its equivalent, and the versioning policy
//! that consumes it picks the version bump.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use dsv_model::{
    CandidateRef, DataSetVersionMapping, GeographicLevel, LocationMappingPlan, MappingAddress,
    MappingCategory, MappingPlan, MappingType,
};

/// True when no mapping in `plan` is still unresolved.
pub fn is_complete(plan: &impl MappingPlan) -> bool {
    plan.is_complete()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingImpact {
    /// Some source entity resolved to `AutoNone` or `ManualNone`.
    pub has_unresolved_loss: bool,
    /// Some target candidate is not the choice of any mapping.
    pub has_new_candidates_unused: bool,
    pub lost: Vec<MappingAddress>,
    pub unused_candidates: Vec<CandidateRef>,
}

type CandidateSlot = (MappingCategory, Option<GeographicLevel>, String);

/// Which candidates are chosen, keyed the way candidates are scoped.
fn used_candidates(plan: &impl MappingPlan) -> BTreeSet<CandidateSlot> {
    plan.entries()
        .into_iter()
        .filter(|e| e.mapping_type.is_mapped())
        .filter_map(|e| {
            e.candidate_key
                .map(|key| (e.address.category(), e.address.level(), key.to_string()))
        })
        .collect()
}

pub fn compute_impact(plan: &impl MappingPlan) -> MappingImpact {
    let lost: Vec<MappingAddress> = plan
        .entries()
        .into_iter()
        .filter(|e| e.mapping_type.is_loss())
        .map(|e| e.address)
        .collect();
    let used = used_candidates(plan);
    let unused_candidates: Vec<CandidateRef> = plan
        .candidate_refs()
        .into_iter()
        .filter(|c| !used.contains(&(c.category, c.level, c.candidate_key.clone())))
        .collect();
    MappingImpact {
        has_unresolved_loss: !lost.is_empty(),
        has_new_candidates_unused: !unused_candidates.is_empty(),
        lost,
        unused_candidates,
    }
}

/// Counts of one category's mappings by state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub total: usize,
    pub by_type: BTreeMap<MappingType, usize>,
    pub needs_review: usize,
    pub candidates: usize,
}

impl CategorySummary {
    pub fn count(&self, mapping_type: MappingType) -> usize {
        self.by_type.get(&mapping_type).copied().unwrap_or_default()
    }

    pub fn is_complete(&self) -> bool {
        self.count(MappingType::None) == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSummary {
    pub categories: BTreeMap<MappingCategory, CategorySummary>,
}

impl MappingSummary {
    pub fn total(&self) -> CategorySummary {
        let mut total = CategorySummary::default();
        for summary in self.categories.values() {
            total.total += summary.total;
            total.needs_review += summary.needs_review;
            total.candidates += summary.candidates;
            for (mapping_type, count) in &summary.by_type {
                *total.by_type.entry(*mapping_type).or_default() += count;
            }
        }
        total
    }
}

pub fn summarize(plan: &impl MappingPlan) -> MappingSummary {
    let mut summary = MappingSummary::default();
    for entry in plan.entries() {
        let category = summary
            .categories
            .entry(entry.address.category())
            .or_default();
        category.total += 1;
        *category.by_type.entry(entry.mapping_type).or_default() += 1;
        if entry.needs_review {
            category.needs_review += 1;
        }
    }
    for candidate in plan.candidate_refs() {
        summary
            .categories
            .entry(candidate.category)
            .or_default()
            .candidates += 1;
    }
    summary
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    /// A mapped state without a candidate key.
    MissingCandidateKey,
    /// An unmapped state carrying a candidate key.
    UnexpectedCandidateKey,
    /// A candidate key that is not among the address's candidates.
    UnknownCandidate,
}

/// A mapping whose state and candidate key disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantViolation {
    pub address: MappingAddress,
    pub kind: ViolationKind,
    pub mapping_type: MappingType,
    pub candidate_key: Option<String>,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let candidate = self.candidate_key.as_deref().unwrap_or("-");
        match self.kind {
            ViolationKind::MissingCandidateKey => {
                write!(f, "{} is {} without a candidate", self.address, self.mapping_type)
            }
            ViolationKind::UnexpectedCandidateKey => write!(
                f,
                "{} is {} but points at '{candidate}'",
                self.address, self.mapping_type
            ),
            ViolationKind::UnknownCandidate => write!(
                f,
                "{} points at unknown candidate '{candidate}'",
                self.address
            ),
        }
    }
}

/// Every mapping for which "mapped state" and "candidate key present among
/// candidates" disagree.
pub fn check_invariants(plan: &impl MappingPlan) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    for entry in plan.entries() {
        let kind = match (entry.mapping_type.is_mapped(), entry.candidate_key) {
            (true, None) => Some(ViolationKind::MissingCandidateKey),
            (false, Some(_)) => Some(ViolationKind::UnexpectedCandidateKey),
            (true, Some(key)) if !plan.accepts_candidate(&entry.address, key) => {
                Some(ViolationKind::UnknownCandidate)
            }
            _ => None,
        };
        if let Some(kind) = kind {
            violations.push(InvariantViolation {
                address: entry.address,
                kind,
                mapping_type: entry.mapping_type,
                candidate_key: entry.candidate_key.map(str::to_string),
            });
        }
    }
    violations
}

/// Geographic levels present on only one side of a location plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelChanges {
    /// Levels with candidates but no source mappings.
    pub added: Vec<GeographicLevel>,
    /// Levels with source mappings but no candidates.
    pub removed: Vec<GeographicLevel>,
}

pub fn level_changes(plan: &LocationMappingPlan) -> LevelChanges {
    let mut changes = LevelChanges::default();
    for (level, mappings) in &plan.levels {
        match (mappings.mappings.is_empty(), mappings.candidates.is_empty()) {
            (true, false) => changes.added.push(*level),
            (false, true) => changes.removed.push(*level),
            _ => {}
        }
    }
    changes
}

/// Everything the evaluator reports about one version mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub complete: bool,
    pub summary: MappingSummary,
    pub impact: MappingImpact,
    pub level_changes: LevelChanges,
}

pub fn evaluate(mapping: &DataSetVersionMapping) -> Evaluation {
    Evaluation {
        complete: is_complete(mapping),
        summary: summarize(mapping),
        impact: compute_impact(mapping),
        level_changes: level_changes(&mapping.locations),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dsv_model::{
        FilterMeta, LocationMeta, LocationOptionMeta, MetadataSnapshot, VersionId,
    };

    use crate::builder::build_plans;
    use crate::options::MatchOptions;

    fn mapping(source: &MetadataSnapshot, target: &MetadataSnapshot) -> DataSetVersionMapping {
        let plans = build_plans(source, target, MatchOptions::sequential());
        DataSetVersionMapping::new(
            VersionId::new("v1").unwrap(),
            VersionId::new("v2").unwrap(),
            plans.filters,
            plans.locations,
            plans.indicators,
            Utc::now(),
        )
    }

    #[test]
    fn added_option_is_unused_not_lost() {
        let source = MetadataSnapshot::new(
            vec![FilterMeta::new("gender", "Gender").with_options(["Male", "Female"])],
            vec![],
            vec![],
        );
        let target = MetadataSnapshot::new(
            vec![FilterMeta::new("gender", "Gender").with_options(["Male", "Female", "Other"])],
            vec![],
            vec![],
        );
        let impact = compute_impact(&mapping(&source, &target));
        assert!(!impact.has_unresolved_loss);
        assert!(impact.has_new_candidates_unused);
        assert_eq!(impact.unused_candidates.len(), 1);
        assert_eq!(impact.unused_candidates[0].candidate_key, "gender||other");
    }

    #[test]
    fn removed_location_is_a_loss() {
        let source = MetadataSnapshot::new(
            vec![],
            vec![LocationMeta::new(GeographicLevel::LocalAuthority)
                .with_option(LocationOptionMeta::coded("Blackpool", "E06000009"))],
            vec![],
        );
        let target = MetadataSnapshot::new(
            vec![],
            vec![LocationMeta::new(GeographicLevel::Country)
                .with_option(LocationOptionMeta::coded("England", "E92000001"))],
            vec![],
        );
        let mapping = mapping(&source, &target);
        let impact = compute_impact(&mapping);
        assert!(impact.has_unresolved_loss);
        assert_eq!(
            impact.lost,
            vec![MappingAddress::location(
                GeographicLevel::LocalAuthority,
                "code|e06000009"
            )]
        );
        let changes = level_changes(&mapping.locations);
        assert_eq!(changes.added, vec![GeographicLevel::Country]);
        assert_eq!(changes.removed, vec![GeographicLevel::LocalAuthority]);
    }

    #[test]
    fn summary_counts_by_category() {
        let snapshot = MetadataSnapshot::new(
            vec![FilterMeta::new("gender", "Gender").with_options(["Male", "Female"])],
            vec![],
            vec![],
        );
        let summary = summarize(&mapping(&snapshot, &snapshot));
        let options = &summary.categories[&MappingCategory::FilterOption];
        assert_eq!(options.total, 2);
        assert_eq!(options.count(MappingType::AutoMapped), 2);
        assert_eq!(options.candidates, 2);
        assert!(summary.total().is_complete());
    }

    #[test]
    fn invariant_violations_are_reported() {
        let snapshot = MetadataSnapshot::new(
            vec![FilterMeta::new("gender", "Gender")],
            vec![],
            vec![],
        );
        let mut mapping = mapping(&snapshot, &snapshot);
        assert!(check_invariants(&mapping).is_empty());

        let filter = mapping.filters.mappings.get_mut("gender").unwrap();
        filter.mapping.candidate_key = Some("phase".to_string());
        let violations = check_invariants(&mapping);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::UnknownCandidate);

        let filter = mapping.filters.mappings.get_mut("gender").unwrap();
        filter.mapping.mapping_type = MappingType::AutoNone;
        assert_eq!(
            check_invariants(&mapping)[0].kind,
            ViolationKind::UnexpectedCandidateKey
        );
    }
}
