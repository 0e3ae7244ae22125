//! Re-matching after upstream data changes.
//!
//! A rebuild re-runs the matcher against new snapshots but keeps every
//! reviewer decision whose candidate still exists. A `ManualMapped` entry
//! whose candidate vanished is downgraded to `AutoNone` and flagged for
//! review.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use dsv_model::{
    FilterMappingPlan, IndicatorMappingPlan, LocationMappingPlan, Mapping, MappingAddress,
    MappingPlan, MappingType, MetadataSnapshot,
};

use crate::builder::{BuiltPlans, PriorPlans, addresses, compute_plans};
use crate::options::MatchOptions;

/// What a rebuild did to reviewer decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    /// `ManualMapped` entries whose candidate no longer exists.
    pub downgraded: Vec<MappingAddress>,
    /// Manual entries carried forward unchanged.
    pub retained_manual: usize,
    /// Manual entries whose source entity is gone from the new source.
    pub dropped_manual: Vec<MappingAddress>,
}

impl RebuildReport {
    pub fn merge(&mut self, other: RebuildReport) {
        self.downgraded.extend(other.downgraded);
        self.retained_manual += other.retained_manual;
        self.dropped_manual.extend(other.dropped_manual);
    }

    pub fn has_downgrades(&self) -> bool {
        !self.downgraded.is_empty()
    }

    pub(crate) fn record_dropped(&mut self, prior: &impl MappingPlan, rebuilt: &impl MappingPlan) {
        let remaining = addresses(rebuilt);
        for entry in prior.entries() {
            if entry.mapping_type.is_manual() && !remaining.contains(&entry.address) {
                warn!(address = %entry.address, "manual mapping dropped with its source entity");
                self.dropped_manual.push(entry.address);
            }
        }
    }
}

/// Rebuilds all three plans against new snapshots.
pub fn rebuild_plans(
    filters: &FilterMappingPlan,
    locations: &LocationMappingPlan,
    indicators: &IndicatorMappingPlan,
    source: &MetadataSnapshot,
    target: &MetadataSnapshot,
    options: MatchOptions,
) -> (BuiltPlans, RebuildReport) {
    let prior = PriorPlans {
        filters,
        locations,
        indicators,
    };
    let (plans, mut report) = compute_plans(source, target, Some(prior), options);
    report.downgraded.sort();
    report.dropped_manual.sort();
    info!(
        retained = report.retained_manual,
        downgraded = report.downgraded.len(),
        dropped = report.dropped_manual.len(),
        "plans rebuilt"
    );
    (plans, report)
}

/// Whether `prior` and `fresh` describe the same source entity.
///
/// Stored keys of duplicate entities depend on snapshot order, so the key
/// alone is not enough. Public ids decide when either side has one;
/// otherwise the source content must be unchanged.
fn same_entity<S: PartialEq>(prior: &Mapping<S>, fresh: &Mapping<S>) -> bool {
    match (&prior.public_id, &fresh.public_id) {
        (None, None) => prior.source == fresh.source,
        (prior_id, fresh_id) => prior_id == fresh_id,
    }
}

/// Decides what a rebuilt mapping looks like given its prior state.
///
/// Auto and unresolved priors are replaced by the fresh matcher result; an
/// outstanding review flag is kept until a reviewer acts. A prior that
/// belonged to a different entity under the same key is discarded, and a
/// manual decision lost that way is reported as dropped.
pub(crate) fn carry_forward<S: Clone + PartialEq>(
    address: &MappingAddress,
    prior: Option<&Mapping<S>>,
    fresh: Mapping<S>,
    candidate_exists: impl Fn(&str) -> bool,
    report: &mut RebuildReport,
) -> Mapping<S> {
    let Some(prior) = prior else {
        return fresh;
    };
    if !same_entity(prior, &fresh) {
        if prior.is_manual() {
            warn!(
                %address,
                "key now belongs to a different entity; manual mapping dropped"
            );
            report.dropped_manual.push(address.clone());
        }
        return fresh;
    }
    match prior.mapping_type {
        MappingType::ManualNone => {
            report.retained_manual += 1;
            prior.clone()
        }
        MappingType::ManualMapped => match prior.candidate_key.as_deref() {
            Some(key) if candidate_exists(key) => {
                report.retained_manual += 1;
                prior.clone()
            }
            dangling => {
                warn!(
                    %address,
                    candidate = dangling.unwrap_or_default(),
                    "manual mapping points at a removed candidate; downgraded to AutoNone"
                );
                report.downgraded.push(address.clone());
                Mapping {
                    source: fresh.source,
                    public_id: fresh.public_id,
                    mapping_type: MappingType::AutoNone,
                    candidate_key: None,
                    needs_review: true,
                }
            }
        },
        MappingType::None | MappingType::AutoMapped | MappingType::AutoNone => Mapping {
            needs_review: prior.needs_review,
            ..fresh
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsv_model::PublicId;

    fn address() -> MappingAddress {
        MappingAddress::indicator("x")
    }

    #[test]
    fn manual_none_is_kept_as_is() {
        let mut prior: Mapping<&str> = Mapping::auto("gender", None, Some("a".to_string()));
        prior.set_manual(None);
        let fresh = Mapping::auto("gender", None, Some("a".to_string()));
        let mut report = RebuildReport::default();
        let kept = carry_forward(&address(), Some(&prior), fresh, |_| true, &mut report);
        assert_eq!(kept, prior);
        assert_eq!(report.retained_manual, 1);
    }

    #[test]
    fn dangling_manual_mapping_is_downgraded_and_flagged() {
        let public_id = PublicId::new("pid-1").unwrap();
        let mut prior: Mapping<&str> = Mapping::auto("old", Some(public_id.clone()), None);
        prior.set_manual(Some("gone".to_string()));
        let fresh = Mapping::auto("new", Some(public_id), None);
        let mut report = RebuildReport::default();
        let rebuilt = carry_forward(&address(), Some(&prior), fresh, |k| k != "gone", &mut report);
        assert_eq!(rebuilt.mapping_type, MappingType::AutoNone);
        assert!(rebuilt.needs_review);
        assert_eq!(rebuilt.source, "new");
        assert_eq!(report.downgraded, vec![address()]);
    }

    #[test]
    fn manual_decision_of_another_entity_is_dropped() {
        let mut prior: Mapping<&str> = Mapping::auto("first", None, None);
        prior.set_manual(None);
        let fresh = Mapping::auto("second", None, Some("a".to_string()));
        let mut report = RebuildReport::default();
        let rebuilt = carry_forward(&address(), Some(&prior), fresh.clone(), |_| true, &mut report);
        assert_eq!(rebuilt, fresh);
        assert_eq!(report.dropped_manual, vec![address()]);
        assert_eq!(report.retained_manual, 0);
    }

    #[test]
    fn matching_public_id_keeps_decision_across_relabel() {
        let public_id = PublicId::new("pid-1").unwrap();
        let mut prior: Mapping<&str> = Mapping::auto("old label", Some(public_id.clone()), None);
        prior.set_manual(None);
        let fresh = Mapping::auto("new label", Some(public_id), None);
        let mut report = RebuildReport::default();
        let kept = carry_forward(&address(), Some(&prior), fresh, |_| true, &mut report);
        assert_eq!(kept, prior);
        assert_eq!(report.retained_manual, 1);
    }

    #[test]
    fn review_flag_survives_until_a_reviewer_acts() {
        let mut prior: Mapping<&str> = Mapping::auto("gender", None, None);
        prior.needs_review = true;
        let fresh = Mapping::auto("gender", None, Some("b".to_string()));
        let mut report = RebuildReport::default();
        let rebuilt = carry_forward(&address(), Some(&prior), fresh, |_| true, &mut report);
        assert_eq!(rebuilt.mapping_type, MappingType::AutoMapped);
        assert!(rebuilt.needs_review);
    }
}
