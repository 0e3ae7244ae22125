//! Mapping plan builder.
//!
//! Runs the candidate matcher over every category of two snapshots and
//! assembles the mapping and candidate tables. The same code path serves
//! [`build_plans`] (no prior plan) and [`rebuild_plans`](crate::rebuild_plans)
//! (prior plan whose manual decisions are carried forward).

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};
use tracing::debug;

use dsv_model::{
    FilterCandidate, FilterMapping, FilterMappingPlan, GeographicLevel, IndicatorMappingPlan,
    LocationLevelMappings, LocationMappingPlan, Mapping, MappingAddress, MappingPlan,
    MetadataSnapshot,
};

use crate::keys::{Keyed, Mappable, assign_mappable_keys, assign_option_keys};
use crate::matcher::{CandidateIndex, MatchOutcome};
use crate::options::MatchOptions;
use crate::rebuild::{RebuildReport, carry_forward};

/// The three plans produced for one source/target pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltPlans {
    pub filters: FilterMappingPlan,
    pub locations: LocationMappingPlan,
    pub indicators: IndicatorMappingPlan,
}

/// Plans a rebuild starts from.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PriorPlans<'a> {
    pub filters: &'a FilterMappingPlan,
    pub locations: &'a LocationMappingPlan,
    pub indicators: &'a IndicatorMappingPlan,
}

/// Builds fresh plans for `source` against `target`.
///
/// Every mapping ends up `AutoMapped` or `AutoNone`, and every target entity
/// is listed as a candidate whether or not it was chosen.
pub fn build_plans(
    source: &MetadataSnapshot,
    target: &MetadataSnapshot,
    options: MatchOptions,
) -> BuiltPlans {
    compute_plans(source, target, None, options).0
}

pub fn build_filter_plan(source: &MetadataSnapshot, target: &MetadataSnapshot) -> FilterMappingPlan {
    filter_plan(source, target, None).0
}

pub fn build_location_plan(
    source: &MetadataSnapshot,
    target: &MetadataSnapshot,
    options: MatchOptions,
) -> LocationMappingPlan {
    location_plan(source, target, None, options).0
}

pub fn build_indicator_plan(
    source: &MetadataSnapshot,
    target: &MetadataSnapshot,
) -> IndicatorMappingPlan {
    indicator_plan(source, target, None).0
}

/// Plans in the pre-matcher state: every mapping `None`, no candidates.
pub fn seed_plans(source: &MetadataSnapshot) -> BuiltPlans {
    let mut filters = FilterMappingPlan::default();
    for filter in assign_mappable_keys(source.list_filters()) {
        let option_mappings = assign_option_keys(&filter.key, &filter.item.options)
            .into_iter()
            .map(|o| (o.key, unresolved(o.item)))
            .collect();
        filters.mappings.insert(
            filter.key,
            FilterMapping {
                mapping: unresolved(filter.item),
                option_mappings,
            },
        );
    }

    let mut locations = LocationMappingPlan::default();
    for location in source.list_locations() {
        let level = locations.levels.entry(location.level).or_default();
        for option in assign_mappable_keys(&location.options) {
            level.mappings.insert(option.key, unresolved(option.item));
        }
    }

    let mut indicators = IndicatorMappingPlan::default();
    for indicator in assign_mappable_keys(source.list_indicators()) {
        indicators
            .mappings
            .insert(indicator.key, unresolved(indicator.item));
    }

    BuiltPlans {
        filters,
        locations,
        indicators,
    }
}

fn unresolved<T: Mappable>(item: &T) -> Mapping<T::Info> {
    Mapping::unresolved(item.info().clone(), item.public_id().cloned())
}

pub(crate) fn compute_plans(
    source: &MetadataSnapshot,
    target: &MetadataSnapshot,
    prior: Option<PriorPlans<'_>>,
    options: MatchOptions,
) -> (BuiltPlans, RebuildReport) {
    let prior_filters = prior.map(|p| p.filters);
    let prior_locations = prior.map(|p| p.locations);
    let prior_indicators = prior.map(|p| p.indicators);

    let ((filters, locations), indicators) = if options.parallel {
        rayon::join(
            || {
                rayon::join(
                    || filter_plan(source, target, prior_filters),
                    || location_plan(source, target, prior_locations, options),
                )
            },
            || indicator_plan(source, target, prior_indicators),
        )
    } else {
        (
            (
                filter_plan(source, target, prior_filters),
                location_plan(source, target, prior_locations, options),
            ),
            indicator_plan(source, target, prior_indicators),
        )
    };

    let mut report = filters.1;
    report.merge(locations.1);
    report.merge(indicators.1);

    (
        BuiltPlans {
            filters: filters.0,
            locations: locations.0,
            indicators: indicators.0,
        },
        report,
    )
}

fn log_ambiguous(address: &MappingAddress, outcome: &MatchOutcome) {
    if let MatchOutcome::Ambiguous(count) = outcome {
        debug!(%address, candidates = count, "ambiguous match left unmapped");
    }
}

fn filter_plan(
    source: &MetadataSnapshot,
    target: &MetadataSnapshot,
    prior: Option<&FilterMappingPlan>,
) -> (FilterMappingPlan, RebuildReport) {
    let mut report = RebuildReport::default();

    let target_filters = assign_mappable_keys(target.list_filters());
    let filter_index = CandidateIndex::from_keyed(&target_filters);
    let mut option_indexes: BTreeMap<&str, CandidateIndex> = BTreeMap::new();
    let mut candidates = BTreeMap::new();
    for filter in &target_filters {
        let options = assign_option_keys(&filter.key, &filter.item.options);
        option_indexes.insert(filter.key.as_str(), CandidateIndex::from_keyed(&options));
        candidates.insert(
            filter.key.clone(),
            FilterCandidate {
                info: filter.item.info.clone(),
                options: options
                    .into_iter()
                    .map(|o| (o.key, o.item.info.clone()))
                    .collect(),
            },
        );
    }
    let option_candidate_keys: BTreeSet<&str> = candidates
        .values()
        .flat_map(|c| c.options.keys().map(String::as_str))
        .collect();

    let mut mappings = BTreeMap::new();
    for filter in assign_mappable_keys(source.list_filters()) {
        let address = MappingAddress::filter(filter.key.clone());
        let outcome = filter_index.lookup(&filter.match_key);
        log_ambiguous(&address, &outcome);
        let fresh = Mapping::auto(
            filter.item.info.clone(),
            filter.item.public_id.clone(),
            outcome.into_candidate(),
        );
        let prior_filter = prior.and_then(|p| p.mappings.get(&filter.key));
        let mapping = carry_forward(
            &address,
            prior_filter.map(|f| &f.mapping),
            fresh,
            |key| candidates.contains_key(key),
            &mut report,
        );

        // Options follow the parent's candidate when it has one, otherwise
        // every target filter sharing the parent's match key.
        let scope: Vec<&CandidateIndex> = match mapping.candidate_key.as_deref() {
            Some(candidate) => option_indexes.get(candidate).into_iter().collect(),
            None => filter_index
                .keys_for(&filter.match_key)
                .iter()
                .filter_map(|key| option_indexes.get(key.as_str()))
                .collect(),
        };

        let mut option_mappings = BTreeMap::new();
        for option in assign_option_keys(&filter.key, &filter.item.options) {
            let option_address = MappingAddress::filter_option(filter.key.clone(), option.key.clone());
            let outcome = CandidateIndex::lookup_many(&scope, &option.match_key);
            log_ambiguous(&option_address, &outcome);
            let fresh = Mapping::auto(
                option.item.info.clone(),
                option.item.public_id.clone(),
                outcome.into_candidate(),
            );
            let prior_option = prior_filter.and_then(|f| f.option_mappings.get(&option.key));
            let mapping = carry_forward(
                &option_address,
                prior_option,
                fresh,
                |key| option_candidate_keys.contains(key),
                &mut report,
            );
            option_mappings.insert(option.key, mapping);
        }

        mappings.insert(
            filter.key,
            FilterMapping {
                mapping,
                option_mappings,
            },
        );
    }

    let plan = FilterMappingPlan {
        mappings,
        candidates,
    };
    if let Some(prior) = prior {
        report.record_dropped(prior, &plan);
    }
    debug!(
        filters = plan.mappings.len(),
        candidates = plan.candidates.len(),
        "filter plan built"
    );
    (plan, report)
}

fn location_plan(
    source: &MetadataSnapshot,
    target: &MetadataSnapshot,
    prior: Option<&LocationMappingPlan>,
    options: MatchOptions,
) -> (LocationMappingPlan, RebuildReport) {
    let levels: Vec<GeographicLevel> = source
        .list_location_levels()
        .chain(target.list_location_levels())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let build = |level: &GeographicLevel| {
        let prior_level = prior.and_then(|p| p.level(*level));
        (*level, level_plan(source, target, *level, prior_level))
    };
    let built: Vec<(GeographicLevel, (LocationLevelMappings, RebuildReport))> = if options.parallel
    {
        levels.par_iter().map(build).collect()
    } else {
        levels.iter().map(build).collect()
    };

    let mut report = RebuildReport::default();
    let mut plan = LocationMappingPlan::default();
    for (level, (mappings, level_report)) in built {
        report.merge(level_report);
        plan.levels.insert(level, mappings);
    }
    if let Some(prior) = prior {
        report.record_dropped(prior, &plan);
    }
    (plan, report)
}

fn level_plan(
    source: &MetadataSnapshot,
    target: &MetadataSnapshot,
    level: GeographicLevel,
    prior: Option<&LocationLevelMappings>,
) -> (LocationLevelMappings, RebuildReport) {
    let target_options = assign_mappable_keys(target.list_location_options(level));
    let source_options = assign_mappable_keys(source.list_location_options(level));
    let (mappings, candidates, report) = flat_plan(
        &source_options,
        &target_options,
        prior.map(|p| &p.mappings),
        |key| MappingAddress::Location {
            level,
            source_key: key,
        },
    );
    debug!(
        %level,
        mappings = mappings.len(),
        candidates = candidates.len(),
        "location level built"
    );
    (
        LocationLevelMappings {
            mappings,
            candidates,
        },
        report,
    )
}

fn indicator_plan(
    source: &MetadataSnapshot,
    target: &MetadataSnapshot,
    prior: Option<&IndicatorMappingPlan>,
) -> (IndicatorMappingPlan, RebuildReport) {
    let target_indicators = assign_mappable_keys(target.list_indicators());
    let source_indicators = assign_mappable_keys(source.list_indicators());
    let (mappings, candidates, mut report) = flat_plan(
        &source_indicators,
        &target_indicators,
        prior.map(|p| &p.mappings),
        |key| MappingAddress::Indicator { source_key: key },
    );
    let plan = IndicatorMappingPlan {
        mappings,
        candidates,
    };
    if let Some(prior) = prior {
        report.record_dropped(prior, &plan);
    }
    (plan, report)
}

type FlatTables<I> = (
    BTreeMap<String, Mapping<I>>,
    BTreeMap<String, I>,
    RebuildReport,
);

/// Matches a category without children (location options of one level,
/// indicators).
fn flat_plan<T: Mappable<Info: PartialEq>>(
    source: &[Keyed<'_, T>],
    target: &[Keyed<'_, T>],
    prior: Option<&BTreeMap<String, Mapping<T::Info>>>,
    address_for: impl Fn(String) -> MappingAddress,
) -> FlatTables<T::Info> {
    let mut report = RebuildReport::default();
    let index = CandidateIndex::from_keyed(target);
    let candidates: BTreeMap<String, T::Info> = target
        .iter()
        .map(|t| (t.key.clone(), t.item.info().clone()))
        .collect();

    let mut mappings = BTreeMap::new();
    for entity in source {
        let address = address_for(entity.key.clone());
        let outcome = index.lookup(&entity.match_key);
        log_ambiguous(&address, &outcome);
        let fresh = Mapping::auto(
            entity.item.info().clone(),
            entity.item.public_id().cloned(),
            outcome.into_candidate(),
        );
        let mapping = carry_forward(
            &address,
            prior.and_then(|p| p.get(&entity.key)),
            fresh,
            |key| candidates.contains_key(key),
            &mut report,
        );
        mappings.insert(entity.key.clone(), mapping);
    }
    (mappings, candidates, report)
}

/// Every mapping in `plan` with its address; shared by the dropped-manual
/// bookkeeping.
pub(crate) fn addresses(plan: &impl MappingPlan) -> BTreeSet<MappingAddress> {
    plan.entries().into_iter().map(|e| e.address).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsv_model::{
        FilterMeta, FilterOptionMeta, IndicatorMeta, LocationMeta, LocationOptionMeta,
        MappingType,
    };

    use crate::mutation::set_filter_mapping;

    fn snapshot(filters: Vec<FilterMeta>) -> MetadataSnapshot {
        MetadataSnapshot::new(filters, vec![], vec![])
    }

    #[test]
    fn ambiguous_target_filters_leave_source_unmapped() {
        let source = snapshot(vec![FilterMeta::new("gender", "Gender").with_options(["Male"])]);
        let target = snapshot(vec![
            FilterMeta::new("gender", "Gender").with_options(["Male"]),
            FilterMeta::new("Gender ", "Gender (duplicate)").with_options(["Female"]),
        ]);
        let plan = build_filter_plan(&source, &target);
        let gender = &plan.mappings["gender"];
        assert_eq!(gender.mapping.mapping_type, MappingType::AutoNone);
        assert_eq!(plan.candidates.len(), 2);
        assert!(plan.candidates.contains_key("gender#2"));
        // Options still match across the column's option universe.
        let male = &gender.option_mappings["gender||male"];
        assert_eq!(male.mapping_type, MappingType::AutoMapped);
        assert_eq!(male.candidate_key.as_deref(), Some("gender||male"));
    }

    #[test]
    fn options_match_within_groups() {
        let source = snapshot(vec![
            FilterMeta::new("school_type", "School type")
                .with_option(FilterOptionMeta::new("Total").with_group("Primary"))
                .with_option(FilterOptionMeta::new("Total").with_group("Secondary")),
        ]);
        let target = snapshot(vec![
            FilterMeta::new("school_type", "School type")
                .with_option(FilterOptionMeta::new("Total").with_group("Secondary")),
        ]);
        let plan = build_filter_plan(&source, &target);
        let options = &plan.mappings["school_type"].option_mappings;
        assert_eq!(
            options["school_type|primary|total"].mapping_type,
            MappingType::AutoNone
        );
        assert_eq!(
            options["school_type|secondary|total"].candidate_key.as_deref(),
            Some("school_type|secondary|total")
        );
    }

    #[test]
    fn levels_only_in_one_snapshot_are_kept() {
        let source = MetadataSnapshot::new(
            vec![],
            vec![LocationMeta::new(GeographicLevel::Region)
                .with_option(LocationOptionMeta::coded("North East", "E12000001"))],
            vec![],
        );
        let target = MetadataSnapshot::new(
            vec![],
            vec![LocationMeta::new(GeographicLevel::Country)
                .with_option(LocationOptionMeta::coded("England", "E92000001"))],
            vec![],
        );
        let plan = build_location_plan(&source, &target, MatchOptions::sequential());
        let region = plan.level(GeographicLevel::Region).unwrap();
        assert_eq!(
            region.mappings["code|e12000001"].mapping_type,
            MappingType::AutoNone
        );
        assert!(region.candidates.is_empty());
        let country = plan.level(GeographicLevel::Country).unwrap();
        assert!(country.mappings.is_empty());
        assert_eq!(country.candidates.len(), 1);
    }

    #[test]
    fn ambiguous_location_codes_within_a_level_stay_unmapped() {
        let source = MetadataSnapshot::new(
            vec![],
            vec![LocationMeta::new(GeographicLevel::LocalAuthority)
                .with_option(LocationOptionMeta::coded("Blackpool", "E06000009"))],
            vec![],
        );
        let target = MetadataSnapshot::new(
            vec![],
            vec![LocationMeta::new(GeographicLevel::LocalAuthority)
                .with_option(LocationOptionMeta::coded("Blackpool", "E06000009"))
                .with_option(LocationOptionMeta::coded("Blackpool (old)", "e06000009"))],
            vec![],
        );
        let plan = build_location_plan(&source, &target, MatchOptions::sequential());
        let la = plan.level(GeographicLevel::LocalAuthority).unwrap();
        let blackpool = &la.mappings["code|e06000009"];
        assert_eq!(blackpool.mapping_type, MappingType::AutoNone);
        assert!(blackpool.candidate_key.is_none());
        assert!(la.candidates.contains_key("code|e06000009"));
        assert!(la.candidates.contains_key("code|e06000009#2"));
    }

    #[test]
    fn ambiguous_indicators_stay_unmapped() {
        let source = MetadataSnapshot::new(vec![], vec![], vec![IndicatorMeta::new("pupils", "Pupils")]);
        let target = MetadataSnapshot::new(
            vec![],
            vec![],
            vec![
                IndicatorMeta::new("pupils", "Pupils"),
                IndicatorMeta::new("Pupils ", "Pupils (revised)"),
            ],
        );
        let plan = build_indicator_plan(&source, &target);
        assert_eq!(plan.mappings["pupils"].mapping_type, MappingType::AutoNone);
        assert_eq!(plan.candidates.len(), 2);
        assert!(plan.candidates.contains_key("pupils#2"));
    }

    #[test]
    fn same_label_options_in_one_target_filter_are_ambiguous() {
        let source = snapshot(vec![FilterMeta::new("gender", "Gender").with_options(["Male"])]);
        let target = snapshot(vec![FilterMeta::new("gender", "Gender").with_options(["Male", "male"])]);
        let plan = build_filter_plan(&source, &target);
        let gender = &plan.mappings["gender"];
        assert_eq!(gender.mapping.mapping_type, MappingType::AutoMapped);
        assert_eq!(
            gender.option_mappings["gender||male"].mapping_type,
            MappingType::AutoNone
        );
        assert!(plan.candidates["gender"].options.contains_key("gender||male#2"));
    }

    #[test]
    fn manual_parent_scopes_options_to_its_chosen_candidate() {
        let source = snapshot(vec![FilterMeta::new("sex", "Sex").with_options(["Male"])]);
        let target = snapshot(vec![
            FilterMeta::new("sex", "Sex").with_options(["Female"]),
            FilterMeta::new("gender", "Gender").with_options(["Male"]),
        ]);
        let mut plan = build_filter_plan(&source, &target);
        assert_eq!(
            plan.mappings["sex"].mapping.candidate_key.as_deref(),
            Some("sex")
        );
        assert_eq!(
            plan.mappings["sex"].option_mappings["sex||male"].mapping_type,
            MappingType::AutoNone
        );

        set_filter_mapping(&mut plan, "sex", Some("gender")).unwrap();
        let (rebuilt, report) = filter_plan(&source, &target, Some(&plan));
        assert_eq!(report.retained_manual, 1);
        let male = &rebuilt.mappings["sex"].option_mappings["sex||male"];
        assert_eq!(male.mapping_type, MappingType::AutoMapped);
        assert_eq!(male.candidate_key.as_deref(), Some("gender||male"));
    }

    #[test]
    fn seeded_plans_are_unresolved() {
        let source = snapshot(vec![FilterMeta::new("gender", "Gender").with_options(["Male"])]);
        let seeded = seed_plans(&source);
        assert!(!seeded.filters.is_complete());
        assert!(seeded.filters.candidates.is_empty());
        assert_eq!(
            seeded.filters.mappings["gender"].option_mappings["gender||male"].mapping_type,
            MappingType::None
        );
    }
}
