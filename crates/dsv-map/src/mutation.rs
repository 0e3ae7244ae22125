//! Reviewer overrides.
//!
//! Every setter validates the address and candidate, then records a
//! `ManualMapped` (candidate given) or `ManualNone` (no candidate) decision.
//! Setting the same decision twice is a no-op reported as `Ok(false)`.

use chrono::Utc;
use tracing::info;

use dsv_model::{
    DataSetVersionMapping, FilterMappingPlan, GeographicLevel, IndicatorMappingPlan,
    LocationMappingPlan, Mapping, MappingAddress, MappingPlan,
};

use crate::error::{MappingError, Result};

/// Validates `candidate_key` against the plan, then records it on the
/// mapping returned by `lookup`.
fn apply<P, S>(
    plan: &mut P,
    address: MappingAddress,
    candidate_key: Option<&str>,
    lookup: impl FnOnce(&mut P) -> Option<&mut Mapping<S>>,
) -> Result<bool>
where
    P: MappingPlan,
{
    if let Some(key) = candidate_key
        && !plan.accepts_candidate(&address, key)
    {
        // An unknown source is the more useful report.
        if lookup(plan).is_none() {
            return Err(MappingError::SourceNotFound(address));
        }
        return Err(MappingError::CandidateNotFound {
            address,
            candidate_key: key.to_string(),
        });
    }
    let mapping = lookup(plan).ok_or(MappingError::SourceNotFound(address))?;
    Ok(mapping.set_manual(candidate_key.map(str::to_string)))
}

pub fn set_filter_mapping(
    plan: &mut FilterMappingPlan,
    source_key: &str,
    candidate_key: Option<&str>,
) -> Result<bool> {
    apply(
        plan,
        MappingAddress::filter(source_key),
        candidate_key,
        |plan| plan.mappings.get_mut(source_key).map(|f| &mut f.mapping),
    )
}

/// Options may be mapped to an option of any filter candidate, not only the
/// parent's.
pub fn set_filter_option_mapping(
    plan: &mut FilterMappingPlan,
    filter_key: &str,
    source_key: &str,
    candidate_key: Option<&str>,
) -> Result<bool> {
    apply(
        plan,
        MappingAddress::filter_option(filter_key, source_key),
        candidate_key,
        |plan| {
            plan.mappings
                .get_mut(filter_key)
                .and_then(|f| f.option_mappings.get_mut(source_key))
        },
    )
}

pub fn set_location_mapping(
    plan: &mut LocationMappingPlan,
    level: GeographicLevel,
    source_key: &str,
    candidate_key: Option<&str>,
) -> Result<bool> {
    apply(
        plan,
        MappingAddress::location(level, source_key),
        candidate_key,
        |plan| {
            plan.levels
                .get_mut(&level)
                .and_then(|l| l.mappings.get_mut(source_key))
        },
    )
}

pub fn set_indicator_mapping(
    plan: &mut IndicatorMappingPlan,
    source_key: &str,
    candidate_key: Option<&str>,
) -> Result<bool> {
    apply(
        plan,
        MappingAddress::indicator(source_key),
        candidate_key,
        |plan| plan.mappings.get_mut(source_key),
    )
}

/// Sets a reviewer decision on a version mapping.
///
/// Fails on a frozen mapping, an unknown address or a candidate outside the
/// address's category and level. Refreshes the completeness flags when
/// anything changed.
pub fn set_manual_mapping(
    mapping: &mut DataSetVersionMapping,
    address: &MappingAddress,
    candidate_key: Option<&str>,
) -> Result<bool> {
    if mapping.is_frozen() {
        return Err(MappingError::Frozen {
            source_version: mapping.source_version.clone(),
            target_version: mapping.target_version.clone(),
        });
    }

    let changed = match address {
        MappingAddress::Filter { source_key } => {
            set_filter_mapping(&mut mapping.filters, source_key, candidate_key)?
        }
        MappingAddress::FilterOption {
            filter_key,
            source_key,
        } => set_filter_option_mapping(&mut mapping.filters, filter_key, source_key, candidate_key)?,
        MappingAddress::Location { level, source_key } => {
            set_location_mapping(&mut mapping.locations, *level, source_key, candidate_key)?
        }
        MappingAddress::Indicator { source_key } => {
            set_indicator_mapping(&mut mapping.indicators, source_key, candidate_key)?
        }
    };

    if changed {
        mapping.refresh_completeness();
        mapping.updated_at = Utc::now();
        info!(
            %address,
            candidate = candidate_key.unwrap_or("none"),
            target_version = %mapping.target_version,
            "manual mapping set"
        );
    }
    Ok(changed)
}
