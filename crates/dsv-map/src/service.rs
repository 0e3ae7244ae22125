//! Lifecycle of a [`DataSetVersionMapping`]: create, rebuild, freeze.
//!
//! Both snapshots are loaded before any plan is computed, and a rebuild
//! swaps all three plans in one step, so a failed load never leaves a
//! half-updated mapping behind.

use chrono::Utc;
use tracing::{info, info_span};

use dsv_model::{DataSetVersionMapping, MappingType, MetadataSnapshot, VersionId};

use crate::builder::build_plans;
use crate::error::{MappingError, Result};
use crate::options::MatchOptions;
use crate::provider::{MetadataProvider, snapshot_fingerprint};
use crate::rebuild::{RebuildReport, rebuild_plans};

fn load_pair(
    source: &dyn MetadataProvider,
    target: &dyn MetadataProvider,
) -> Result<(MetadataSnapshot, MetadataSnapshot)> {
    let source = source.snapshot().map_err(|source| MappingError::Snapshot {
        role: "source",
        source,
    })?;
    let target = target.snapshot().map_err(|source| MappingError::Snapshot {
        role: "target",
        source,
    })?;
    Ok((source, target))
}

fn frozen(mapping: &DataSetVersionMapping) -> MappingError {
    MappingError::Frozen {
        source_version: mapping.source_version.clone(),
        target_version: mapping.target_version.clone(),
    }
}

/// Diffs a draft target version against the live source version.
pub fn create_version_mapping(
    source: &dyn MetadataProvider,
    target: &dyn MetadataProvider,
    source_version: VersionId,
    target_version: VersionId,
    options: MatchOptions,
) -> Result<DataSetVersionMapping> {
    let span = info_span!(
        "create_mapping",
        source_version = %source_version,
        target_version = %target_version
    );
    let _guard = span.enter();

    let (source, target) = load_pair(source, target)?;
    let plans = build_plans(&source, &target, options);
    let mut mapping = DataSetVersionMapping::new(
        source_version,
        target_version,
        plans.filters,
        plans.locations,
        plans.indicators,
        Utc::now(),
    );
    mapping.source_fingerprint = Some(snapshot_fingerprint(&source));
    mapping.target_fingerprint = Some(snapshot_fingerprint(&target));

    info!(
        mapped = mapping.count_by_type(MappingType::AutoMapped),
        unmapped = mapping.count_by_type(MappingType::AutoNone),
        "version mapping created"
    );
    Ok(mapping)
}

/// Re-runs matching against new snapshots, keeping reviewer decisions.
pub fn rebuild_version_mapping(
    mapping: &mut DataSetVersionMapping,
    source: &dyn MetadataProvider,
    target: &dyn MetadataProvider,
    options: MatchOptions,
) -> Result<RebuildReport> {
    let span = info_span!(
        "rebuild_mapping",
        source_version = %mapping.source_version,
        target_version = %mapping.target_version
    );
    let _guard = span.enter();

    if mapping.is_frozen() {
        return Err(frozen(mapping));
    }
    let (source, target) = load_pair(source, target)?;
    let (plans, report) = rebuild_plans(
        &mapping.filters,
        &mapping.locations,
        &mapping.indicators,
        &source,
        &target,
        options,
    );

    mapping.filters = plans.filters;
    mapping.locations = plans.locations;
    mapping.indicators = plans.indicators;
    mapping.refresh_completeness();
    mapping.source_fingerprint = Some(snapshot_fingerprint(&source));
    mapping.target_fingerprint = Some(snapshot_fingerprint(&target));
    mapping.updated_at = Utc::now();
    Ok(report)
}

/// Marks the mapping read-only. Returns `false` if it already was.
pub fn freeze(mapping: &mut DataSetVersionMapping) -> bool {
    if mapping.is_frozen() {
        return false;
    }
    mapping.freeze(Utc::now());
    info!(target_version = %mapping.target_version, "version mapping frozen");
    true
}

/// Whether the stored fingerprints differ from the given snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Staleness {
    pub source_changed: bool,
    pub target_changed: bool,
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        self.source_changed || self.target_changed
    }
}

/// Compares the mapping's fingerprints with freshly loaded snapshots.
///
/// A mapping without stored fingerprints is always stale.
pub fn staleness(
    mapping: &DataSetVersionMapping,
    source: &dyn MetadataProvider,
    target: &dyn MetadataProvider,
) -> Result<Staleness> {
    let (source, target) = load_pair(source, target)?;
    let changed = |stored: &Option<String>, snapshot: &MetadataSnapshot| {
        stored.as_deref() != Some(snapshot_fingerprint(snapshot).as_str())
    };
    Ok(Staleness {
        source_changed: changed(&mapping.source_fingerprint, &source),
        target_changed: changed(&mapping.target_fingerprint, &target),
    })
}
