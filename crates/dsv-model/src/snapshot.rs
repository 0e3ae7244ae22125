//! Read-only view of one data set version's mappable entities.

use serde::{Deserialize, Serialize};

use crate::enums::GeographicLevel;
use crate::metadata::{FilterMeta, FilterOptionMeta, IndicatorMeta, LocationMeta, LocationOptionMeta};

/// Immutable snapshot of a data set version's filters, locations and
/// indicators, in file order.
///
/// Repeated entries for the same geographic level are merged on
/// construction, so each level appears once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SnapshotDocument")]
pub struct MetadataSnapshot {
    filters: Vec<FilterMeta>,
    locations: Vec<LocationMeta>,
    indicators: Vec<IndicatorMeta>,
}

#[derive(Deserialize)]
struct SnapshotDocument {
    #[serde(default)]
    filters: Vec<FilterMeta>,
    #[serde(default)]
    locations: Vec<LocationMeta>,
    #[serde(default)]
    indicators: Vec<IndicatorMeta>,
}

impl From<SnapshotDocument> for MetadataSnapshot {
    fn from(doc: SnapshotDocument) -> Self {
        Self::new(doc.filters, doc.locations, doc.indicators)
    }
}

impl MetadataSnapshot {
    pub fn new(
        filters: Vec<FilterMeta>,
        locations: Vec<LocationMeta>,
        indicators: Vec<IndicatorMeta>,
    ) -> Self {
        Self {
            filters,
            locations: merge_levels(locations),
            indicators,
        }
    }

    pub fn list_filters(&self) -> &[FilterMeta] {
        &self.filters
    }

    /// Options of the first filter whose column is exactly `column`.
    pub fn list_filter_options(&self, column: &str) -> &[FilterOptionMeta] {
        self.filters
            .iter()
            .find(|f| f.info.column == column)
            .map(|f| f.options.as_slice())
            .unwrap_or_default()
    }

    pub fn list_location_levels(&self) -> impl Iterator<Item = GeographicLevel> + '_ {
        self.locations.iter().map(|l| l.level)
    }

    pub fn list_locations(&self) -> &[LocationMeta] {
        &self.locations
    }

    pub fn list_location_options(&self, level: GeographicLevel) -> &[LocationOptionMeta] {
        self.locations
            .iter()
            .find(|l| l.level == level)
            .map(|l| l.options.as_slice())
            .unwrap_or_default()
    }

    pub fn list_indicators(&self) -> &[IndicatorMeta] {
        &self.indicators
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty() && self.locations.is_empty() && self.indicators.is_empty()
    }
}

fn merge_levels(locations: Vec<LocationMeta>) -> Vec<LocationMeta> {
    let mut merged: Vec<LocationMeta> = Vec::with_capacity(locations.len());
    for location in locations {
        match merged.iter_mut().find(|l| l.level == location.level) {
            Some(existing) => existing.options.extend(location.options),
            None => merged.push(location),
        }
    }
    merged
}
